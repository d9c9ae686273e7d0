use crate::domain::order::{NewOrder, Order, OrderId, OrderStatus};
use crate::domain::payment::{
    GatewayPayment, GatewayStatus, PaymentRequest, PointOfInteraction, TransactionData,
};
use crate::domain::ports::{OrderStore, PaymentGateway, ProductStore, UserStore};
use crate::domain::product::{Product, ProductDraft, ProductId};
use crate::domain::user::{NewUser, User, UserId, normalize_email};
use crate::error::{Result, ShopError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, u64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[derive(Default)]
struct ProductTable {
    last_id: ProductId,
    rows: HashMap<ProductId, Product>,
}

/// A thread-safe in-memory catalog.
///
/// Uses `Arc<RwLock<..>>` so clones share the same products.
#[derive(Default, Clone)]
pub struct InMemoryProductStore {
    table: Arc<RwLock<ProductTable>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn insert(&self, draft: ProductDraft) -> Result<Product> {
        let mut table = self.table.write().await;
        table.last_id += 1;
        let product = Product::from_draft(table.last_id, draft, Utc::now());
        table.rows.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update(&self, product: Product) -> Result<()> {
        let mut table = self.table.write().await;
        match table.rows.get_mut(&product.id) {
            Some(row) if !row.is_deleted() => {
                *row = product;
                Ok(())
            }
            _ => Err(ShopError::NotFound("Product")),
        }
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).filter(|p| !p.is_deleted()).cloned())
    }

    async fn get_available(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let table = self.table.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| table.rows.get(id))
            .filter(|p| p.is_purchasable())
            .cloned()
            .collect())
    }

    async fn list(&self, only_available: bool) -> Result<Vec<Product>> {
        let table = self.table.read().await;
        let mut products: Vec<Product> = table
            .rows
            .values()
            .filter(|p| !p.is_deleted() && (!only_available || p.available))
            .cloned()
            .collect();
        newest_first(&mut products, |p| (p.created_at, p.id));
        Ok(products)
    }

    async fn soft_delete(&self, id: ProductId) -> Result<Option<Product>> {
        let mut table = self.table.write().await;
        let Some(row) = table.rows.get_mut(&id).filter(|p| !p.is_deleted()) else {
            return Ok(None);
        };
        let before = row.clone();
        let now = Utc::now();
        row.deleted_at = Some(now);
        row.updated_at = now;
        Ok(Some(before))
    }
}

#[derive(Default)]
struct UserTable {
    last_id: UserId,
    rows: HashMap<UserId, User>,
}

impl UserTable {
    fn email_owner(&self, email: &str) -> Option<&User> {
        self.rows.values().find(|u| u.email == email)
    }
}

/// A thread-safe in-memory account store with unique emails.
#[derive(Default, Clone)]
pub struct InMemoryUserStore {
    table: Arc<RwLock<UserTable>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: NewUser) -> Result<User> {
        let mut table = self.table.write().await;
        if table.email_owner(&normalize_email(&user.email)).is_some() {
            return Err(ShopError::Conflict("Email already in use".to_string()));
        }
        table.last_id += 1;
        let user = User::new(table.last_id, user, Utc::now());
        table.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let table = self.table.read().await;
        Ok(table.email_owner(&normalize_email(email)).cloned())
    }

    async fn update(&self, user: User) -> Result<()> {
        let mut table = self.table.write().await;
        if table
            .email_owner(&user.email)
            .is_some_and(|owner| owner.id != user.id)
        {
            return Err(ShopError::Conflict("Email already in use".to_string()));
        }
        match table.rows.get_mut(&user.id) {
            Some(row) => {
                *row = user;
                Ok(())
            }
            None => Err(ShopError::NotFound("User")),
        }
    }
}

#[derive(Default)]
struct OrderTable {
    last_id: OrderId,
    last_item_id: u64,
    rows: HashMap<OrderId, Order>,
}

/// A thread-safe in-memory order store.
///
/// An order and its items are written under one write lock, so readers never
/// observe a partial order.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    table: Arc<RwLock<OrderTable>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: NewOrder) -> Result<Order> {
        let mut table = self.table.write().await;
        if table
            .rows
            .values()
            .any(|o| o.external_reference == order.external_reference)
        {
            return Err(ShopError::Conflict(format!(
                "Duplicate order reference {}",
                order.external_reference
            )));
        }

        table.last_id += 1;
        let first_item_id = table.last_item_id + 1;
        table.last_item_id += order.items.len() as u64;
        let order = Order::from_new(table.last_id, first_item_id, order, Utc::now());
        table.rows.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn find_by_payment_id(&self, payment_id: i64) -> Result<Option<Order>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .find(|o| o.gateway_payment_id == Some(payment_id))
            .cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let table = self.table.read().await;
        let mut orders: Vec<Order> = table
            .rows
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut orders, |o| (o.created_at, o.id));
        Ok(orders)
    }

    async fn list_all(&self) -> Result<Vec<Order>> {
        let table = self.table.read().await;
        let mut orders: Vec<Order> = table.rows.values().cloned().collect();
        newest_first(&mut orders, |o| (o.created_at, o.id));
        Ok(orders)
    }

    async fn update_payment(
        &self,
        id: OrderId,
        status: OrderStatus,
        payment_id: Option<i64>,
    ) -> Result<()> {
        let mut table = self.table.write().await;
        if let Some(payment_id) = payment_id
            && table
                .rows
                .values()
                .any(|o| o.id != id && o.gateway_payment_id == Some(payment_id))
        {
            return Err(ShopError::Conflict(format!(
                "Payment {payment_id} already belongs to another order"
            )));
        }

        let order = table.rows.get_mut(&id).ok_or(ShopError::NotFound("Order"))?;
        order.status = status;
        if payment_id.is_some() {
            order.gateway_payment_id = payment_id;
        }
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
        let mut table = self.table.write().await;
        let order = table.rows.get_mut(&id).ok_or(ShopError::NotFound("Order"))?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn settle(&self, id: OrderId, status: OrderStatus) -> Result<Option<Order>> {
        let mut table = self.table.write().await;
        let order = table.rows.get_mut(&id).ok_or(ShopError::NotFound("Order"))?;
        Ok(order.settle(status, Utc::now()).then(|| order.clone()))
    }
}

#[derive(Default)]
struct GatewayState {
    last_id: i64,
    payments: HashMap<i64, GatewayPayment>,
    by_key: HashMap<String, i64>,
    scripted: VecDeque<(GatewayStatus, Option<String>)>,
    fail_next: bool,
    requests: Vec<(PaymentRequest, String)>,
}

/// Payment gateway double that keeps payments in memory.
///
/// Card payments are approved and PIX charges stay pending unless a status is
/// scripted with [`InMemoryPaymentGateway::script_next`]. Requests with a
/// known idempotency key resolve to the payment already created for it.
#[derive(Default, Clone)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<GatewayState>>,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status and detail for the next created payment.
    pub async fn script_next(&self, status: GatewayStatus, detail: Option<&str>) {
        self.state
            .write()
            .await
            .scripted
            .push_back((status, detail.map(str::to_string)));
    }

    /// Makes the next gateway call fail.
    pub async fn fail_next(&self) {
        self.state.write().await.fail_next = true;
    }

    /// Simulates the payment moving on the gateway side.
    pub async fn set_status(&self, payment_id: i64, status: GatewayStatus) {
        if let Some(payment) = self.state.write().await.payments.get_mut(&payment_id) {
            payment.status = status;
        }
    }

    /// Adds a payment no order knows about.
    pub async fn register_payment(&self, status: GatewayStatus) -> i64 {
        let mut state = self.state.write().await;
        state.last_id += 1;
        let id = state.last_id;
        state.payments.insert(
            id,
            GatewayPayment {
                id,
                status,
                status_detail: None,
                external_reference: None,
                point_of_interaction: None,
            },
        );
        id
    }

    /// Every creation request received, with its idempotency key.
    pub async fn requests(&self) -> Vec<(PaymentRequest, String)> {
        self.state.read().await.requests.clone()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_payment(
        &self,
        request: &PaymentRequest,
        idempotency_key: &str,
    ) -> Result<GatewayPayment> {
        let mut state = self.state.write().await;
        state
            .requests
            .push((request.clone(), idempotency_key.to_string()));
        if std::mem::take(&mut state.fail_next) {
            return Err(ShopError::GatewayError("scripted failure".to_string()));
        }
        if let Some(payment) = state
            .by_key
            .get(idempotency_key)
            .and_then(|id| state.payments.get(id))
        {
            return Ok(payment.clone());
        }

        let is_pix = request.payment_method_id == "pix";
        let (status, status_detail) = state.scripted.pop_front().unwrap_or_else(|| {
            if is_pix {
                (GatewayStatus::Pending, Some("pending_waiting_transfer".to_string()))
            } else {
                (GatewayStatus::Approved, Some("accredited".to_string()))
            }
        });

        state.last_id += 1;
        let id = state.last_id;
        let point_of_interaction = is_pix.then(|| PointOfInteraction {
            transaction_data: Some(TransactionData {
                qr_code: Some(format!("00020126pix{id}")),
                qr_code_base64: Some(format!("iVBORw0KGgo{id}")),
            }),
        });
        let payment = GatewayPayment {
            id,
            status,
            status_detail,
            external_reference: Some(request.external_reference.clone()),
            point_of_interaction,
        };
        state.payments.insert(id, payment.clone());
        state.by_key.insert(idempotency_key.to_string(), id);
        Ok(payment)
    }

    async fn get_payment(&self, payment_id: i64) -> Result<GatewayPayment> {
        let mut state = self.state.write().await;
        if std::mem::take(&mut state.fail_next) {
            return Err(ShopError::GatewayError("scripted failure".to_string()));
        }
        state
            .payments
            .get(&payment_id)
            .cloned()
            .ok_or_else(|| ShopError::GatewayError(format!("payment {payment_id} not found")))
    }
}
