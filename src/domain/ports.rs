use super::order::{NewOrder, Order, OrderId, OrderStatus};
use super::payment::{GatewayPayment, PaymentRequest};
use super::product::{Product, ProductDraft, ProductId};
use super::user::{NewUser, User, UserId};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert(&self, draft: ProductDraft) -> Result<Product>;
    async fn update(&self, product: Product) -> Result<()>;
    /// Looks up a product, soft-deleted ones excluded.
    async fn get(&self, id: ProductId) -> Result<Option<Product>>;
    /// Purchasable products among `ids`.
    async fn get_available(&self, ids: &[ProductId]) -> Result<Vec<Product>>;
    /// Non-deleted products, newest first.
    async fn list(&self, only_available: bool) -> Result<Vec<Product>>;
    async fn soft_delete(&self, id: ProductId) -> Result<Option<Product>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn insert(&self, user: NewUser) -> Result<User>;
    async fn get(&self, id: UserId) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Fails with `Conflict` when the new email belongs to someone else.
    async fn update(&self, user: User) -> Result<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Writes the order header and all of its items atomically.
    async fn create(&self, order: NewOrder) -> Result<Order>;
    async fn get(&self, id: OrderId) -> Result<Option<Order>>;
    async fn find_by_payment_id(&self, payment_id: i64) -> Result<Option<Order>>;
    /// Orders of one customer, newest first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;
    /// Every order, newest first.
    async fn list_all(&self) -> Result<Vec<Order>>;
    async fn update_payment(
        &self,
        id: OrderId,
        status: OrderStatus,
        payment_id: Option<i64>,
    ) -> Result<()>;
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()>;
    /// Moves the stored order to `status` only while it is still `pendente`.
    /// Returns the moved order, or `None` when it had already left `pendente`.
    async fn settle(&self, id: OrderId, status: OrderStatus) -> Result<Option<Order>>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment. `idempotency_key` makes retries of the same checkout
    /// attempt resolve to the same gateway payment.
    async fn create_payment(
        &self,
        request: &PaymentRequest,
        idempotency_key: &str,
    ) -> Result<GatewayPayment>;
    async fn get_payment(&self, payment_id: i64) -> Result<GatewayPayment>;
}

pub type ProductStoreBox = Box<dyn ProductStore>;
pub type UserStoreBox = Box<dyn UserStore>;
pub type OrderStoreBox = Box<dyn OrderStore>;
pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
