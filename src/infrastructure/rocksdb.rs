use crate::domain::order::{NewOrder, Order, OrderId, OrderStatus};
use crate::domain::ports::{OrderStore, ProductStore, UserStore};
use crate::domain::product::{Product, ProductDraft, ProductId};
use crate::domain::user::{NewUser, User, UserId, normalize_email};
use crate::error::{Result, ShopError};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for catalog products.
pub const CF_PRODUCTS: &str = "products";
/// Column Family for accounts.
pub const CF_USERS: &str = "users";
/// Unique index: normalized email to user id.
pub const CF_USER_EMAILS: &str = "user_emails";
/// Column Family for orders, items included.
pub const CF_ORDERS: &str = "orders";
/// Unique index: external reference to order id.
pub const CF_ORDER_REFS: &str = "order_refs";
/// Unique index: gateway payment id to order id.
pub const CF_ORDER_PAYMENTS: &str = "order_payments";
/// Last id handed out per table.
pub const CF_SEQUENCES: &str = "sequences";

const ALL_CFS: [&str; 7] = [
    CF_PRODUCTS,
    CF_USERS,
    CF_USER_EMAILS,
    CF_ORDERS,
    CF_ORDER_REFS,
    CF_ORDER_PAYMENTS,
    CF_SEQUENCES,
];

const SEQ_PRODUCTS: &str = "products";
const SEQ_USERS: &str = "users";
const SEQ_ORDERS: &str = "orders";
const SEQ_ORDER_ITEMS: &str = "order_items";

/// A persistent store implementation using RocksDB.
///
/// Products, users and orders live in separate Column Families, next to the
/// unique indexes and id sequences. Every write that touches an index goes
/// through one `WriteBatch` while holding the writer lock, so a check-then-write
/// on an index cannot interleave with another writer.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    writer: Arc<Mutex<()>>,
}

fn key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

fn decode_id(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| {
        ShopError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Malformed id in index",
        )))
    })?;
    Ok(u64::from_be_bytes(raw))
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating any
    /// missing Column Family.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = ALL_CFS
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            writer: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            ShopError::InternalError(Box::new(std::io::Error::other(format!(
                "Column family {name} not found"
            ))))
        })
    }

    fn get_json<T: DeserializeOwned>(&self, cf: &str, key: impl AsRef<[u8]>) -> Result<Option<T>> {
        match self.db.get_pinned_cf(self.cf(cf)?, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn index_lookup(&self, cf: &str, key: impl AsRef<[u8]>) -> Result<Option<u64>> {
        self.db
            .get_pinned_cf(self.cf(cf)?, key)?
            .map(|bytes| decode_id(&bytes))
            .transpose()
    }

    fn scan<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(self.cf(cf)?, IteratorMode::Start) {
            let (_key, value) = item?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }

    fn put_json<T: Serialize>(
        &self,
        batch: &mut WriteBatch,
        cf: &str,
        key: impl AsRef<[u8]>,
        value: &T,
    ) -> Result<()> {
        batch.put_cf(self.cf(cf)?, key, serde_json::to_vec(value)?);
        Ok(())
    }

    /// Reserves `count` ids from a sequence, recording the new high mark in `batch`.
    /// Returns the first reserved id. Callers must hold the writer lock.
    fn reserve_ids(&self, batch: &mut WriteBatch, sequence: &str, count: u64) -> Result<u64> {
        let last = self.index_lookup(CF_SEQUENCES, sequence)?.unwrap_or(0);
        batch.put_cf(self.cf(CF_SEQUENCES)?, sequence, key(last + count));
        Ok(last + 1)
    }

    fn newest_first<T>(mut rows: Vec<T>, sort_key: impl Fn(&T) -> (chrono::DateTime<Utc>, u64)) -> Vec<T> {
        rows.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));
        rows
    }
}

#[async_trait]
impl ProductStore for RocksDBStore {
    async fn insert(&self, draft: ProductDraft) -> Result<Product> {
        let _guard = self.writer.lock().await;
        let mut batch = WriteBatch::default();
        let id = self.reserve_ids(&mut batch, SEQ_PRODUCTS, 1)?;
        let product = Product::from_draft(id, draft, Utc::now());
        self.put_json(&mut batch, CF_PRODUCTS, key(id), &product)?;
        self.db.write(batch)?;
        Ok(product)
    }

    async fn update(&self, product: Product) -> Result<()> {
        let _guard = self.writer.lock().await;
        let existing: Option<Product> = self.get_json(CF_PRODUCTS, key(product.id))?;
        if !existing.is_some_and(|p| !p.is_deleted()) {
            return Err(ShopError::NotFound("Product"));
        }
        let mut batch = WriteBatch::default();
        self.put_json(&mut batch, CF_PRODUCTS, key(product.id), &product)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>> {
        let product: Option<Product> = self.get_json(CF_PRODUCTS, key(id))?;
        Ok(product.filter(|p| !p.is_deleted()))
    }

    async fn get_available(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let mut products = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(product) = self.get_json::<Product>(CF_PRODUCTS, key(id))?
                && product.is_purchasable()
            {
                products.push(product);
            }
        }
        Ok(products)
    }

    async fn list(&self, only_available: bool) -> Result<Vec<Product>> {
        let products: Vec<Product> = self
            .scan::<Product>(CF_PRODUCTS)?
            .into_iter()
            .filter(|p| !p.is_deleted() && (!only_available || p.available))
            .collect();
        Ok(Self::newest_first(products, |p| (p.created_at, p.id)))
    }

    async fn soft_delete(&self, id: ProductId) -> Result<Option<Product>> {
        let _guard = self.writer.lock().await;
        let Some(before) = self
            .get_json::<Product>(CF_PRODUCTS, key(id))?
            .filter(|p| !p.is_deleted())
        else {
            return Ok(None);
        };

        let mut deleted = before.clone();
        let now = Utc::now();
        deleted.deleted_at = Some(now);
        deleted.updated_at = now;

        let mut batch = WriteBatch::default();
        self.put_json(&mut batch, CF_PRODUCTS, key(id), &deleted)?;
        self.db.write(batch)?;
        Ok(Some(before))
    }
}

#[async_trait]
impl UserStore for RocksDBStore {
    async fn insert(&self, user: NewUser) -> Result<User> {
        let _guard = self.writer.lock().await;
        let email = normalize_email(&user.email);
        if self.index_lookup(CF_USER_EMAILS, &email)?.is_some() {
            return Err(ShopError::Conflict("Email already in use".to_string()));
        }

        let mut batch = WriteBatch::default();
        let id = self.reserve_ids(&mut batch, SEQ_USERS, 1)?;
        let user = User::new(id, user, Utc::now());
        self.put_json(&mut batch, CF_USERS, key(id), &user)?;
        batch.put_cf(self.cf(CF_USER_EMAILS)?, &email, key(id));
        self.db.write(batch)?;
        Ok(user)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>> {
        self.get_json(CF_USERS, key(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.index_lookup(CF_USER_EMAILS, normalize_email(email))? {
            Some(id) => self.get_json(CF_USERS, key(id)),
            None => Ok(None),
        }
    }

    async fn update(&self, user: User) -> Result<()> {
        let _guard = self.writer.lock().await;
        let current: User = self
            .get_json(CF_USERS, key(user.id))?
            .ok_or(ShopError::NotFound("User"))?;

        let mut batch = WriteBatch::default();
        if current.email != user.email {
            if self
                .index_lookup(CF_USER_EMAILS, &user.email)?
                .is_some_and(|owner| owner != user.id)
            {
                return Err(ShopError::Conflict("Email already in use".to_string()));
            }
            let emails = self.cf(CF_USER_EMAILS)?;
            batch.delete_cf(emails, &current.email);
            batch.put_cf(emails, &user.email, key(user.id));
        }
        self.put_json(&mut batch, CF_USERS, key(user.id), &user)?;
        self.db.write(batch)?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn create(&self, order: NewOrder) -> Result<Order> {
        let _guard = self.writer.lock().await;
        if self
            .index_lookup(CF_ORDER_REFS, &order.external_reference)?
            .is_some()
        {
            return Err(ShopError::Conflict(format!(
                "Duplicate order reference {}",
                order.external_reference
            )));
        }

        let mut batch = WriteBatch::default();
        let id = self.reserve_ids(&mut batch, SEQ_ORDERS, 1)?;
        let first_item_id =
            self.reserve_ids(&mut batch, SEQ_ORDER_ITEMS, order.items.len() as u64)?;
        let order = Order::from_new(id, first_item_id, order, Utc::now());

        self.put_json(&mut batch, CF_ORDERS, key(id), &order)?;
        batch.put_cf(
            self.cf(CF_ORDER_REFS)?,
            &order.external_reference,
            key(id),
        );
        self.db.write(batch)?;
        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        self.get_json(CF_ORDERS, key(id))
    }

    async fn find_by_payment_id(&self, payment_id: i64) -> Result<Option<Order>> {
        match self.index_lookup(CF_ORDER_PAYMENTS, payment_id.to_be_bytes())? {
            Some(id) => self.get_json(CF_ORDERS, key(id)),
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let orders = self
            .scan::<Order>(CF_ORDERS)?
            .into_iter()
            .filter(|o| o.user_id == user_id)
            .collect();
        Ok(Self::newest_first(orders, |o| (o.created_at, o.id)))
    }

    async fn list_all(&self) -> Result<Vec<Order>> {
        let orders = self.scan::<Order>(CF_ORDERS)?;
        Ok(Self::newest_first(orders, |o| (o.created_at, o.id)))
    }

    async fn update_payment(
        &self,
        id: OrderId,
        status: OrderStatus,
        payment_id: Option<i64>,
    ) -> Result<()> {
        let _guard = self.writer.lock().await;
        let mut order: Order = self
            .get_json(CF_ORDERS, key(id))?
            .ok_or(ShopError::NotFound("Order"))?;

        let mut batch = WriteBatch::default();
        if let Some(payment_id) = payment_id
            && order.gateway_payment_id != Some(payment_id)
        {
            let payments = self.cf(CF_ORDER_PAYMENTS)?;
            if self
                .index_lookup(CF_ORDER_PAYMENTS, payment_id.to_be_bytes())?
                .is_some_and(|owner| owner != id)
            {
                return Err(ShopError::Conflict(format!(
                    "Payment {payment_id} already belongs to another order"
                )));
            }
            if let Some(previous) = order.gateway_payment_id {
                batch.delete_cf(payments, previous.to_be_bytes());
            }
            batch.put_cf(payments, payment_id.to_be_bytes(), key(id));
            order.gateway_payment_id = Some(payment_id);
        }
        order.status = status;
        order.updated_at = Utc::now();
        self.put_json(&mut batch, CF_ORDERS, key(id), &order)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
        self.update_payment(id, status, None).await
    }

    async fn settle(&self, id: OrderId, status: OrderStatus) -> Result<Option<Order>> {
        let _guard = self.writer.lock().await;
        let mut order: Order = self
            .get_json(CF_ORDERS, key(id))?
            .ok_or(ShopError::NotFound("Order"))?;
        if !order.settle(status, Utc::now()) {
            return Ok(None);
        }

        let mut batch = WriteBatch::default();
        self.put_json(&mut batch, CF_ORDERS, key(id), &order)?;
        self.db.write(batch)?;
        Ok(Some(order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::{Money, Price};
    use crate::domain::order::NewOrderItem;
    use crate::domain::user::Role;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn new_order(reference: &str) -> NewOrder {
        NewOrder {
            user_id: 1,
            total: Money::new(dec!(12.00)),
            payment_method: "pix".to_string(),
            installments: 1,
            external_reference: reference.to_string(),
            items: vec![NewOrderItem {
                product_id: 1,
                product_name: "Chocolate".to_string(),
                quantity: 2,
                unit_price: Price::new(dec!(6.00)).unwrap(),
                subtotal: Money::new(dec!(12.00)),
            }],
        }
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");

        for name in ALL_CFS {
            assert!(store.db.cf_handle(name).is_some());
        }
    }

    #[tokio::test]
    async fn test_rocksdb_product_store() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        let draft = ProductDraft {
            name: "Chocolate".to_string(),
            description: String::new(),
            price: Price::new(dec!(6.00)).unwrap(),
            available: true,
            image_url: None,
        };
        let first = ProductStore::insert(&store, draft.clone()).await.unwrap();
        let second = ProductStore::insert(&store, draft).await.unwrap();
        assert_eq!(second.id, first.id + 1);

        ProductStore::soft_delete(&store, first.id).await.unwrap();
        assert!(ProductStore::get(&store, first.id).await.unwrap().is_none());
        assert_eq!(ProductStore::list(&store, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rocksdb_user_email_index() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        let new_user = |email: &str| NewUser {
            name: "Ana".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::Customer,
        };

        let mut ana = UserStore::insert(&store, new_user("ana@example.com")).await.unwrap();
        UserStore::insert(&store, new_user("bia@example.com")).await.unwrap();
        assert!(UserStore::insert(&store, new_user("ANA@example.com")).await.is_err());

        ana.email = "ana.souza@example.com".to_string();
        UserStore::update(&store, ana.clone()).await.unwrap();
        assert!(store.find_by_email("ana@example.com").await.unwrap().is_none());
        assert_eq!(
            store.find_by_email("ana.souza@example.com").await.unwrap().unwrap().id,
            ana.id
        );

        ana.email = "bia@example.com".to_string();
        assert!(matches!(
            UserStore::update(&store, ana).await,
            Err(ShopError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_rocksdb_order_indexes() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        let order = OrderStore::create(&store, new_order("pedido_1_1")).await.unwrap();
        let other = OrderStore::create(&store, new_order("pedido_1_2")).await.unwrap();
        assert_eq!(other.items[0].id, order.items[0].id + 1);
        assert!(OrderStore::create(&store, new_order("pedido_1_1")).await.is_err());

        store
            .update_payment(order.id, OrderStatus::Pending, Some(900))
            .await
            .unwrap();
        assert_eq!(
            store.find_by_payment_id(900).await.unwrap().unwrap().id,
            order.id
        );
        assert!(
            store
                .update_payment(other.id, OrderStatus::Pending, Some(900))
                .await
                .is_err()
        );

        store.update_status(order.id, OrderStatus::Paid).await.unwrap();
        let stored = OrderStore::get(&store, order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Paid);
        assert_eq!(stored.gateway_payment_id, Some(900));
    }

    #[tokio::test]
    async fn test_rocksdb_settle_leaves_settled_orders_alone() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        let order = OrderStore::create(&store, new_order("pedido_1_1")).await.unwrap();

        store.update_status(order.id, OrderStatus::Cancelled).await.unwrap();
        assert!(store.settle(order.id, OrderStatus::Paid).await.unwrap().is_none());
        let stored = OrderStore::get(&store, order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);

        let other = OrderStore::create(&store, new_order("pedido_1_2")).await.unwrap();
        let settled = store.settle(other.id, OrderStatus::Failed).await.unwrap();
        assert_eq!(settled.unwrap().status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn test_rocksdb_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDBStore::open(dir.path()).unwrap();
            OrderStore::create(&store, new_order("pedido_1_1")).await.unwrap();
        }
        let store = RocksDBStore::open(dir.path()).unwrap();
        let next = OrderStore::create(&store, new_order("pedido_1_2")).await.unwrap();
        assert_eq!(next.id, 2);
        assert_eq!(store.list_all().await.unwrap().len(), 2);
    }
}
