use crate::domain::ports::{OrderStoreBox, PaymentGatewayBox, ProductStoreBox, UserStoreBox};

/// The storefront's business operations.
///
/// `Storefront` owns the storage backends and the payment gateway. Its
/// operations are split by concern across the sibling modules of
/// [`crate::application`]: catalog, accounts, checkout and orders.
pub struct Storefront {
    pub(crate) products: ProductStoreBox,
    pub(crate) users: UserStoreBox,
    pub(crate) orders: OrderStoreBox,
    pub(crate) gateway: PaymentGatewayBox,
    pub(crate) notification_url: Option<String>,
    pub(crate) password_cost: u32,
}

impl Storefront {
    /// Creates a new `Storefront`.
    ///
    /// # Arguments
    ///
    /// * `products` - The catalog store.
    /// * `users` - The account store.
    /// * `orders` - The order store.
    /// * `gateway` - The payment gateway client.
    pub fn new(
        products: ProductStoreBox,
        users: UserStoreBox,
        orders: OrderStoreBox,
        gateway: PaymentGatewayBox,
    ) -> Self {
        Self {
            products,
            users,
            orders,
            gateway,
            notification_url: None,
            password_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// URL the gateway should call with payment notifications.
    pub fn with_notification_url(mut self, url: Option<String>) -> Self {
        self.notification_url = url;
        self
    }

    /// bcrypt work factor for new password hashes.
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }
}
