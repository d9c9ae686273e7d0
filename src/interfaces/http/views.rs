//! JSON view models returned by page routes.

use super::session::{Flash, Session};
use crate::domain::cart::{CartLine, PricedCart};
use crate::domain::money::Money;
use crate::domain::order::Order;
use crate::domain::product::Product;
use crate::domain::user::{Address, Role, User, UserId};
use crate::application::orders::Sale;
use serde::Serialize;

/// A user without credentials.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Address,
    pub role: Role,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            address: user.address.clone(),
            role: user.role,
        }
    }
}

/// Fields every page carries, followed by the page's own content.
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub page: &'static str,
    pub is_logged_in: bool,
    pub user: Option<UserView>,
    pub cart_item_count: u32,
    pub flashes: Vec<Flash>,
    #[serde(flatten)]
    pub content: T,
}

impl<T: Serialize> Page<T> {
    /// Builds a page, consuming the session's pending flash messages.
    pub fn new(page: &'static str, session: &mut Session, user: Option<&User>, content: T) -> Self {
        Self {
            page,
            is_logged_in: user.is_some(),
            user: user.map(UserView::from),
            cart_item_count: session.cart().total_quantity(),
            flashes: session.take_flashes(),
            content,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NoContent {}

#[derive(Debug, Serialize)]
pub struct ProductsView {
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct CartLineView {
    pub product: Product,
    pub quantity: u32,
    pub subtotal: Money,
}

impl From<CartLine> for CartLineView {
    fn from(line: CartLine) -> Self {
        Self {
            product: line.product,
            quantity: line.quantity,
            subtotal: line.subtotal,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total: Money,
}

impl From<PricedCart> for CartView {
    fn from(cart: PricedCart) -> Self {
        Self {
            total: cart.total,
            items: cart.lines.into_iter().map(CartLineView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckoutView {
    #[serde(flatten)]
    pub cart: CartView,
    pub public_key: Option<String>,
    pub payer_email: String,
}

#[derive(Debug, Serialize)]
pub struct OrdersView {
    pub orders: Vec<Order>,
}

#[derive(Debug, Serialize)]
pub struct PixPaymentView {
    pub order: Order,
    pub total: Money,
    pub qr_code_base64: String,
    pub qr_code: String,
}

#[derive(Debug, Serialize)]
pub struct SalesView {
    pub sales: Vec<Sale>,
    pub statuses: Vec<&'static str>,
}

/// Response body of the cart endpoints.
#[derive(Debug, Serialize)]
pub struct CartUpdate {
    pub success: bool,
    pub message: &'static str,
    #[serde(rename = "newCartCount")]
    pub new_cart_count: u32,
}
