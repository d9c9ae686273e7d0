use super::cart::PricedCart;
use super::money::{Money, Price};
use super::product::ProductId;
use super::user::UserId;
use crate::error::ShopError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type OrderId = u64;

/// Payment method recorded for PIX orders.
pub const PIX_METHOD: &str = "pix";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum OrderStatus {
    #[serde(rename = "pendente")]
    Pending,
    #[serde(rename = "pago")]
    Paid,
    #[serde(rename = "falhou")]
    Failed,
    #[serde(rename = "enviado")]
    Shipped,
    #[serde(rename = "entregue")]
    Delivered,
    #[serde(rename = "cancelado")]
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Failed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pendente",
            OrderStatus::Paid => "pago",
            OrderStatus::Failed => "falhou",
            OrderStatus::Shipped => "enviado",
            OrderStatus::Delivered => "entregue",
            OrderStatus::Cancelled => "cancelado",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| ShopError::ValidationError(format!("Status de pedido inválido: {s:?}")))
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct OrderItem {
    pub id: u64,
    pub order_id: OrderId,
    pub product_id: ProductId,
    /// Product name when the order was placed.
    pub product_name: String,
    pub quantity: u32,
    /// Catalog price when the order was placed.
    pub unit_price: Price,
    pub subtotal: Money,
    pub created_at: DateTime<Utc>,
}

/// A purchase and the state of its payment.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total: Money,
    /// Payment id assigned by the gateway, unique across orders.
    pub gateway_payment_id: Option<i64>,
    pub payment_method: String,
    pub installments: u32,
    /// Our reference sent to the gateway, unique across orders.
    pub external_reference: String,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Price,
    pub subtotal: Money,
}

/// An order about to be written; stores assign the ids.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub total: Money,
    pub payment_method: String,
    pub installments: u32,
    pub external_reference: String,
    pub items: Vec<NewOrderItem>,
}

/// Builds the `pedido_{user}_{nanos}` reference sent to the gateway.
pub fn external_reference(user_id: UserId, now: DateTime<Utc>) -> String {
    let nanos = now
        .timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros() * 1_000);
    format!("pedido_{user_id}_{nanos}")
}

impl NewOrder {
    pub fn from_cart(
        user_id: UserId,
        cart: &PricedCart,
        payment_method: impl Into<String>,
        installments: u32,
        external_reference: String,
    ) -> Self {
        let items = cart
            .lines
            .iter()
            .map(|line| NewOrderItem {
                product_id: line.product.id,
                product_name: line.product.name.clone(),
                quantity: line.quantity,
                unit_price: line.product.price,
                subtotal: line.subtotal,
            })
            .collect();

        Self {
            user_id,
            total: cart.total,
            payment_method: payment_method.into(),
            installments,
            external_reference,
            items,
        }
    }
}

impl Order {
    /// Materializes a new order with status `pendente`, numbering items from `first_item_id`.
    pub fn from_new(id: OrderId, first_item_id: u64, new: NewOrder, now: DateTime<Utc>) -> Self {
        let items = new
            .items
            .into_iter()
            .enumerate()
            .map(|(i, item)| OrderItem {
                id: first_item_id + i as u64,
                order_id: id,
                product_id: item.product_id,
                product_name: item.product_name,
                quantity: item.quantity,
                unit_price: item.unit_price,
                subtotal: item.subtotal,
                created_at: now,
            })
            .collect();

        Self {
            id,
            user_id: new.user_id,
            status: OrderStatus::Pending,
            total: new.total,
            gateway_payment_id: None,
            payment_method: new.payment_method,
            installments: new.installments,
            external_reference: new.external_reference,
            items,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pix(&self) -> bool {
        self.payment_method == PIX_METHOD
    }

    /// A PIX order whose payment has been generated but not settled yet.
    pub fn is_awaiting_pix(&self) -> bool {
        self.status == OrderStatus::Pending && self.is_pix() && self.gateway_payment_id.is_some()
    }

    /// Applies a status reported by the gateway.
    ///
    /// Only pending orders move, so replaying the same notification or polling an
    /// already settled payment has no effect. Returns whether the status changed.
    pub fn settle(&mut self, status: OrderStatus, now: DateTime<Utc>) -> bool {
        if self.status != OrderStatus::Pending || status == OrderStatus::Pending {
            return false;
        }
        self.status = status;
        self.updated_at = now;
        true
    }
}
