use super::storefront::Storefront;
use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::domain::payment::{GatewayStatus, PixQrCode};
use crate::domain::user::UserId;
use crate::error::{Result, ShopError};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

/// An order as the merchant sees it in the sales list.
#[derive(Debug, Clone, Serialize)]
pub struct Sale {
    #[serde(flatten)]
    pub order: Order,
    pub customer_name: String,
    pub customer_email: String,
}

/// State of a PIX order when its customer opens the payment page.
#[derive(Debug, Clone, PartialEq)]
pub enum PixPayment {
    /// Still unpaid at the gateway; the QR code can be shown again.
    AwaitingPayment { order: Order, qr_code: PixQrCode },
    /// Still `pendente`, but the gateway has no QR code to show anymore.
    Processing(Order),
    /// The gateway no longer reports it as pending; the order was reconciled.
    StatusChanged(Order),
}

/// Outcome of reconciling a gateway notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    Updated(Order),
    Unchanged(Order),
    UnknownPayment,
}

impl Storefront {
    /// A customer's orders, newest first.
    pub async fn customer_orders(&self, user_id: UserId) -> Result<Vec<Order>> {
        self.orders.list_for_user(user_id).await
    }

    /// Every order with its customer, newest first.
    pub async fn sales(&self) -> Result<Vec<Sale>> {
        let orders = self.orders.list_all().await?;
        let mut customers = HashMap::new();
        let mut sales = Vec::with_capacity(orders.len());

        for order in orders {
            if !customers.contains_key(&order.user_id) {
                let user = self.users.get(order.user_id).await?;
                customers.insert(order.user_id, user);
            }
            let (customer_name, customer_email) = match customers.get(&order.user_id) {
                Some(Some(user)) => (user.name.clone(), user.email.clone()),
                _ => (String::new(), String::new()),
            };
            sales.push(Sale {
                order,
                customer_name,
                customer_email,
            });
        }
        Ok(sales)
    }

    /// Merchant override of an order's status.
    pub async fn set_order_status(&self, id: OrderId, status: OrderStatus) -> Result<Order> {
        let mut order = self.orders.get(id).await?.ok_or(ShopError::NotFound("Order"))?;
        self.orders.update_status(id, status).await?;
        info!(order_id = id, from = %order.status, to = %status, "order status set by merchant");
        order.status = status;
        Ok(order)
    }

    /// Loads a customer's pending PIX order and checks it against the gateway.
    pub async fn pix_payment(&self, user_id: UserId, order_id: OrderId) -> Result<PixPayment> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .filter(|order| order.user_id == user_id)
            .ok_or(ShopError::NotFound("Order"))?;

        let Some(payment_id) = order.gateway_payment_id.filter(|_| order.is_awaiting_pix()) else {
            return Err(ShopError::ValidationError(
                "Este pagamento não está pendente ou não é PIX.".to_string(),
            ));
        };

        let payment = self.gateway.get_payment(payment_id).await?;
        if payment.status.order_status() == OrderStatus::Pending {
            return Ok(match payment.pix_qr_code() {
                Some(qr_code) if payment.status == GatewayStatus::Pending => {
                    PixPayment::AwaitingPayment { order, qr_code }
                }
                _ => PixPayment::Processing(order),
            });
        }

        let (order, _) = self.settle(order, &payment.status).await?;
        Ok(PixPayment::StatusChanged(order))
    }

    /// Re-reads a payment from the gateway and settles the order that owns it.
    pub async fn reconcile_payment(&self, payment_id: i64) -> Result<Reconciliation> {
        let Some(order) = self.orders.find_by_payment_id(payment_id).await? else {
            debug!(payment_id, "notification for unknown payment");
            return Ok(Reconciliation::UnknownPayment);
        };
        let payment = self.gateway.get_payment(payment_id).await?;

        match self.settle(order, &payment.status).await? {
            (order, true) => Ok(Reconciliation::Updated(order)),
            (order, false) => Ok(Reconciliation::Unchanged(order)),
        }
    }

    /// Applies a gateway status through the store, so an order that left
    /// `pendente` while the gateway was being asked keeps its current status.
    /// Returns the order as stored afterwards and whether this call moved it.
    async fn settle(&self, order: Order, status: &GatewayStatus) -> Result<(Order, bool)> {
        let mapped = status.order_status();
        if mapped == OrderStatus::Pending {
            return Ok((order, false));
        }
        match self.orders.settle(order.id, mapped).await? {
            Some(settled) => {
                info!(
                    order_id = settled.id,
                    gateway_status = status.as_str(),
                    status = %settled.status,
                    "order settled"
                );
                Ok((settled, true))
            }
            None => {
                let current = self.orders.get(order.id).await?.unwrap_or(order);
                debug!(order_id = current.id, status = %current.status, "order already settled");
                Ok((current, false))
            }
        }
    }
}
