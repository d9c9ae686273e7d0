use super::storefront::Storefront;
use crate::domain::cart::{Cart, PricedCart};
use crate::domain::money::PRICE_TOLERANCE;
use crate::domain::order::{NewOrder, Order, OrderId, OrderStatus, PIX_METHOD, external_reference};
use crate::domain::payment::{GatewayStatus, Identification, Payer, PaymentRequest};
use crate::domain::user::User;
use crate::error::{Result, ShopError};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

const DEFAULT_DESCRIPTION: &str = "Pedido Meu Cupcake";

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutPayer {
    pub email: String,
    #[serde(default)]
    pub identification: Option<Identification>,
}

/// Card payment submitted by the checkout page after tokenizing the card.
#[derive(Debug, Clone, Deserialize)]
pub struct CardCheckout {
    pub token: String,
    #[serde(default)]
    pub issuer_id: Option<String>,
    pub payment_method_id: String,
    /// Total the page displayed. Only used to detect a stale cart.
    #[serde(with = "rust_decimal::serde::float")]
    pub transaction_amount: Decimal,
    #[serde(default = "default_installments")]
    pub installments: u32,
    #[serde(default)]
    pub description: String,
    pub payer: CheckoutPayer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PixCheckout {
    #[serde(with = "rust_decimal::serde::float")]
    pub transaction_amount: Decimal,
    #[serde(default)]
    pub description: String,
    pub payer: CheckoutPayer,
}

fn default_installments() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardOutcome {
    Approved,
    Pending,
    Rejected,
}

/// Result of a card checkout, as reported back to the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardPayment {
    pub status: CardOutcome,
    pub message: String,
    #[serde(rename = "paymentId")]
    pub payment_id: Option<i64>,
    #[serde(skip)]
    pub order_id: OrderId,
}

/// A generated PIX charge waiting to be paid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PixCharge {
    pub status: &'static str,
    pub payment_id: i64,
    pub qr_code_base64: String,
    pub qr_code: String,
    #[serde(skip)]
    pub order_id: OrderId,
}

fn description_or_default(description: String) -> String {
    if description.trim().is_empty() {
        DEFAULT_DESCRIPTION.to_string()
    } else {
        description
    }
}

impl Storefront {
    /// Prices a cart for checkout, refusing empty carts and carts holding
    /// products that can no longer be bought.
    pub async fn checkout_summary(&self, cart: &Cart) -> Result<PricedCart> {
        if cart.is_empty() {
            return Err(ShopError::CartEmpty);
        }
        let priced = self.price_cart(cart).await?;
        if !priced.is_complete() {
            warn!(missing = ?priced.missing, "cart holds unavailable products");
            return Err(ShopError::UnavailableItems);
        }
        Ok(priced)
    }

    async fn validated_cart(&self, cart: &Cart, submitted: Decimal) -> Result<PricedCart> {
        let priced = self.checkout_summary(cart).await?;
        if !priced.total.is_within(submitted, PRICE_TOLERANCE) {
            warn!(expected = %priced.total.value(), %submitted, "submitted total differs from catalog");
            return Err(ShopError::TotalMismatch {
                expected: priced.total.value(),
                submitted,
            });
        }
        Ok(priced)
    }

    async fn place_order(
        &self,
        user: &User,
        priced: &PricedCart,
        method: &str,
        installments: u32,
    ) -> Result<Order> {
        let reference = external_reference(user.id, Utc::now());
        let order = self
            .orders
            .create(NewOrder::from_cart(
                user.id,
                priced,
                method,
                installments,
                reference,
            ))
            .await?;
        info!(
            order_id = order.id,
            reference = %order.external_reference,
            total = %order.total.value(),
            method,
            "order created"
        );
        Ok(order)
    }

    /// Charges a tokenized card for the cart.
    ///
    /// The order is written as `pendente` before the gateway is called and then
    /// updated with the mapped status. The amount sent is always the server total.
    pub async fn pay_with_card(
        &self,
        user: &User,
        cart: &Cart,
        checkout: CardCheckout,
    ) -> Result<CardPayment> {
        let priced = self.validated_cart(cart, checkout.transaction_amount).await?;
        let installments = checkout.installments.max(1);
        let order = self
            .place_order(user, &priced, &checkout.payment_method_id, installments)
            .await?;

        let request = PaymentRequest {
            transaction_amount: order.total.value(),
            token: Some(checkout.token),
            description: description_or_default(checkout.description),
            installments: Some(installments),
            payment_method_id: checkout.payment_method_id,
            issuer_id: checkout.issuer_id.filter(|id| !id.is_empty()),
            external_reference: order.external_reference.clone(),
            payer: Payer {
                email: checkout.payer.email,
                first_name: None,
                identification: checkout.payer.identification,
            },
            notification_url: self.notification_url.clone(),
        };

        let (status, outcome, message, payment_id) = match self
            .gateway
            .create_payment(&request, &order.external_reference)
            .await
        {
            Ok(payment) => {
                info!(
                    order_id = order.id,
                    payment_id = payment.id,
                    status = payment.status.as_str(),
                    "card payment created"
                );
                let (outcome, message) = match payment.status {
                    GatewayStatus::Approved => {
                        (CardOutcome::Approved, "Pagamento aprovado!".to_string())
                    }
                    GatewayStatus::Pending | GatewayStatus::InProcess => {
                        (CardOutcome::Pending, "Pagamento pendente.".to_string())
                    }
                    _ => (
                        CardOutcome::Rejected,
                        format!(
                            "Pagamento não aprovado ({}).",
                            payment.status_detail.as_deref().unwrap_or_default()
                        ),
                    ),
                };
                (
                    payment.status.order_status(),
                    outcome,
                    message,
                    Some(payment.id),
                )
            }
            Err(e) => {
                error!(order_id = order.id, error = %e, "card payment failed at the gateway");
                (
                    OrderStatus::Failed,
                    CardOutcome::Rejected,
                    "Erro ao processar pagamento com o provedor.".to_string(),
                    None,
                )
            }
        };

        if let Err(e) = self.orders.update_payment(order.id, status, payment_id).await {
            error!(
                order_id = order.id,
                reference = %order.external_reference,
                payment_id = ?payment_id,
                status = %status,
                error = %e,
                "failed to record payment result"
            );
        }

        Ok(CardPayment {
            status: outcome,
            message,
            payment_id,
            order_id: order.id,
        })
    }

    /// Generates a PIX charge for the cart.
    pub async fn pay_with_pix(
        &self,
        user: &User,
        cart: &Cart,
        checkout: PixCheckout,
    ) -> Result<PixCharge> {
        let priced = self.validated_cart(cart, checkout.transaction_amount).await?;
        let order = self.place_order(user, &priced, PIX_METHOD, 1).await?;

        let request = PaymentRequest {
            transaction_amount: order.total.value(),
            token: None,
            description: description_or_default(checkout.description),
            installments: None,
            payment_method_id: PIX_METHOD.to_string(),
            issuer_id: None,
            external_reference: order.external_reference.clone(),
            payer: Payer {
                email: checkout.payer.email,
                first_name: Some(user.name.clone()),
                identification: None,
            },
            notification_url: self.notification_url.clone(),
        };

        let payment = match self
            .gateway
            .create_payment(&request, &order.external_reference)
            .await
        {
            Ok(payment) => payment,
            Err(e) => {
                error!(order_id = order.id, error = %e, "PIX charge failed at the gateway");
                self.orders
                    .update_payment(order.id, OrderStatus::Failed, None)
                    .await?;
                return Err(ShopError::GatewayError(
                    "Erro ao gerar PIX com o provedor.".to_string(),
                ));
            }
        };

        let qr_code = match (&payment.status, payment.pix_qr_code()) {
            (GatewayStatus::Pending, Some(qr_code)) => qr_code,
            (status, _) => {
                warn!(
                    order_id = order.id,
                    payment_id = payment.id,
                    status = status.as_str(),
                    "unexpected PIX charge status"
                );
                self.orders
                    .update_payment(order.id, OrderStatus::Failed, Some(payment.id))
                    .await?;
                return Err(ShopError::GatewayError(
                    "Status inesperado do provedor de pagamento.".to_string(),
                ));
            }
        };

        self.orders
            .update_payment(order.id, OrderStatus::Pending, Some(payment.id))
            .await?;
        info!(order_id = order.id, payment_id = payment.id, "PIX charge generated");

        Ok(PixCharge {
            status: "pending",
            payment_id: payment.id,
            qr_code_base64: qr_code.qr_code_base64,
            qr_code: qr_code.qr_code,
            order_id: order.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{customer, storefront};
    use crate::domain::money::{Money, Price};
    use crate::domain::ports::OrderStore;
    use crate::domain::product::ProductDraft;
    use crate::domain::user::UserId;
    use crate::infrastructure::in_memory::{
        InMemoryOrderStore, InMemoryPaymentGateway, InMemoryProductStore, InMemoryUserStore,
    };
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    async fn cart_with(shop: &Storefront, price: Decimal, quantity: u32) -> Cart {
        let product = shop
            .add_product(ProductDraft {
                name: "Morango".to_string(),
                description: String::new(),
                price: Price::new(price).unwrap(),
                available: true,
                image_url: None,
            })
            .await
            .unwrap();
        let mut cart = Cart::new();
        for _ in 0..quantity {
            cart.add(product.id);
        }
        cart
    }

    fn card(amount: Decimal) -> CardCheckout {
        CardCheckout {
            token: "tok_123".to_string(),
            issuer_id: Some(String::new()),
            payment_method_id: "visa".to_string(),
            transaction_amount: amount,
            installments: 0,
            description: String::new(),
            payer: CheckoutPayer {
                email: "ana@example.com".to_string(),
                identification: Some(Identification {
                    kind: "CPF".to_string(),
                    number: "12345678909".to_string(),
                }),
            },
        }
    }

    fn pix(amount: Decimal) -> PixCheckout {
        PixCheckout {
            transaction_amount: amount,
            description: "Cupcakes".to_string(),
            payer: CheckoutPayer {
                email: "ana@example.com".to_string(),
                identification: None,
            },
        }
    }

    #[tokio::test]
    async fn test_summary_rejects_empty_and_unavailable() {
        let (shop, _) = storefront();
        assert!(matches!(
            shop.checkout_summary(&Cart::new()).await,
            Err(ShopError::CartEmpty)
        ));

        let mut cart = cart_with(&shop, dec!(8.00), 1).await;
        cart.add(404);
        assert!(matches!(
            shop.checkout_summary(&cart).await,
            Err(ShopError::UnavailableItems)
        ));
    }

    #[tokio::test]
    async fn test_approved_card_payment_marks_order_paid() {
        let (shop, gateway) = storefront();
        let user = customer(&shop).await;
        let cart = cart_with(&shop, dec!(10.00), 2).await;

        let result = shop.pay_with_card(&user, &cart, card(dec!(20.00))).await.unwrap();
        assert_eq!(result.status, CardOutcome::Approved);
        assert_eq!(result.message, "Pagamento aprovado!");

        let order = shop.orders.get(result.order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.gateway_payment_id, result.payment_id);
        assert_eq!(order.installments, 1);
        assert_eq!(order.total, Money::new(dec!(20.00)));

        let requests = gateway.requests().await;
        assert_eq!(requests.len(), 1);
        let (request, key) = &requests[0];
        assert_eq!(request.transaction_amount, dec!(20.00));
        assert_eq!(key, &order.external_reference);
        assert_eq!(request.issuer_id, None);
        assert_eq!(request.description, DEFAULT_DESCRIPTION);
    }

    #[tokio::test]
    async fn test_total_within_tolerance_is_accepted() {
        let (shop, _) = storefront();
        let user = customer(&shop).await;
        let cart = cart_with(&shop, dec!(10.00), 2).await;

        assert!(shop.pay_with_card(&user, &cart, card(dec!(20.01))).await.is_ok());
        assert!(matches!(
            shop.pay_with_card(&user, &cart, card(dec!(19.98))).await,
            Err(ShopError::TotalMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_rejected_card_payment_reports_detail() {
        let (shop, gateway) = storefront();
        gateway
            .script_next(GatewayStatus::Rejected, Some("cc_rejected_insufficient_amount"))
            .await;
        let user = customer(&shop).await;
        let cart = cart_with(&shop, dec!(5.00), 1).await;

        let result = shop.pay_with_card(&user, &cart, card(dec!(5.00))).await.unwrap();
        assert_eq!(result.status, CardOutcome::Rejected);
        assert_eq!(
            result.message,
            "Pagamento não aprovado (cc_rejected_insufficient_amount)."
        );
        let order = shop.orders.get(result.order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn test_card_gateway_error_fails_order() {
        let (shop, gateway) = storefront();
        gateway.fail_next().await;
        let user = customer(&shop).await;
        let cart = cart_with(&shop, dec!(5.00), 1).await;

        let result = shop.pay_with_card(&user, &cart, card(dec!(5.00))).await.unwrap();
        assert_eq!(result.status, CardOutcome::Rejected);
        assert_eq!(result.payment_id, None);
        let order = shop.orders.get(result.order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn test_pix_charge_keeps_order_pending() {
        let (shop, gateway) = storefront();
        gateway.script_next(GatewayStatus::Pending, None).await;
        let user = customer(&shop).await;
        let cart = cart_with(&shop, dec!(7.50), 2).await;

        let charge = shop.pay_with_pix(&user, &cart, pix(dec!(15.00))).await.unwrap();
        assert_eq!(charge.status, "pending");
        assert!(!charge.qr_code.is_empty());

        let order = shop.orders.get(charge.order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.is_awaiting_pix());

        let (request, _) = gateway.requests().await.remove(0);
        assert_eq!(request.payment_method_id, "pix");
        assert_eq!(request.payer.first_name.as_deref(), Some(user.name.as_str()));
    }

    #[tokio::test]
    async fn test_pix_gateway_error_fails_order() {
        let (shop, gateway) = storefront();
        gateway.fail_next().await;
        let user = customer(&shop).await;
        let cart = cart_with(&shop, dec!(7.50), 1).await;

        assert!(matches!(
            shop.pay_with_pix(&user, &cart, pix(dec!(7.50))).await,
            Err(ShopError::GatewayError(_))
        ));
        let orders = shop.orders.list_for_user(user.id).await.unwrap();
        assert_eq!(orders[0].status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn test_pix_unexpected_status_fails_order() {
        let (shop, gateway) = storefront();
        gateway.script_next(GatewayStatus::Rejected, None).await;
        let user = customer(&shop).await;
        let cart = cart_with(&shop, dec!(7.50), 1).await;

        assert!(shop.pay_with_pix(&user, &cart, pix(dec!(7.50))).await.is_err());
        let orders = shop.orders.list_for_user(user.id).await.unwrap();
        assert_eq!(orders[0].status, OrderStatus::Failed);
        assert!(orders[0].gateway_payment_id.is_some());
    }

    /// Order store that loses payment updates.
    struct LossyOrders(InMemoryOrderStore);

    #[async_trait]
    impl OrderStore for LossyOrders {
        async fn create(&self, order: NewOrder) -> Result<Order> {
            self.0.create(order).await
        }
        async fn get(&self, id: OrderId) -> Result<Option<Order>> {
            self.0.get(id).await
        }
        async fn find_by_payment_id(&self, payment_id: i64) -> Result<Option<Order>> {
            self.0.find_by_payment_id(payment_id).await
        }
        async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
            self.0.list_for_user(user_id).await
        }
        async fn list_all(&self) -> Result<Vec<Order>> {
            self.0.list_all().await
        }
        async fn update_payment(&self, _: OrderId, _: OrderStatus, _: Option<i64>) -> Result<()> {
            Err(ShopError::IoError(std::io::Error::other("disk full")))
        }
        async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
            self.0.update_status(id, status).await
        }
        async fn settle(&self, id: OrderId, status: OrderStatus) -> Result<Option<Order>> {
            self.0.settle(id, status).await
        }
    }

    #[tokio::test]
    async fn test_card_result_reported_when_order_update_fails() {
        let orders = InMemoryOrderStore::new();
        let shop = Storefront::new(
            Box::new(InMemoryProductStore::new()),
            Box::new(InMemoryUserStore::new()),
            Box::new(LossyOrders(orders.clone())),
            Box::new(InMemoryPaymentGateway::new()),
        )
        .with_password_cost(4);
        let user = customer(&shop).await;
        let cart = cart_with(&shop, dec!(8.00), 1).await;

        let result = shop.pay_with_card(&user, &cart, card(dec!(8.00))).await.unwrap();
        assert_eq!(result.status, CardOutcome::Approved);
        assert!(result.payment_id.is_some());

        let order = orders.get(result.order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.gateway_payment_id, None);
    }
}
