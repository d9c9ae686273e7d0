use crate::application::checkout::{CardCheckout, CardOutcome, PixCheckout};
use crate::application::orders::PixPayment;
use crate::domain::order::OrderId;
use crate::error::ShopError;
use crate::interfaces::http::AppState;
use crate::interfaces::http::auth::{CurrentUser, found};
use crate::interfaces::http::session::Session;
use crate::interfaces::http::views::{CartView, CheckoutView, NoContent, OrdersView, Page, PixPaymentView};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::info;

pub async fn dashboard(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut session: Session,
) -> Response {
    let page = Page::new("cliente_dashboard", &mut session, Some(&user), NoContent {});
    (session, Json(page)).into_response()
}

/// Checkout page. Sends the customer back to the cart when it cannot be paid.
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut session: Session,
) -> Result<Response, ShopError> {
    let priced = match state.shop.checkout_summary(session.cart()).await {
        Ok(priced) => priced,
        Err(ShopError::CartEmpty) => return Ok((session, found("/carrinho")).into_response()),
        Err(ShopError::UnavailableItems) => {
            session.error(
                "Alguns itens no seu carrinho não estão mais disponíveis. Verifique seu carrinho.",
            );
            return Ok((session, found("/carrinho")).into_response());
        }
        Err(e) => return Err(e),
    };

    let content = CheckoutView {
        cart: CartView::from(priced),
        public_key: state.public_key.clone(),
        payer_email: user.email.clone(),
    };
    let page = Page::new("checkout", &mut session, Some(&user), content);
    Ok((session, Json(page)).into_response())
}

pub async fn orders(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut session: Session,
) -> Result<Response, ShopError> {
    let orders = state.shop.customer_orders(user.id).await?;
    let page = Page::new("cliente_pedidos", &mut session, Some(&user), OrdersView { orders });
    Ok((session, Json(page)).into_response())
}

/// Shows the QR code of a pending PIX order again, or reconciles it when the
/// gateway says it is no longer pending.
pub async fn pix_payment(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut session: Session,
    Path(raw_id): Path<String>,
) -> Result<Response, ShopError> {
    let order_id: OrderId = raw_id.parse().map_err(|_| ShopError::NotFound("Page"))?;

    match state.shop.pix_payment(user.id, order_id).await? {
        PixPayment::AwaitingPayment { order, qr_code } => {
            let content = PixPaymentView {
                total: order.total,
                order,
                qr_code_base64: qr_code.qr_code_base64,
                qr_code: qr_code.qr_code,
            };
            let page = Page::new("pagamento_pix", &mut session, Some(&user), content);
            Ok((session, Json(page)).into_response())
        }
        PixPayment::Processing(order) => {
            info!(order_id = order.id, "PIX payment is being processed");
            session.success("Seu pagamento está em processamento. Verifique seu histórico em instantes.");
            Ok((session, found("/cliente/pedidos")).into_response())
        }
        PixPayment::StatusChanged(order) => {
            info!(order_id = order.id, status = %order.status, "PIX page found a settled payment");
            session.success("O status deste pagamento mudou. Verifique seu histórico.");
            Ok((session, found("/cliente/pedidos")).into_response())
        }
    }
}

/// Card checkout. The cart is emptied once the payment is approved.
pub async fn pay_with_card(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut session: Session,
    Json(checkout): Json<CardCheckout>,
) -> Result<Response, ShopError> {
    let payment = state.shop.pay_with_card(&user, session.cart(), checkout).await?;
    if payment.status == CardOutcome::Approved {
        session.cart_mut().clear();
    }
    Ok((session, Json(payment)).into_response())
}

/// PIX checkout. The cart is emptied as soon as the charge exists.
pub async fn pay_with_pix(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut session: Session,
    Json(checkout): Json<PixCheckout>,
) -> Result<Response, ShopError> {
    let charge = state.shop.pay_with_pix(&user, session.cart(), checkout).await?;
    session.cart_mut().clear();
    Ok((session, Json(charge)).into_response())
}
