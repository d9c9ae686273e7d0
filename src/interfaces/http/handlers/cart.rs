use super::session_user;
use crate::domain::product::ProductId;
use crate::error::ShopError;
use crate::interfaces::http::AppState;
use crate::interfaces::http::session::Session;
use crate::interfaces::http::views::{CartUpdate, CartView, Page};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

fn parse_id(raw: &str, message: &'static str) -> Result<ProductId, Response> {
    raw.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": message })),
        )
            .into_response()
    })
}

fn updated(session: Session, message: &'static str) -> Response {
    let body = CartUpdate {
        success: true,
        message,
        new_cart_count: session.cart().total_quantity(),
    };
    (session, Json(body)).into_response()
}

pub async fn add(
    State(state): State<Arc<AppState>>,
    mut session: Session,
    Path(raw_id): Path<String>,
) -> Response {
    let id = match parse_id(&raw_id, "ID do cupcake inválido.") {
        Ok(id) => id,
        Err(response) => return response,
    };
    if let Err(e) = state.shop.available_product(id).await {
        return e.into_response();
    }

    session.cart_mut().add(id);
    debug!(product_id = id, "added to cart");
    updated(session, "Item adicionado com sucesso!")
}

pub async fn remove(mut session: Session, Path(raw_id): Path<String>) -> Response {
    let id = match parse_id(&raw_id, "ID inválido.") {
        Ok(id) => id,
        Err(response) => return response,
    };
    if session.cart().is_empty() {
        return updated(session, "Carrinho já vazio.");
    }
    session.cart_mut().remove(id);
    updated(session, "Item removido.")
}

pub async fn decrease(mut session: Session, Path(raw_id): Path<String>) -> Response {
    let id = match parse_id(&raw_id, "ID inválido.") {
        Ok(id) => id,
        Err(response) => return response,
    };
    if session.cart().is_empty() {
        return updated(session, "Carrinho já vazio.");
    }
    session.cart_mut().decrease(id);
    updated(session, "Quantidade atualizada.")
}

pub async fn clear(mut session: Session) -> Response {
    session.cart_mut().clear();
    updated(session, "Carrinho esvaziado.")
}

/// Cart page, priced against the products that can still be bought.
pub async fn show(
    State(state): State<Arc<AppState>>,
    mut session: Session,
) -> Result<Response, ShopError> {
    let user = session_user(&state, &session).await?;
    let priced = state.shop.price_cart(session.cart()).await?;
    let item_count = priced.item_count();

    let mut page = Page::new("carrinho", &mut session, user.as_ref(), CartView::from(priced));
    page.cart_item_count = item_count;
    Ok((session, Json(page)).into_response())
}
