use super::session_user;
use crate::error::ShopError;
use crate::interfaces::http::AppState;
use crate::interfaces::http::auth::found;
use crate::interfaces::http::session::Session;
use crate::interfaces::http::views::{NoContent, Page, ProductsView};
use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

/// Landing page. Signed-in users go straight to their dashboard.
pub async fn index(
    State(state): State<Arc<AppState>>,
    mut session: Session,
) -> Result<Response, ShopError> {
    if let Some(user) = session_user(&state, &session).await? {
        return Ok(found(user.role.dashboard_path()));
    }
    let page = Page::new("home", &mut session, None, NoContent {});
    Ok((session, Json(page)).into_response())
}

pub async fn showcase(
    State(state): State<Arc<AppState>>,
    mut session: Session,
) -> Result<Response, ShopError> {
    let user = session_user(&state, &session).await?;
    let products = state.shop.showcase().await?;
    let page = Page::new(
        "vitrine",
        &mut session,
        user.as_ref(),
        ProductsView { products },
    );
    Ok((session, Json(page)).into_response())
}

pub async fn payment_success(
    State(state): State<Arc<AppState>>,
    mut session: Session,
) -> Result<Response, ShopError> {
    let user = session_user(&state, &session).await?;
    let page = Page::new("pagamento_sucesso", &mut session, user.as_ref(), NoContent {});
    Ok((session, Json(page)).into_response())
}
