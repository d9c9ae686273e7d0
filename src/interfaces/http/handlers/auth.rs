use super::session_user;
use crate::application::accounts::Registration;
use crate::error::ShopError;
use crate::interfaces::http::AppState;
use crate::interfaces::http::auth::found;
use crate::interfaces::http::session::Session;
use crate::interfaces::http::views::{NoContent, Page};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    #[serde(rename = "senha")]
    pub password: String,
}

pub async fn register_form(
    State(state): State<Arc<AppState>>,
    mut session: Session,
) -> Result<Response, ShopError> {
    let user = session_user(&state, &session).await?;
    let page = Page::new("cadastro", &mut session, user.as_ref(), NoContent {});
    Ok((session, Json(page)).into_response())
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    mut session: Session,
    Form(form): Form<Registration>,
) -> Result<Response, ShopError> {
    match state.shop.register(form).await {
        Ok(_) => {
            session.success("Cadastro realizado com sucesso! Faça o login.");
            Ok((session, found("/login")).into_response())
        }
        Err(ShopError::ValidationError(message)) => {
            session.error(message);
            Ok((session, found("/cadastro")).into_response())
        }
        Err(ShopError::Conflict(_)) => {
            session.error("Este e-mail já está cadastrado.");
            Ok((session, found("/cadastro")).into_response())
        }
        Err(e) => Err(e),
    }
}

pub async fn login_form(
    State(state): State<Arc<AppState>>,
    mut session: Session,
) -> Result<Response, ShopError> {
    let user = session_user(&state, &session).await?;
    let page = Page::new("login", &mut session, user.as_ref(), NoContent {});
    Ok((session, Json(page)).into_response())
}

/// Checks credentials and sends the user to their role's dashboard.
pub async fn login(
    State(state): State<Arc<AppState>>,
    mut session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, ShopError> {
    match state.shop.authenticate(&form.email, &form.password).await {
        Ok(user) => {
            info!(user_id = user.id, role = ?user.role, "user logged in");
            session.login(&user);
            Ok((session, found(user.role.dashboard_path())).into_response())
        }
        Err(ShopError::InvalidCredentials | ShopError::ValidationError(_)) => {
            session.error("E-mail ou senha inválidos.");
            Ok((session, found("/login")).into_response())
        }
        Err(e) => Err(e),
    }
}

pub async fn logout(mut session: Session) -> Response {
    if let Some(user_id) = session.user_id() {
        info!(user_id, "user logged out");
    }
    session.destroy();
    (session, found("/login")).into_response()
}
