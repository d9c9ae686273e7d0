use crate::domain::user::ProfileUpdate;
use crate::error::ShopError;
use crate::interfaces::http::AppState;
use crate::interfaces::http::auth::{CurrentUser, found};
use crate::interfaces::http::session::Session;
use crate::interfaces::http::views::{NoContent, Page};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Form, Json};
use std::sync::Arc;

pub async fn show(Extension(CurrentUser(user)): Extension<CurrentUser>, mut session: Session) -> Response {
    let page = Page::new("perfil", &mut session, Some(&user), NoContent {});
    (session, Json(page)).into_response()
}

pub async fn edit_form(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut session: Session,
) -> Response {
    let page = Page::new("perfil_editar", &mut session, Some(&user), NoContent {});
    (session, Json(page)).into_response()
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut session: Session,
    Form(form): Form<ProfileUpdate>,
) -> Result<Response, ShopError> {
    match state.shop.update_profile(user.id, form).await {
        Ok(updated) => {
            session.login(&updated);
            session.success("Perfil atualizado com sucesso!");
            Ok((session, found("/perfil")).into_response())
        }
        Err(ShopError::ValidationError(message)) => {
            session.error(message);
            Ok((session, found("/perfil/editar")).into_response())
        }
        Err(ShopError::Conflict(_)) => {
            session.error("O e-mail informado já está em uso por outra conta.");
            Ok((session, found("/perfil/editar")).into_response())
        }
        Err(e) => Err(e),
    }
}
