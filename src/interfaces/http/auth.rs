use super::AppState;
use super::session::Session;
use crate::domain::user::User;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::{debug, warn};

/// The authenticated user, placed in request extensions by [`require_user`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// `302 Found` redirect, as browsers expect after a form post.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

/// Lets the request through only with a session pointing at an existing user.
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(user_id) = session.user_id() else {
        debug!(path = %request.uri().path(), "anonymous access to protected route");
        return found("/login");
    };

    match state.shop.user(user_id).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        Ok(None) => {
            warn!(user_id, "session for a user that no longer exists");
            session.destroy();
            (session, found("/login")).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Must run after [`require_user`].
pub async fn require_merchant(request: Request, next: Next) -> Response {
    match request.extensions().get::<CurrentUser>() {
        Some(CurrentUser(user)) if user.is_merchant() => next.run(request).await,
        Some(CurrentUser(user)) => {
            warn!(user_id = user.id, "non-merchant tried the back office");
            (StatusCode::FORBIDDEN, "Acesso negado.").into_response()
        }
        None => found("/login"),
    }
}
