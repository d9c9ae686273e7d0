//! Route handlers, grouped by screen.

pub mod auth;
pub mod cart;
pub mod customer;
pub mod home;
pub mod merchant;
pub mod profile;
pub mod webhook;

use super::AppState;
use super::session::Session;
use crate::domain::user::User;
use crate::error::Result;

/// The user the session points at, if it still exists.
pub(crate) async fn session_user(state: &AppState, session: &Session) -> Result<Option<User>> {
    match session.user_id() {
        Some(id) => state.shop.user(id).await,
        None => Ok(None),
    }
}
