//! Signed cookie sessions.
//!
//! The whole session (logged-in user, cart and pending flash messages) lives in
//! the `meu-cupcake-session` cookie as base64url JSON followed by an
//! HMAC-SHA256 tag. A cookie that fails verification, does not parse or is older
//! than [`SESSION_TTL_DAYS`] is ignored and the request starts a fresh session.

use crate::domain::cart::Cart;
use crate::domain::user::{User, UserId};
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponseParts, ResponseParts};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "meu-cupcake-session";
pub const SESSION_TTL_DAYS: i64 = 30;

/// Signing key and cookie attributes shared by every request.
#[derive(Clone)]
pub struct SessionConfig {
    key: Arc<[u8]>,
    secure: bool,
}

impl SessionConfig {
    pub fn new(secret: &str, secure: bool) -> Self {
        Self {
            key: Arc::from(secret.as_bytes()),
            secure,
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size")
    }

    fn sign(&self, payload: &str) -> String {
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    fn verify(&self, payload: &str, tag: &str) -> bool {
        let Ok(tag) = URL_SAFE_NO_PAD.decode(tag) else {
            return false;
        };
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&tag).is_ok()
    }

    fn attributes(&self, max_age: i64) -> String {
        let secure = if self.secure { "; Secure" } else { "" };
        format!("Path=/; Max-Age={max_age}; HttpOnly; SameSite=Lax{secure}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// A one-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct SessionData {
    #[serde(default)]
    user_id: Option<UserId>,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    cart: Cart,
    #[serde(default)]
    flashes: Vec<Flash>,
    issued_at: i64,
}

/// The visitor's session.
///
/// Extracted from the request cookie; returning it as part of a response writes
/// the cookie back only when something changed.
pub struct Session {
    data: SessionData,
    config: SessionConfig,
    changed: bool,
    destroyed: bool,
}

impl Session {
    fn fresh(config: SessionConfig) -> Self {
        Self {
            data: SessionData::default(),
            config,
            changed: false,
            destroyed: false,
        }
    }

    fn decode(config: &SessionConfig, raw: &str) -> Option<SessionData> {
        let (payload, tag) = raw.split_once('.')?;
        if !config.verify(payload, tag) {
            warn!("session cookie with invalid signature");
            return None;
        }
        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let data: SessionData = serde_json::from_slice(&json).ok()?;
        let age = Utc::now().timestamp() - data.issued_at;
        if age > Duration::days(SESSION_TTL_DAYS).num_seconds() {
            debug!("session cookie expired");
            return None;
        }
        Some(data)
    }

    fn encode(&self) -> Option<String> {
        let mut data = self.data.clone();
        data.issued_at = Utc::now().timestamp();
        let json = serde_json::to_vec(&data).ok()?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let tag = self.config.sign(&payload);
        Some(format!("{payload}.{tag}"))
    }

    /// Reads the session from request headers.
    pub fn from_headers(headers: &HeaderMap, config: &SessionConfig) -> Self {
        let data = cookie_value(headers, SESSION_COOKIE)
            .and_then(|raw| Self::decode(config, raw));
        match data {
            Some(data) => Self {
                data,
                config: config.clone(),
                changed: false,
                destroyed: false,
            },
            None => Self::fresh(config.clone()),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.data.user_id
    }

    pub fn user_name(&self) -> Option<&str> {
        self.data.user_name.as_deref()
    }

    pub fn login(&mut self, user: &User) {
        self.data.user_id = Some(user.id);
        self.data.user_name = Some(user.name.clone());
        self.changed = true;
    }

    /// Drops the whole session, cart included, and expires the cookie.
    pub fn destroy(&mut self) {
        self.data = SessionData::default();
        self.destroyed = true;
    }

    pub fn cart(&self) -> &Cart {
        &self.data.cart
    }

    pub fn cart_mut(&mut self) -> &mut Cart {
        self.changed = true;
        &mut self.data.cart
    }

    pub fn flash(&mut self, kind: FlashKind, message: impl Into<String>) {
        self.data.flashes.push(Flash {
            kind,
            message: message.into(),
        });
        self.changed = true;
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.flash(FlashKind::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.flash(FlashKind::Error, message);
    }

    /// Removes and returns the pending flash messages.
    pub fn take_flashes(&mut self) -> Vec<Flash> {
        if self.data.flashes.is_empty() {
            return Vec::new();
        }
        self.changed = true;
        std::mem::take(&mut self.data.flashes)
    }

    /// The `Set-Cookie` value this session would emit, if any.
    pub fn set_cookie(&self) -> Option<String> {
        if self.destroyed {
            return Some(format!("{SESSION_COOKIE}=; {}", self.config.attributes(0)));
        }
        if !self.changed {
            return None;
        }
        let value = self.encode()?;
        let max_age = Duration::days(SESSION_TTL_DAYS).num_seconds();
        Some(format!(
            "{SESSION_COOKIE}={value}; {}",
            self.config.attributes(max_age)
        ))
    }
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

impl<S> FromRequestParts<S> for Session
where
    SessionConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = SessionConfig::from_ref(state);
        Ok(Session::from_headers(&parts.headers, &config))
    }
}

impl IntoResponseParts for Session {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        if let Some(cookie) = self.set_cookie() {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    res.headers_mut().append(SET_COOKIE, value);
                }
                Err(e) => warn!(error = %e, "could not encode session cookie"),
            }
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::{NewUser, Role};

    fn config() -> SessionConfig {
        SessionConfig::new("test-secret", false)
    }

    fn headers_with(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    fn cookie_pair(set_cookie: &str) -> String {
        set_cookie.split(';').next().unwrap().to_string()
    }

    fn user() -> User {
        User::new(
            7,
            NewUser {
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                password_hash: String::new(),
                role: Role::Customer,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_roundtrip_keeps_user_and_cart() {
        let mut session = Session::from_headers(&HeaderMap::new(), &config());
        assert!(session.set_cookie().is_none());

        session.login(&user());
        session.cart_mut().add(3);
        let set_cookie = session.set_cookie().unwrap();
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));
        assert!(!set_cookie.contains("Secure"));

        let restored = Session::from_headers(
            &headers_with(&format!("other=1; {}", cookie_pair(&set_cookie))),
            &config(),
        );
        assert_eq!(restored.user_id(), Some(7));
        assert_eq!(restored.user_name(), Some("Ana"));
        assert_eq!(restored.cart().quantity(3), 1);
    }

    #[test]
    fn test_tampered_or_foreign_cookie_starts_fresh() {
        let mut session = Session::from_headers(&HeaderMap::new(), &config());
        session.login(&user());
        let pair = cookie_pair(&session.set_cookie().unwrap());

        let other_key = SessionConfig::new("another-secret", false);
        assert_eq!(
            Session::from_headers(&headers_with(&pair), &other_key).user_id(),
            None
        );

        let (payload, tag) = pair.split_once('.').unwrap();
        let forged = format!("{}x.{tag}", payload);
        assert_eq!(
            Session::from_headers(&headers_with(&forged), &config()).user_id(),
            None
        );
        assert_eq!(
            Session::from_headers(&headers_with("meu-cupcake-session=garbage"), &config())
                .user_id(),
            None
        );
    }

    #[test]
    fn test_expired_cookie_is_ignored() {
        let config = config();
        let data = SessionData {
            user_id: Some(1),
            issued_at: (Utc::now() - Duration::days(SESSION_TTL_DAYS + 1)).timestamp(),
            ..Default::default()
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&data).unwrap());
        let cookie = format!("{SESSION_COOKIE}={payload}.{}", config.sign(&payload));

        assert_eq!(
            Session::from_headers(&headers_with(&cookie), &config).user_id(),
            None
        );
    }

    #[test]
    fn test_flashes_are_consumed_once() {
        let mut session = Session::from_headers(&HeaderMap::new(), &config());
        session.success("Bem-vindo!");
        let pair = cookie_pair(&session.set_cookie().unwrap());

        let mut next = Session::from_headers(&headers_with(&pair), &config());
        let flashes = next.take_flashes();
        assert_eq!(flashes.len(), 1);
        assert_eq!(flashes[0].kind, FlashKind::Success);
        assert!(next.take_flashes().is_empty());
        assert!(next.set_cookie().is_some());
    }

    #[test]
    fn test_destroy_expires_cookie() {
        let mut session = Session::from_headers(&HeaderMap::new(), &SessionConfig::new("k", true));
        session.login(&user());
        session.destroy();
        let set_cookie = session.set_cookie().unwrap();
        assert!(set_cookie.starts_with("meu-cupcake-session=;"));
        assert!(set_cookie.contains("Max-Age=0"));
        assert!(set_cookie.contains("Secure"));
    }
}
