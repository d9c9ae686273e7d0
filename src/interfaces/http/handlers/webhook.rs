//! Mercado Pago payment notifications.
//!
//! A notification only says which payment changed. The payment is always
//! re-read from the gateway before the order is touched.

use crate::application::orders::Reconciliation;
use crate::interfaces::http::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEADER: &str = "x-signature";
const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Deserialize)]
struct Notification {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    data: Option<NotificationData>,
}

#[derive(Debug, Deserialize)]
struct NotificationData {
    id: Value,
}

impl NotificationData {
    /// The id arrives as a string or a number depending on the topic.
    fn id(&self) -> Option<String> {
        match &self.id {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// Splits `ts=…,v1=…` into its timestamp and hex digest.
fn parse_signature(header: &str) -> Option<(&str, &str)> {
    let mut ts = None;
    let mut v1 = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("ts", value)) => ts = Some(value.trim()),
            Some(("v1", value)) => v1 = Some(value.trim()),
            _ => {}
        }
    }
    Some((ts?, v1?))
}

/// Checks `x-signature` against the notification manifest
/// `id:<data.id>;request-id:<x-request-id>;ts:<ts>;`.
pub fn verify_signature(secret: &str, headers: &HeaderMap, data_id: &str) -> bool {
    let Some((ts, digest)) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_signature)
    else {
        return false;
    };
    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let Ok(expected) = hex::decode(digest) else {
        return false;
    };

    let manifest = format!("id:{data_id};request-id:{request_id};ts:{ts};");
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(manifest.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

fn acknowledged(detail: &str) -> Response {
    (StatusCode::OK, Json(json!({ "received": true, "detail": detail }))).into_response()
}

pub async fn mercadopago(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let notification: Notification = match serde_json::from_slice(&body) {
        Ok(notification) => notification,
        Err(e) => {
            warn!(error = %e, "unreadable webhook body");
            return (StatusCode::BAD_REQUEST, "invalid payload").into_response();
        }
    };
    let data_id = notification
        .data
        .as_ref()
        .and_then(NotificationData::id)
        .unwrap_or_default();

    if let Some(secret) = &state.webhook_secret
        && !verify_signature(secret, &headers, &data_id)
    {
        warn!(data_id, "webhook signature mismatch");
        return (StatusCode::UNAUTHORIZED, "invalid signature").into_response();
    }

    if notification.kind != "payment" {
        debug!(kind = %notification.kind, "ignoring webhook topic");
        return acknowledged("ignored");
    }
    let Ok(payment_id) = data_id.parse::<i64>() else {
        warn!(data_id, "payment notification without a numeric id");
        return (StatusCode::BAD_REQUEST, "invalid payment id").into_response();
    };

    match state.shop.reconcile_payment(payment_id).await {
        Ok(Reconciliation::Updated(order)) => {
            info!(payment_id, order_id = order.id, status = %order.status, "webhook settled order");
            acknowledged("updated")
        }
        Ok(Reconciliation::Unchanged(_)) => acknowledged("unchanged"),
        Ok(Reconciliation::UnknownPayment) => acknowledged("unknown payment"),
        Err(e) => e.into_response(),
    }
}
