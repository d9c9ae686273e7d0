use super::order::OrderStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Payment status as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GatewayStatus {
    Approved,
    Authorized,
    Pending,
    InProcess,
    InMediation,
    Rejected,
    Cancelled,
    Refunded,
    ChargedBack,
    Expired,
    Other(String),
}

impl GatewayStatus {
    pub fn as_str(&self) -> &str {
        match self {
            GatewayStatus::Approved => "approved",
            GatewayStatus::Authorized => "authorized",
            GatewayStatus::Pending => "pending",
            GatewayStatus::InProcess => "in_process",
            GatewayStatus::InMediation => "in_mediation",
            GatewayStatus::Rejected => "rejected",
            GatewayStatus::Cancelled => "cancelled",
            GatewayStatus::Refunded => "refunded",
            GatewayStatus::ChargedBack => "charged_back",
            GatewayStatus::Expired => "expired",
            GatewayStatus::Other(s) => s,
        }
    }

    /// approved → pago, pending/in_process → pendente, anything else → falhou.
    pub fn order_status(&self) -> OrderStatus {
        match self {
            GatewayStatus::Approved => OrderStatus::Paid,
            GatewayStatus::Pending | GatewayStatus::InProcess => OrderStatus::Pending,
            _ => OrderStatus::Failed,
        }
    }
}

impl From<String> for GatewayStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "approved" => GatewayStatus::Approved,
            "authorized" => GatewayStatus::Authorized,
            "pending" => GatewayStatus::Pending,
            "in_process" => GatewayStatus::InProcess,
            "in_mediation" => GatewayStatus::InMediation,
            "rejected" => GatewayStatus::Rejected,
            "cancelled" => GatewayStatus::Cancelled,
            "refunded" => GatewayStatus::Refunded,
            "charged_back" => GatewayStatus::ChargedBack,
            "expired" => GatewayStatus::Expired,
            _ => GatewayStatus::Other(value),
        }
    }
}

impl From<GatewayStatus> for String {
    fn from(status: GatewayStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identification {
    #[serde(rename = "type")]
    pub kind: String,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payer {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identification: Option<Identification>,
}

/// Body of a payment creation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub transaction_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installments: Option<u32>,
    pub payment_method_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer_id: Option<String>,
    pub external_reference: String,
    pub payer: Payer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TransactionData {
    #[serde(default)]
    pub qr_code: Option<String>,
    #[serde(default)]
    pub qr_code_base64: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PointOfInteraction {
    #[serde(default)]
    pub transaction_data: Option<TransactionData>,
}

/// PIX "copia e cola" code and its QR image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PixQrCode {
    pub qr_code: String,
    pub qr_code_base64: String,
}

/// A payment as the gateway reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: i64,
    pub status: GatewayStatus,
    #[serde(default)]
    pub status_detail: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub point_of_interaction: Option<PointOfInteraction>,
}

impl GatewayPayment {
    pub fn pix_qr_code(&self) -> Option<PixQrCode> {
        let data = self
            .point_of_interaction
            .as_ref()?
            .transaction_data
            .as_ref()?;
        Some(PixQrCode {
            qr_code: data.qr_code.clone()?,
            qr_code_base64: data.qr_code_base64.clone()?,
        })
    }
}
