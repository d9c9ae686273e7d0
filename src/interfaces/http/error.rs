use crate::error::ShopError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

impl ShopError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ShopError::ValidationError(_)
            | ShopError::CartEmpty
            | ShopError::UnavailableItems
            | ShopError::TotalMismatch { .. } => StatusCode::BAD_REQUEST,
            ShopError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ShopError::NotFound(_) => StatusCode::NOT_FOUND,
            ShopError::Conflict(_) => StatusCode::CONFLICT,
            ShopError::GatewayError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to a customer.
    pub fn public_message(&self) -> String {
        match self {
            ShopError::ValidationError(message) | ShopError::GatewayError(message) => {
                message.clone()
            }
            ShopError::NotFound("Product") => "Cupcake não encontrado ou indisponível.".to_string(),
            ShopError::NotFound("Order") => "Pedido não encontrado.".to_string(),
            ShopError::NotFound(_) => "Página não encontrada.".to_string(),
            ShopError::Conflict(_) => "Conflito com um registro existente.".to_string(),
            ShopError::InvalidCredentials => "E-mail ou senha inválidos.".to_string(),
            ShopError::CartEmpty => "Carrinho vazio ou inválido.".to_string(),
            ShopError::UnavailableItems => {
                "Um ou mais itens no seu carrinho não estão mais disponíveis.".to_string()
            }
            ShopError::TotalMismatch { .. } => "O valor total do pedido foi modificado.".to_string(),
            _ => "Ocorreu um erro interno. Tente novamente.".to_string(),
        }
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = json!({ "success": false, "error": self.public_message() });
        (status, Json(body)).into_response()
    }
}
