use crate::domain::payment::{GatewayPayment, PaymentRequest};
use crate::domain::ports::PaymentGateway;
use crate::error::{Result, ShopError};
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "https://api.mercadopago.com";

const IDEMPOTENCY_HEADER: &str = "X-Idempotency-Key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Mercado Pago payments API client.
#[derive(Clone)]
pub struct MercadoPagoGateway {
    base_url: String,
    access_token: String,
    client: Client,
}

impl MercadoPagoGateway {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_payment(response: Response) -> Result<GatewayPayment> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "Mercado Pago request failed");
            return Err(ShopError::GatewayError(format!(
                "Mercado Pago returned {status}"
            )));
        }
        Ok(response.json::<GatewayPayment>().await?)
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoGateway {
    async fn create_payment(
        &self,
        request: &PaymentRequest,
        idempotency_key: &str,
    ) -> Result<GatewayPayment> {
        debug!(
            reference = %request.external_reference,
            method = %request.payment_method_id,
            "creating payment"
        );
        let response = self
            .client
            .post(self.url("/v1/payments"))
            .bearer_auth(&self.access_token)
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .json(request)
            .send()
            .await?;
        Self::read_payment(response).await
    }

    async fn get_payment(&self, payment_id: i64) -> Result<GatewayPayment> {
        let response = self
            .client
            .get(self.url(&format!("/v1/payments/{payment_id}")))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        Self::read_payment(response).await
    }
}
