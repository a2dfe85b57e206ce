use crate::{config::CoraConfig, errors::ServiceError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

/// Data needed to register one boleto installment at the PSP.
#[derive(Debug, Clone)]
pub struct BoletoIssueRequest {
    /// Our own reference, also sent as the idempotency key
    pub code: String,
    pub customer_name: String,
    pub description: String,
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedBoleto {
    pub gateway_id: String,
}

/// Boleto/PIX payment service provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn issue_boleto(&self, request: &BoletoIssueRequest) -> Result<IssuedBoleto, ServiceError>;

    async fn cancel_boleto(&self, gateway_id: &str) -> Result<(), ServiceError>;
}

#[derive(Serialize)]
struct InvoicePayload<'a> {
    code: &'a str,
    customer: InvoiceCustomer<'a>,
    services: Vec<InvoiceService<'a>>,
    payment_terms: PaymentTerms,
}

#[derive(Serialize)]
struct InvoiceCustomer<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct InvoiceService<'a> {
    name: &'a str,
    /// Amount in cents
    amount: i64,
}

#[derive(Serialize)]
struct PaymentTerms {
    due_date: String,
}

#[derive(Deserialize)]
struct InvoiceCreated {
    id: String,
}

/// Cora invoices API client.
#[derive(Clone)]
pub struct CoraClient {
    client: reqwest::Client,
    base_url: Option<String>,
    api_token: Option<String>,
}

impl CoraClient {
    pub fn new(config: &CoraConfig) -> Self {
        Self {
            client: super::http_client(config.timeout()),
            base_url: config.base_url.as_deref().map(super::base_url),
            api_token: config.api_token.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    fn endpoint(&self, path: &str) -> Result<String, ServiceError> {
        self.base_url
            .as_ref()
            .map(|base| format!("{}{}", base, path))
            .ok_or_else(|| ServiceError::GatewayNotConfigured("cora".to_string()))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

fn to_cents(amount: Decimal) -> Result<i64, ServiceError> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| ServiceError::ValidationError(format!("amount {} out of range", amount)))
}

async fn rejected(response: reqwest::Response, action: &str) -> ServiceError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    error!(status = status.as_u16(), body = %body, "cora rejected {}", action);
    ServiceError::ExternalServiceError(format!("cora {} failed with status {}", action, status))
}

#[async_trait]
impl PaymentGateway for CoraClient {
    #[instrument(skip(self, request), fields(code = %request.code))]
    async fn issue_boleto(&self, request: &BoletoIssueRequest) -> Result<IssuedBoleto, ServiceError> {
        let url = self.endpoint("/v2/invoices")?;
        let payload = InvoicePayload {
            code: &request.code,
            customer: InvoiceCustomer {
                name: &request.customer_name,
            },
            services: vec![InvoiceService {
                name: &request.description,
                amount: to_cents(request.amount)?,
            }],
            payment_terms: PaymentTerms {
                due_date: request.due_date.format("%Y-%m-%d").to_string(),
            },
        };

        let response = self
            .authorize(self.client.post(&url))
            .header("Idempotency-Key", &request.code)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "cora issue request failed");
                ServiceError::ExternalServiceError(format!("cora unreachable: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(rejected(response, "issue").await);
        }

        let created: InvoiceCreated = response.json().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("cora returned an unreadable body: {}", e))
        })?;
        debug!(gateway_id = %created.id, "boleto issued");
        Ok(IssuedBoleto {
            gateway_id: created.id,
        })
    }

    #[instrument(skip(self))]
    async fn cancel_boleto(&self, gateway_id: &str) -> Result<(), ServiceError> {
        let url = self.endpoint(&format!("/v2/invoices/{}", gateway_id))?;

        let response = self
            .authorize(self.client.delete(&url))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "cora cancel request failed");
                ServiceError::ExternalServiceError(format!("cora unreachable: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(rejected(response, "cancel").await);
        }

        debug!("boleto cancelled at gateway");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> CoraClient {
        CoraClient::new(&CoraConfig {
            base_url: Some(format!("{}/", server.uri())),
            api_token: Some("token-123".into()),
            timeout_secs: 5,
        })
    }

    fn request() -> BoletoIssueRequest {
        BoletoIssueRequest {
            code: "ORDER-42-1".into(),
            customer_name: "Maria Silva".into(),
            description: "Order #42 installment 1/2".into(),
            amount: dec!(150.25),
            due_date: "2026-11-20T12:00:00Z".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn issues_invoice_with_amount_in_cents() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/invoices"))
            .and(header("authorization", "Bearer token-123"))
            .and(header("idempotency-key", "ORDER-42-1"))
            .and(body_partial_json(serde_json::json!({
                "services": [{ "amount": 15025 }],
                "payment_terms": { "due_date": "2026-11-20" }
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": "inv_1" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let issued = client_for(&server).issue_boleto(&request()).await.unwrap();
        assert_eq!(issued.gateway_id, "inv_1");
    }

    #[tokio::test]
    async fn gateway_rejection_surfaces_as_external_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v2/invoices/inv_9"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = client_for(&server).cancel_boleto("inv_9").await;
        assert_matches!(result, Err(ServiceError::ExternalServiceError(_)));
    }

    #[tokio::test]
    async fn unconfigured_client_reports_not_configured() {
        let client = CoraClient::new(&CoraConfig::default());
        assert!(!client.is_configured());
        assert_matches!(
            client.cancel_boleto("inv_1").await,
            Err(ServiceError::GatewayNotConfigured(_))
        );
    }
}
