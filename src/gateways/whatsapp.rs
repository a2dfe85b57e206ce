//! WhatsApp delivery through a self-hosted gateway with a paid SaaS fallback.
//!
//! The self-hosted instance is preferred when it is configured and its
//! connection probe reports `open`. Anything else (unconfigured, probe
//! timeout, closed session, failed send) moves the message to the SaaS
//! provider, which is tried exactly once.

use crate::{config::WhatsAppConfig, errors::ServiceError};
use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

/// Reduces a phone number to digits and prefixes the country code.
///
/// National numbers (10 or 11 digits) always receive the prefix, as does any
/// number that does not already start with it.
pub fn normalize_phone(raw: &str, country_code: &str) -> Result<String, ServiceError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "phone number '{}' contains no digits",
            raw
        )));
    }

    if matches!(digits.len(), 10 | 11) || !digits.starts_with(country_code) {
        Ok(format!("{}{}", country_code, digits))
    } else {
        Ok(digits)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WhatsAppProvider {
    SelfHosted,
    Saas,
}

/// One WhatsApp provider.
#[async_trait]
pub trait WhatsAppGateway: Send + Sync {
    fn provider(&self) -> WhatsAppProvider;

    /// Whether the provider can take a message right now.
    async fn is_reachable(&self) -> bool;

    async fn send_text(&self, phone: &str, message: &str) -> Result<(), ServiceError>;
}

async fn ensure_success(
    response: reqwest::Response,
    provider: WhatsAppProvider,
) -> Result<(), ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    warn!(%provider, status = status.as_u16(), body = %body, "whatsapp send rejected");
    Err(ServiceError::ExternalServiceError(format!(
        "{} gateway returned {}",
        provider, status
    )))
}

/// Self-hosted gateway exposing the `instance/connectionState` and
/// `message/sendText` endpoints.
#[derive(Clone)]
pub struct SelfHostedGateway {
    client: reqwest::Client,
    base_url: String,
    instance: String,
    api_key: Option<String>,
    probe_timeout: Duration,
    send_timeout: Duration,
}

impl SelfHostedGateway {
    pub fn new(
        base_url: &str,
        instance: &str,
        api_key: Option<String>,
        probe_timeout: Duration,
        send_timeout: Duration,
    ) -> Self {
        Self {
            client: super::http_client(send_timeout.max(probe_timeout)),
            base_url: super::base_url(base_url),
            instance: instance.to_string(),
            api_key,
            probe_timeout,
            send_timeout,
        }
    }

    fn with_key(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("apikey", key),
            None => builder,
        }
    }
}

fn connection_state(body: &Value) -> Option<&str> {
    body.pointer("/instance/state")
        .or_else(|| body.get("state"))
        .and_then(Value::as_str)
}

#[async_trait]
impl WhatsAppGateway for SelfHostedGateway {
    fn provider(&self) -> WhatsAppProvider {
        WhatsAppProvider::SelfHosted
    }

    async fn is_reachable(&self) -> bool {
        let url = format!(
            "{}/instance/connectionState/{}",
            self.base_url, self.instance
        );
        let response = match self
            .with_key(self.client.get(&url))
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(status = response.status().as_u16(), "self-hosted whatsapp probe rejected");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "self-hosted whatsapp probe failed");
                return false;
            }
        };

        match response.json::<Value>().await {
            Ok(body) => connection_state(&body) == Some("open"),
            Err(_) => false,
        }
    }

    async fn send_text(&self, phone: &str, message: &str) -> Result<(), ServiceError> {
        let url = format!("{}/message/sendText/{}", self.base_url, self.instance);
        let response = self
            .with_key(self.client.post(&url))
            .timeout(self.send_timeout)
            .json(&json!({ "number": phone, "text": message }))
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("self-hosted gateway: {}", e)))?;
        ensure_success(response, self.provider()).await
    }
}

/// Paid SaaS gateway addressed by instance id and token.
#[derive(Clone)]
pub struct SaasGateway {
    client: reqwest::Client,
    base_url: String,
    instance_id: String,
    token: String,
    client_token: Option<String>,
}

impl SaasGateway {
    pub fn new(
        base_url: &str,
        instance_id: &str,
        token: &str,
        client_token: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: super::http_client(timeout),
            base_url: super::base_url(base_url),
            instance_id: instance_id.to_string(),
            token: token.to_string(),
            client_token,
        }
    }
}

#[async_trait]
impl WhatsAppGateway for SaasGateway {
    fn provider(&self) -> WhatsAppProvider {
        WhatsAppProvider::Saas
    }

    async fn is_reachable(&self) -> bool {
        true
    }

    async fn send_text(&self, phone: &str, message: &str) -> Result<(), ServiceError> {
        let url = format!(
            "{}/instances/{}/token/{}/send-text",
            self.base_url, self.instance_id, self.token
        );
        let mut request = self
            .client
            .post(&url)
            .json(&json!({ "phone": phone, "message": message }));
        if let Some(client_token) = &self.client_token {
            request = request.header("Client-Token", client_token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("saas gateway: {}", e)))?;
        ensure_success(response, self.provider()).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct WhatsAppDelivery {
    pub provider: WhatsAppProvider,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProviderStatus {
    pub configured: bool,
    /// `None` when the provider is not configured
    pub reachable: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WhatsAppStatus {
    pub self_hosted: ProviderStatus,
    pub saas: ProviderStatus,
}

/// Sends WhatsApp text messages, preferring the self-hosted gateway.
#[derive(Clone)]
pub struct WhatsAppService {
    primary: Option<Arc<dyn WhatsAppGateway>>,
    fallback: Option<Arc<dyn WhatsAppGateway>>,
    country_code: String,
}

impl WhatsAppService {
    pub fn new(
        primary: Option<Arc<dyn WhatsAppGateway>>,
        fallback: Option<Arc<dyn WhatsAppGateway>>,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            primary,
            fallback,
            country_code: country_code.into(),
        }
    }

    /// Builds both providers from configuration; a provider missing any
    /// required setting is left out.
    pub fn from_config(config: &WhatsAppConfig) -> Self {
        let probe_timeout = Duration::from_secs(config.probe_timeout_secs);
        let send_timeout = Duration::from_secs(config.send_timeout_secs);

        let primary = config.self_hosted_url.as_deref().map(|url| {
            Arc::new(SelfHostedGateway::new(
                url,
                &config.self_hosted_instance,
                config.self_hosted_api_key.clone(),
                probe_timeout,
                send_timeout,
            )) as Arc<dyn WhatsAppGateway>
        });

        let fallback = match (
            config.saas_url.as_deref(),
            config.saas_instance_id.as_deref(),
            config.saas_token.as_deref(),
        ) {
            (Some(url), Some(instance_id), Some(token)) => Some(Arc::new(SaasGateway::new(
                url,
                instance_id,
                token,
                config.saas_client_token.clone(),
                send_timeout,
            )) as Arc<dyn WhatsAppGateway>),
            _ => None,
        };

        Self::new(primary, fallback, config.country_code.clone())
    }

    pub fn is_configured(&self) -> bool {
        self.primary.is_some() || self.fallback.is_some()
    }

    #[instrument(skip(self, message))]
    pub async fn send_text(&self, phone: &str, message: &str) -> Result<WhatsAppDelivery, ServiceError> {
        let phone = normalize_phone(phone, &self.country_code)?;

        if let Some(primary) = &self.primary {
            if primary.is_reachable().await {
                match primary.send_text(&phone, message).await {
                    Ok(()) => {
                        counter!("whatsapp.sent", 1, "provider" => "self_hosted");
                        return Ok(WhatsAppDelivery {
                            provider: primary.provider(),
                            phone,
                        });
                    }
                    Err(e) => warn!(error = %e, "self-hosted send failed, falling back"),
                }
            } else {
                info!("self-hosted gateway unreachable, falling back");
            }
        }

        let fallback = self.fallback.as_ref().ok_or_else(|| {
            if self.primary.is_some() {
                ServiceError::ExternalServiceError(
                    "self-hosted gateway failed and no fallback is configured".to_string(),
                )
            } else {
                ServiceError::GatewayNotConfigured("whatsapp".to_string())
            }
        })?;

        if self.primary.is_some() {
            counter!("whatsapp.fallbacks", 1);
        }

        fallback.send_text(&phone, message).await?;
        counter!("whatsapp.sent", 1, "provider" => "saas");
        Ok(WhatsAppDelivery {
            provider: fallback.provider(),
            phone,
        })
    }

    pub async fn status(&self) -> WhatsAppStatus {
        let self_hosted = match &self.primary {
            Some(gateway) => ProviderStatus {
                configured: true,
                reachable: Some(gateway.is_reachable().await),
            },
            None => ProviderStatus {
                configured: false,
                reachable: None,
            },
        };
        let saas = match &self.fallback {
            Some(gateway) => ProviderStatus {
                configured: true,
                reachable: Some(gateway.is_reachable().await),
            },
            None => ProviderStatus {
                configured: false,
                reachable: None,
            },
        };
        WhatsAppStatus { self_hosted, saas }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn national_numbers_receive_the_country_code() {
        assert_eq!(normalize_phone("(11) 98765-4321", "55").unwrap(), "5511987654321");
        assert_eq!(normalize_phone("11 3333-4444", "55").unwrap(), "551133334444");
    }

    #[test]
    fn international_numbers_are_kept() {
        assert_eq!(normalize_phone("+55 11 98765-4321", "55").unwrap(), "5511987654321");
    }

    #[test]
    fn ten_digit_number_starting_with_code_is_still_national() {
        assert_eq!(normalize_phone("55 9876-5432", "55").unwrap(), "555598765432");
    }

    #[test]
    fn empty_phone_is_rejected() {
        assert_matches!(
            normalize_phone("() -", "55"),
            Err(ServiceError::ValidationError(_))
        );
    }

    proptest! {
        #[test]
        fn normalisation_is_idempotent(digits in "[1-9][0-9]{9,10}", sep in "[ ()-]{0,2}") {
            let raw = format!("{}{}{}", &digits[..2], sep, &digits[2..]);
            let once = normalize_phone(&raw, "55").unwrap();
            let twice = normalize_phone(&once, "55").unwrap();
            prop_assert_eq!(&once, &twice);
            prop_assert!(once.starts_with("55"));
            prop_assert!(once.chars().all(|c| c.is_ascii_digit()));
        }
    }

    fn self_hosted(server: &MockServer) -> Arc<dyn WhatsAppGateway> {
        Arc::new(SelfHostedGateway::new(
            &server.uri(),
            "main",
            Some("key".into()),
            Duration::from_millis(300),
            Duration::from_secs(2),
        ))
    }

    fn saas(server: &MockServer) -> Arc<dyn WhatsAppGateway> {
        Arc::new(SaasGateway::new(
            &server.uri(),
            "inst",
            "tok",
            Some("client".into()),
            Duration::from_secs(2),
        ))
    }

    async fn mount_state(server: &MockServer, state: &str) {
        Mock::given(method("GET"))
            .and(path("/instance/connectionState/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "instance": { "instanceName": "main", "state": state } }),
            ))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn open_self_hosted_instance_delivers_without_fallback() {
        let primary = MockServer::start().await;
        let secondary = MockServer::start().await;
        mount_state(&primary, "open").await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/main"))
            .and(header("apikey", "key"))
            .and(body_partial_json(serde_json::json!({ "number": "5511987654321" })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&secondary)
            .await;

        let service = WhatsAppService::new(Some(self_hosted(&primary)), Some(saas(&secondary)), "55");
        let delivery = service.send_text("11 98765-4321", "hello").await.unwrap();
        assert_eq!(delivery.provider, WhatsAppProvider::SelfHosted);
    }

    #[tokio::test]
    async fn closed_instance_falls_back_exactly_once() {
        let primary = MockServer::start().await;
        let secondary = MockServer::start().await;
        mount_state(&primary, "close").await;
        Mock::given(method("POST"))
            .and(path("/instances/inst/token/tok/send-text"))
            .and(header("client-token", "client"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&secondary)
            .await;

        let service = WhatsAppService::new(Some(self_hosted(&primary)), Some(saas(&secondary)), "55");
        let delivery = service.send_text("11 98765-4321", "hello").await.unwrap();
        assert_eq!(delivery.provider, WhatsAppProvider::Saas);
    }

    #[tokio::test]
    async fn failed_self_hosted_send_falls_back() {
        let primary = MockServer::start().await;
        let secondary = MockServer::start().await;
        mount_state(&primary, "open").await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/main"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&secondary)
            .await;

        let service = WhatsAppService::new(Some(self_hosted(&primary)), Some(saas(&secondary)), "55");
        let delivery = service.send_text("5511987654321", "hello").await.unwrap();
        assert_eq!(delivery.provider, WhatsAppProvider::Saas);
    }

    #[tokio::test]
    async fn both_failing_is_an_external_error() {
        let primary = MockServer::start().await;
        let secondary = MockServer::start().await;
        mount_state(&primary, "close").await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&secondary)
            .await;

        let service = WhatsAppService::new(Some(self_hosted(&primary)), Some(saas(&secondary)), "55");
        assert_matches!(
            service.send_text("11987654321", "hello").await,
            Err(ServiceError::ExternalServiceError(_))
        );
    }

    #[tokio::test]
    async fn slow_probe_counts_as_unreachable() {
        let primary = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/instance/connectionState/main"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "state": "open" }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&primary)
            .await;

        assert!(!self_hosted(&primary).is_reachable().await);
    }

    #[tokio::test]
    async fn nothing_configured_is_reported() {
        let service = WhatsAppService::new(None, None, "55");
        assert!(!service.is_configured());
        assert_matches!(
            service.send_text("11987654321", "hello").await,
            Err(ServiceError::GatewayNotConfigured(_))
        );
        let status = service.status().await;
        assert!(!status.self_hosted.configured);
        assert!(status.saas.reachable.is_none());
    }
}
