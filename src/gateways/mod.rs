//! Outbound HTTP clients for third-party services.

pub mod cora;
pub mod whatsapp;

use std::time::Duration;

pub use cora::{BoletoIssueRequest, CoraClient, IssuedBoleto, PaymentGateway};
pub use whatsapp::{
    normalize_phone, SaasGateway, SelfHostedGateway, WhatsAppDelivery, WhatsAppGateway,
    WhatsAppProvider, WhatsAppService, WhatsAppStatus,
};

/// Builds a pooled client with an overall timeout.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5).min(timeout))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Trims a trailing slash so paths can be appended with `format!`.
pub(crate) fn base_url(raw: &str) -> String {
    raw.trim_end_matches('/').to_string()
}
