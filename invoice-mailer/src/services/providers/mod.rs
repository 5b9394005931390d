pub mod json;
pub mod multipart;

use crate::models::{DeliveryOutcome, EmailMessage};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use thiserror::Error;

pub use json::{JsonAdapter, JsonPayload};
pub use multipart::{FormPayload, MultipartAdapter};

pub const API_KEY_HEADER: &str = "X-API-Key";
pub const REDACTED: &str = "[REDACTED]";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Payload error: {0}")]
    Payload(String),
}

/// Wire shape expected by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    Multipart,
    Json,
}

impl std::str::FromStr for PayloadEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "multipart" | "multipart-form" | "form" => Ok(PayloadEncoding::Multipart),
            "json" => Ok(PayloadEncoding::Json),
            _ => Err(format!("Invalid payload encoding: {}", s)),
        }
    }
}

/// Credentials for a generic SMTP-relay-over-HTTP bridge. Sent as form fields.
#[derive(Debug, Clone)]
pub struct SmtpRelayCredentials {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
}

#[derive(Debug, Clone)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    Bearer(SecretString),
    /// `X-API-Key: <key>`
    ApiKey(SecretString),
    /// Credentials travel inside the multipart body.
    SmtpRelay(SmtpRelayCredentials),
}

impl AuthScheme {
    pub fn secret(&self) -> &SecretString {
        match self {
            AuthScheme::Bearer(key) | AuthScheme::ApiKey(key) => key,
            AuthScheme::SmtpRelay(creds) => &creds.password,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AuthScheme::Bearer(_) => "bearer",
            AuthScheme::ApiKey(_) => "api-key",
            AuthScheme::SmtpRelay(_) => "smtp-relay",
        }
    }

    /// Header-borne credentials. SMTP-relay credentials produce no headers.
    pub fn headers(&self) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        match self {
            AuthScheme::Bearer(key) => {
                headers.insert(
                    AUTHORIZATION,
                    sensitive_value(&format!("Bearer {}", key.expose_secret()))?,
                );
            }
            AuthScheme::ApiKey(key) => {
                headers.insert(
                    HeaderName::from_static("x-api-key"),
                    sensitive_value(key.expose_secret())?,
                );
            }
            AuthScheme::SmtpRelay(_) => {}
        }
        Ok(headers)
    }
}

fn sensitive_value(raw: &str) -> Result<HeaderValue, ProviderError> {
    let mut value = HeaderValue::from_str(raw).map_err(|_| {
        ProviderError::Configuration("credential is not a valid header value".to_string())
    })?;
    value.set_sensitive(true);
    Ok(value)
}

/// Everything needed to reach one provider. Built once and shared.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Label used in logs, metrics and delivery attempts.
    pub name: String,
    pub endpoint: String,
    pub auth: AuthScheme,
    pub encoding: PayloadEncoding,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.endpoint.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "provider endpoint is required".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ProviderError::Configuration(
                "provider timeout must be greater than zero".to_string(),
            ));
        }
        if self.encoding == PayloadEncoding::Json && matches!(self.auth, AuthScheme::SmtpRelay(_)) {
            return Err(ProviderError::Configuration(
                "JSON providers authenticate with a header; SMTP-relay credentials need multipart"
                    .to_string(),
            ));
        }
        if self.auth.secret().expose_secret().is_empty() {
            tracing::warn!(provider = %self.name, auth = self.auth.name(), "Provider credential is empty");
        }
        Ok(())
    }

    /// Replace every occurrence of the configured secret in `text`.
    pub fn redact(&self, text: &str) -> String {
        let secret = self.auth.secret().expose_secret();
        if secret.is_empty() {
            text.to_string()
        } else {
            text.replace(secret.as_str(), REDACTED)
        }
    }
}

/// The attachment as it goes on the wire.
#[derive(Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Provider-specific request body.
#[derive(Debug)]
pub enum WirePayload {
    Multipart(FormPayload),
    Json(JsonPayload),
}

impl WirePayload {
    /// Diagnostic form: secrets replaced, attachment bytes summarised.
    pub fn redacted(&self) -> String {
        match self {
            WirePayload::Multipart(form) => form.redacted(),
            WirePayload::Json(json) => json.redacted(),
        }
    }
}

/// One variant per wire shape; dispatch logic is shared.
#[derive(Debug, Clone)]
pub enum ProviderAdapter {
    Multipart(MultipartAdapter),
    Json(JsonAdapter),
}

impl ProviderAdapter {
    pub fn for_config(config: &ProviderConfig) -> Self {
        match config.encoding {
            PayloadEncoding::Multipart => {
                ProviderAdapter::Multipart(MultipartAdapter::new(config.auth.clone()))
            }
            PayloadEncoding::Json => ProviderAdapter::Json(JsonAdapter::new(config.auth.clone())),
        }
    }

    pub fn build_payload(
        &self,
        message: &EmailMessage,
        attachment: Attachment,
    ) -> Result<WirePayload, ProviderError> {
        match self {
            ProviderAdapter::Multipart(adapter) => {
                Ok(WirePayload::Multipart(adapter.build_payload(message, attachment)))
            }
            ProviderAdapter::Json(adapter) => {
                Ok(WirePayload::Json(adapter.build_payload(message, attachment)?))
            }
        }
    }

    pub fn auth_headers(&self) -> Result<HeaderMap, ProviderError> {
        match self {
            ProviderAdapter::Multipart(adapter) => adapter.auth().headers(),
            ProviderAdapter::Json(adapter) => adapter.auth().headers(),
        }
    }

    pub fn classify(&self, status: reqwest::StatusCode) -> DeliveryOutcome {
        classify_status(status)
    }
}

/// 2xx is success, 4xx is a caller-side rejection, anything else is
/// treated as the provider being unavailable.
pub fn classify_status(status: reqwest::StatusCode) -> DeliveryOutcome {
    if status.is_success() {
        DeliveryOutcome::Success
    } else if status.is_client_error() {
        DeliveryOutcome::RejectedByProvider
    } else {
        DeliveryOutcome::ProviderUnavailable
    }
}
