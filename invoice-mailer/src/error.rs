use crate::services::lifecycle::LifecycleError;
use crate::services::providers::ProviderError;
use crate::services::renderer::RenderError;
use service_core::error::AppError;
use service_core::retry::Retryable;
use thiserror::Error;

/// Failures surfaced to callers of the invoice pipeline.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// Missing or blank message field, invalid invoice input, or an absent or
    /// empty artifact. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// HTTP 4xx. The request as constructed will never succeed.
    #[error("Rejected by provider {provider} (HTTP {status}): {body}")]
    RejectedByProvider {
        provider: String,
        status: u16,
        body: String,
    },

    /// HTTP 5xx, timeout or transport failure. Safe to retry.
    #[error("Provider {provider} unavailable: {reason}")]
    ProviderUnavailable {
        provider: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("Artifact lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl InvoiceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, InvoiceError::ProviderUnavailable { .. })
    }

    /// Pipeline stage the failure belongs to, for logs and metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            InvoiceError::Validation(_) => "validation",
            InvoiceError::Render(_) => "render",
            InvoiceError::RejectedByProvider { .. } | InvoiceError::ProviderUnavailable { .. } => {
                "delivery"
            }
            InvoiceError::Lifecycle(_) => "artifact",
            InvoiceError::Configuration(_) => "configuration",
        }
    }
}

impl Retryable for InvoiceError {
    fn is_retryable(&self) -> bool {
        InvoiceError::is_retryable(self)
    }
}

impl From<ProviderError> for InvoiceError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Configuration(msg) => InvoiceError::Configuration(msg),
            ProviderError::Payload(msg) => InvoiceError::Validation(msg),
        }
    }
}

impl From<AppError> for InvoiceError {
    fn from(err: AppError) -> Self {
        InvoiceError::Configuration(err.to_string())
    }
}
