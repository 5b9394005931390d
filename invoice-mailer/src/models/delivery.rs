use crate::error::InvoiceError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Classified result of one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Success,
    RejectedByProvider,
    ProviderUnavailable,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Success => "success",
            DeliveryOutcome::RejectedByProvider => "rejected_by_provider",
            DeliveryOutcome::ProviderUnavailable => "provider_unavailable",
        }
    }

    /// Whether repeating the same request could change the result.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeliveryOutcome::ProviderUnavailable)
    }
}

/// Record of a single send call. Never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryAttempt {
    pub provider: String,
    pub artifact_id: Uuid,
    pub attempted_at: DateTime<Utc>,
    pub outcome: DeliveryOutcome,
    /// Absent when no HTTP response was received.
    pub status: Option<u16>,
    /// Response body with configured secrets scrubbed.
    pub response_body: String,
    /// Transport failure description, if the exchange never completed.
    pub error: Option<String>,
}

impl DeliveryAttempt {
    pub fn is_success(&self) -> bool {
        self.outcome == DeliveryOutcome::Success
    }

    /// Turns a non-successful attempt into the matching typed error.
    pub fn into_result(self) -> Result<DeliveryAttempt, InvoiceError> {
        match self.outcome {
            DeliveryOutcome::Success => Ok(self),
            DeliveryOutcome::RejectedByProvider => Err(InvoiceError::RejectedByProvider {
                provider: self.provider,
                status: self.status.unwrap_or_default(),
                body: self.response_body,
            }),
            DeliveryOutcome::ProviderUnavailable => Err(InvoiceError::ProviderUnavailable {
                provider: self.provider,
                status: self.status,
                reason: self
                    .error
                    .unwrap_or_else(|| format!("provider responded: {}", self.response_body)),
            }),
        }
    }
}
