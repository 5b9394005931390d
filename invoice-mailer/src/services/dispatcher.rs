//! Sends a message plus rendered artifact to the configured provider and
//! classifies what happened.
//!
//! One `deliver` call makes at most one HTTP request. Retrying is left to the
//! caller, driven by `DeliveryOutcome::ProviderUnavailable`.

use crate::error::InvoiceError;
use crate::models::{DeliveryAttempt, DeliveryOutcome, EmailMessage, RenderedArtifact};
use crate::services::lifecycle::{ArtifactLifecycle, Disposition};
use crate::services::metrics::record_delivery;
use crate::services::providers::{Attachment, ProviderAdapter, ProviderConfig, WirePayload};
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::io;
use std::sync::Arc;
use std::time::Instant;

pub struct DeliveryDispatcher {
    config: ProviderConfig,
    adapter: ProviderAdapter,
    client: Client,
    lifecycle: Arc<ArtifactLifecycle>,
}

impl DeliveryDispatcher {
    /// Validates the provider configuration and builds the one HTTP client
    /// used for every send.
    pub fn new(
        config: ProviderConfig,
        lifecycle: Arc<ArtifactLifecycle>,
    ) -> Result<Self, InvoiceError> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                InvoiceError::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        let adapter = ProviderAdapter::for_config(&config);

        tracing::info!(
            provider = %config.name,
            endpoint = %config.endpoint,
            encoding = ?config.encoding,
            auth = config.auth.name(),
            timeout_ms = config.timeout.as_millis() as u64,
            "Delivery dispatcher configured"
        );

        Ok(Self {
            config,
            adapter,
            client,
            lifecycle,
        })
    }

    pub fn lifecycle(&self) -> &Arc<ArtifactLifecycle> {
        &self.lifecycle
    }

    /// Send `message` with `artifact` attached.
    ///
    /// Preconditions are checked before any network I/O and fail with
    /// `InvoiceError::Validation`. Otherwise the classified attempt is
    /// returned; on `Success` the artifact has already been deleted, on any
    /// other outcome it is left in place for the caller.
    pub async fn deliver(
        &self,
        message: &EmailMessage,
        artifact: &RenderedArtifact,
    ) -> Result<DeliveryAttempt, InvoiceError> {
        message.validate().map_err(|reason| {
            tracing::error!(reason = %reason, "Email validation failed");
            InvoiceError::Validation(reason)
        })?;

        let lease = self.lifecycle.lease(artifact)?;

        let bytes = read_artifact(artifact).await?;
        let attachment = Attachment {
            filename: artifact.filename().to_string(),
            content_type: artifact.content_type().to_string(),
            bytes,
        };

        let payload = self.adapter.build_payload(message, attachment)?;
        let headers = self.adapter.auth_headers()?;

        tracing::info!(
            provider = %self.config.name,
            to = %message.to,
            artifact_id = %artifact.id(),
            "Sending email request to provider"
        );
        tracing::debug!(payload = %payload.redacted(), "Provider payload");

        let request = self.client.post(&self.config.endpoint).headers(headers);
        let request = match payload {
            WirePayload::Multipart(form) => request.multipart(form.into_form()?),
            WirePayload::Json(json) => request
                .header(CONTENT_TYPE, "application/json")
                .body(json.to_bytes()?),
        };

        let attempted_at = Utc::now();
        let started = Instant::now();

        let (outcome, status, response_body, error) = match request.send().await {
            Ok(response) => {
                let status = response.status();
                let body = match response.text().await {
                    Ok(body) => body,
                    Err(e) => {
                        tracing::warn!(
                            provider = %self.config.name,
                            status = status.as_u16(),
                            error = %e,
                            "Failed to read provider response body"
                        );
                        String::new()
                    }
                };
                (
                    self.adapter.classify(status),
                    Some(status.as_u16()),
                    self.config.redact(&body),
                    None,
                )
            }
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("request timed out after {} ms", self.config.timeout.as_millis())
                } else if e.is_connect() {
                    format!("connection failed: {}", e)
                } else {
                    format!("transport error: {}", e)
                };
                (
                    DeliveryOutcome::ProviderUnavailable,
                    e.status().map(|s| s.as_u16()),
                    String::new(),
                    Some(self.config.redact(&reason)),
                )
            }
        };

        let elapsed = started.elapsed();
        record_delivery(&self.config.name, outcome, elapsed);
        lease.settle(outcome);

        let attempt = DeliveryAttempt {
            provider: self.config.name.clone(),
            artifact_id: artifact.id(),
            attempted_at,
            outcome,
            status,
            response_body,
            error,
        };

        match outcome {
            DeliveryOutcome::Success => {
                tracing::info!(
                    provider = %attempt.provider,
                    to = %message.to,
                    status = ?attempt.status,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Email sent successfully"
                );
                if let Err(e) = self
                    .lifecycle
                    .release(artifact.id(), Disposition::Delivered)
                    .await
                {
                    tracing::warn!(artifact_id = %artifact.id(), error = %e, "Artifact release failed");
                }
            }
            DeliveryOutcome::RejectedByProvider => {
                tracing::error!(
                    provider = %attempt.provider,
                    status = ?attempt.status,
                    response = %attempt.response_body,
                    "Provider rejected the request"
                );
            }
            DeliveryOutcome::ProviderUnavailable => {
                tracing::warn!(
                    provider = %attempt.provider,
                    status = ?attempt.status,
                    error = ?attempt.error,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Provider unavailable, artifact preserved for retry"
                );
            }
        }

        Ok(attempt)
    }
}

/// Read the artifact from storage, refusing a missing or empty file.
async fn read_artifact(artifact: &RenderedArtifact) -> Result<Vec<u8>, InvoiceError> {
    let bytes = match tokio::fs::read(artifact.path()).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(InvoiceError::Validation(format!(
                "PDF file not found at: {}",
                artifact.path().display()
            )));
        }
        Err(e) => {
            return Err(InvoiceError::Validation(format!(
                "Failed to read PDF file {}: {}",
                artifact.path().display(),
                e
            )));
        }
    };

    if bytes.is_empty() {
        tracing::error!(path = ?artifact.path(), "Attachment is empty (0 bytes)");
        return Err(InvoiceError::Validation(format!(
            "PDF file is empty: {}",
            artifact.path().display()
        )));
    }

    Ok(bytes)
}

