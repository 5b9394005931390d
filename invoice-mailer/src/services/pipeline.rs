//! End-to-end flow for one invoice: price, render, compose, deliver.

use crate::error::InvoiceError;
use crate::models::{
    merge_addresses, DeliveryAttempt, EmailMessage, InvoiceDocument, PricedInvoice,
    RenderedArtifact,
};
use crate::services::calculator::compute_totals;
use crate::services::dispatcher::DeliveryDispatcher;
use crate::services::renderer::{display_date, money, DocumentRenderer, RenderError};
use askama::Template;
use chrono::{DateTime, Local};
use service_core::retry::{retry_with_backoff, RetryConfig};

/// Configured sender identity and standing cc/bcc lists.
#[derive(Debug, Clone, Default)]
pub struct MessageDefaults {
    pub from: String,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub sender_name: String,
}

/// Per-call recipients. cc/bcc are merged with the configured defaults.
#[derive(Debug, Clone, Default)]
pub struct Recipients {
    pub to: String,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
}

impl Recipients {
    pub fn to(address: impl Into<String>) -> Self {
        Self {
            to: address.into(),
            ..Default::default()
        }
    }
}

#[derive(Template)]
#[template(path = "invoice_email.html")]
struct InvoiceEmailHtml<'a> {
    name: &'a str,
    status: &'a str,
    date: &'a str,
    amount: &'a str,
    sender_name: &'a str,
}

#[derive(Template)]
#[template(path = "invoice_email.txt")]
struct InvoiceEmailText<'a> {
    name: &'a str,
    status: &'a str,
    date: &'a str,
    amount: &'a str,
    sender_name: &'a str,
}

pub struct InvoicePipeline {
    renderer: DocumentRenderer,
    dispatcher: DeliveryDispatcher,
    defaults: MessageDefaults,
    template_id: String,
    retry: RetryConfig,
}

impl InvoicePipeline {
    pub fn new(
        renderer: DocumentRenderer,
        dispatcher: DeliveryDispatcher,
        defaults: MessageDefaults,
        template_id: impl Into<String>,
    ) -> Self {
        Self {
            renderer,
            dispatcher,
            defaults,
            template_id: template_id.into(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Subject `Invoice - <status>`, HTML and plain-text bodies, configured
    /// sender, merged cc/bcc.
    pub fn compose_message(
        &self,
        priced: &PricedInvoice,
        recipients: &Recipients,
        issued_at: DateTime<Local>,
    ) -> Result<EmailMessage, InvoiceError> {
        let doc = priced.document();
        let status = doc.invoice_status.trim();
        let date = display_date(issued_at);
        let amount = money(priced.grand_total());

        let subject = if status.is_empty() {
            "Invoice".to_string()
        } else {
            format!("Invoice - {}", status)
        };

        let html = InvoiceEmailHtml {
            name: &doc.customer_name,
            status,
            date: &date,
            amount: &amount,
            sender_name: &self.defaults.sender_name,
        }
        .render()
        .map_err(|e| RenderError::Template(e.to_string()))?;

        let text = InvoiceEmailText {
            name: &doc.customer_name,
            status,
            date: &date,
            amount: &amount,
            sender_name: &self.defaults.sender_name,
        }
        .render()
        .map_err(|e| RenderError::Template(e.to_string()))?;

        Ok(EmailMessage {
            to: recipients.to.trim().to_string(),
            from: self.defaults.from.clone(),
            cc: merge_addresses(&self.defaults.cc, &recipients.cc),
            bcc: merge_addresses(&self.defaults.bcc, &recipients.bcc),
            subject,
            html_body: Some(html),
            text_body: Some(text),
        })
    }

    /// Repeat single-attempt deliveries while the provider is unavailable.
    /// Rejections and validation failures end the loop immediately.
    pub async fn deliver_with_retry(
        &self,
        message: &EmailMessage,
        artifact: &RenderedArtifact,
    ) -> Result<DeliveryAttempt, InvoiceError> {
        retry_with_backoff(&self.retry, "deliver_invoice", || async move {
            self.dispatcher.deliver(message, artifact).await?.into_result()
        })
        .await
    }

    /// Full run for one invoice.
    ///
    /// A rejected message is discarded along with its artifact, since the
    /// same request will never succeed. When the provider stays unavailable
    /// the artifact is kept on disk, its path logged, and it is no longer
    /// tracked.
    pub async fn send_invoice(
        &self,
        invoice: &InvoiceDocument,
        recipients: &Recipients,
    ) -> Result<DeliveryAttempt, InvoiceError> {
        let issued_at = Local::now();

        // Check the message before rendering so a bad request leaves no artifact behind.
        invoice.validate().map_err(InvoiceError::Validation)?;
        let priced = compute_totals(invoice)?;
        let message = self.compose_message(&priced, recipients, issued_at)?;
        message.validate().map_err(InvoiceError::Validation)?;

        let artifact = self
            .renderer
            .render_at(&priced, &self.template_id, issued_at)
            .await?;

        match self.deliver_with_retry(&message, &artifact).await {
            Ok(attempt) => Ok(attempt),
            Err(err @ InvoiceError::RejectedByProvider { .. }) => {
                if let Err(e) = self.dispatcher.lifecycle().discard(&artifact).await {
                    tracing::warn!(artifact_id = %artifact.id(), error = %e, "Could not discard rejected artifact");
                }
                Err(err)
            }
            Err(err) => {
                match self.dispatcher.lifecycle().abandon(&artifact) {
                    Ok(path) => tracing::warn!(
                        artifact_id = %artifact.id(),
                        path = ?path,
                        stage = err.stage(),
                        error = %err,
                        "Invoice not delivered; artifact kept"
                    ),
                    Err(e) => tracing::warn!(
                        artifact_id = %artifact.id(),
                        error = %e,
                        "Could not abandon undelivered artifact"
                    ),
                }
                Err(err)
            }
        }
    }
}
