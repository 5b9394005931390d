//! Priced invoice → HTML → PDF artifact on scoped storage.

pub mod compositor;
pub mod template;

use crate::models::{PricedInvoice, RenderedArtifact};
use crate::services::executor::ExecError;
use crate::services::lifecycle::ArtifactLifecycle;
use crate::services::metrics::record_render;
use crate::services::storage::ArtifactStorage;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub use compositor::CommandCompositor;
pub use template::AskamaTemplates;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Document composition failed: {0}")]
    Compositor(String),

    #[error("Document composition failed: {0}")]
    Command(#[from] ExecError),

    #[error("Rendered document is empty")]
    EmptyDocument,

    #[error("Failed to persist artifact: {0}")]
    Storage(#[from] io::Error),

    #[error("Artifact was not found after writing: {0}")]
    Missing(PathBuf),
}

/// Turns a template id and named values into HTML.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template_id: &str, context: &InvoiceContext) -> Result<String, RenderError>;
}

/// Turns HTML into document bytes. Relative resources in the HTML resolve
/// against `resource_root`.
#[async_trait]
pub trait DocumentCompositor: Send + Sync {
    async fn compose(&self, html: &str, resource_root: &Path) -> Result<Vec<u8>, RenderError>;
}

/// One row of the invoice table, formatted for display.
#[derive(Debug, Clone, Serialize)]
pub struct ItemRow {
    pub description: String,
    pub price: String,
    pub quantity: u32,
    pub discount: String,
    pub discount_type: &'static str,
    pub total: String,
}

/// Named values handed to the template. Money is rounded to cents here for
/// display only; the priced invoice keeps full precision.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceContext {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub date: String,
    pub items: Vec<ItemRow>,
    pub subtotal: String,
    pub apply_overall_discount: bool,
    pub overall_discount: String,
    pub overall_discount_type: &'static str,
    pub after_overall_discount: String,
    pub adjustment_amount: String,
    pub adjustment_amount_type: &'static str,
    pub amount: String,
    pub payment_method: String,
    pub payment_details: String,
    pub issued_by: String,
    pub invoice_status: String,
    pub owner_message: String,
}

impl InvoiceContext {
    pub fn new(invoice: &PricedInvoice, issued_at: DateTime<Local>) -> Self {
        let doc = invoice.document();
        Self {
            name: doc.customer_name.clone(),
            phone: doc.customer_phone.clone(),
            address: doc.customer_address.clone(),
            date: display_date(issued_at),
            items: invoice
                .items()
                .iter()
                .map(|priced| ItemRow {
                    description: priced.item.description.clone(),
                    price: money(priced.item.price),
                    quantity: priced.item.quantity,
                    discount: money(priced.item.discount),
                    discount_type: priced.item.discount_type.as_str(),
                    total: money(priced.total),
                })
                .collect(),
            subtotal: money(invoice.subtotal()),
            apply_overall_discount: doc.apply_overall_discount,
            overall_discount: money(doc.overall_discount),
            overall_discount_type: doc.overall_discount_type.as_str(),
            after_overall_discount: money(invoice.after_overall_discount()),
            adjustment_amount: money(doc.adjustment_amount),
            adjustment_amount_type: doc.adjustment_amount_type.as_str(),
            amount: money(invoice.grand_total()),
            payment_method: doc.payment_method.clone(),
            payment_details: doc.payment_details.clone(),
            issued_by: doc.issued_by.clone(),
            invoice_status: doc.invoice_status.clone(),
            owner_message: doc.owner_message.clone(),
        }
    }
}

/// `19 Oct 2026 14:05`
pub fn display_date(at: DateTime<Local>) -> String {
    at.format("%d %b %Y %H:%M").to_string()
}

pub fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

pub struct DocumentRenderer {
    templates: Arc<dyn TemplateRenderer>,
    compositor: Arc<dyn DocumentCompositor>,
    storage: ArtifactStorage,
    resource_root: PathBuf,
    lifecycle: Arc<ArtifactLifecycle>,
}

impl DocumentRenderer {
    pub fn new(
        templates: Arc<dyn TemplateRenderer>,
        compositor: Arc<dyn DocumentCompositor>,
        storage: ArtifactStorage,
        resource_root: impl Into<PathBuf>,
        lifecycle: Arc<ArtifactLifecycle>,
    ) -> Self {
        Self {
            templates,
            compositor,
            storage,
            resource_root: resource_root.into(),
            lifecycle,
        }
    }

    pub async fn render(
        &self,
        invoice: &PricedInvoice,
        template_id: &str,
    ) -> Result<RenderedArtifact, RenderError> {
        self.render_at(invoice, template_id, Local::now()).await
    }

    /// Render with an explicit issue time. The returned artifact is
    /// persisted, non-empty and tracked by the lifecycle.
    pub async fn render_at(
        &self,
        invoice: &PricedInvoice,
        template_id: &str,
        issued_at: DateTime<Local>,
    ) -> Result<RenderedArtifact, RenderError> {
        let result = self.render_inner(invoice, template_id, issued_at).await;
        match &result {
            Ok(artifact) => {
                record_render("success");
                tracing::info!(
                    artifact_id = %artifact.id(),
                    path = ?artifact.path(),
                    size = artifact.size(),
                    template_id = %template_id,
                    "Invoice document rendered"
                );
            }
            Err(e) => {
                record_render("failure");
                tracing::error!(template_id = %template_id, error = %e, "Invoice rendering failed");
            }
        }
        result
    }

    async fn render_inner(
        &self,
        invoice: &PricedInvoice,
        template_id: &str,
        issued_at: DateTime<Local>,
    ) -> Result<RenderedArtifact, RenderError> {
        let context = InvoiceContext::new(invoice, issued_at);
        let html = self.templates.render(template_id, &context)?;

        let bytes = self.compositor.compose(&html, &self.resource_root).await?;
        if bytes.is_empty() {
            return Err(RenderError::EmptyDocument);
        }

        let stored = self.storage.write_new(&bytes).await?;

        let size = match self.storage.size_of(&stored.path).await {
            Ok(size) => size,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RenderError::Missing(stored.path));
            }
            Err(e) => {
                if let Err(remove_err) = self.storage.remove(&stored.path).await {
                    tracing::warn!(path = ?stored.path, error = %remove_err, "Could not remove unverified artifact");
                }
                return Err(RenderError::Storage(e));
            }
        };

        if size == 0 {
            if let Err(e) = self.storage.remove(&stored.path).await {
                tracing::warn!(path = ?stored.path, error = %e, "Could not remove empty artifact");
            }
            return Err(RenderError::EmptyDocument);
        }

        let artifact = RenderedArtifact::new(stored.path, stored.filename, size);
        self.lifecycle.register(&artifact);
        Ok(artifact)
    }
}
