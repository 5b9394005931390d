#![allow(dead_code)]

use async_trait::async_trait;
use invoice_mailer::models::{DiscountType, EmailMessage, InvoiceDocument, LineItem, RenderedArtifact};
use invoice_mailer::services::{
    ArtifactLifecycle, ArtifactStorage, AskamaTemplates, AuthScheme, DeliveryDispatcher,
    DocumentCompositor, DocumentRenderer, InvoicePipeline, MessageDefaults, PayloadEncoding,
    ProviderConfig, RenderError,
};
use rust_decimal::Decimal;
use secrecy::SecretString;
use service_core::retry::RetryConfig;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const SEND_PATH: &str = "/api/emails";
pub const TEST_API_KEY: &str = "test-key-0123456789";
pub const FAKE_PDF: &[u8] = b"%PDF-1.4 test document";

/// Stands in for the HTML-to-PDF program.
pub struct FakeCompositor {
    output: Vec<u8>,
}

impl FakeCompositor {
    pub fn pdf() -> Self {
        Self {
            output: FAKE_PDF.to_vec(),
        }
    }

    pub fn empty() -> Self {
        Self { output: Vec::new() }
    }
}

#[async_trait]
impl DocumentCompositor for FakeCompositor {
    async fn compose(&self, html: &str, _resource_root: &Path) -> Result<Vec<u8>, RenderError> {
        assert!(!html.is_empty(), "compositor received empty HTML");
        Ok(self.output.clone())
    }
}

/// Scoped storage, a shared lifecycle and a renderer wired to them.
pub struct TestContext {
    pub dir: TempDir,
    pub lifecycle: Arc<ArtifactLifecycle>,
    pub renderer: DocumentRenderer,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_compositor(FakeCompositor::pdf()).await
    }

    pub async fn with_compositor(compositor: FakeCompositor) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let storage = ArtifactStorage::new(dir.path().join("artifacts"))
            .await
            .expect("Failed to create artifact storage");
        let lifecycle = Arc::new(ArtifactLifecycle::new());

        let renderer = DocumentRenderer::new(
            Arc::new(AskamaTemplates::new()),
            Arc::new(compositor),
            storage,
            dir.path(),
            lifecycle.clone(),
        );

        TestContext {
            dir,
            lifecycle,
            renderer,
        }
    }

    pub fn artifact_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("artifacts")
    }

    /// Render the sample invoice and return the persisted artifact.
    pub async fn render_sample(&self) -> RenderedArtifact {
        let priced = invoice_mailer::services::compute_totals(&sample_invoice())
            .expect("Failed to price sample invoice");
        self.renderer
            .render(&priced, "invoice")
            .await
            .expect("Failed to render sample invoice")
    }

    pub fn dispatcher(&self, config: ProviderConfig) -> DeliveryDispatcher {
        DeliveryDispatcher::new(config, self.lifecycle.clone())
            .expect("Failed to build dispatcher")
    }

    /// Move the renderer into a full pipeline with fast retries.
    pub fn into_pipeline(self, config: ProviderConfig, max_retries: u32) -> TestPipeline {
        let dispatcher = DeliveryDispatcher::new(config, self.lifecycle.clone())
            .expect("Failed to build dispatcher");
        let pipeline = InvoicePipeline::new(self.renderer, dispatcher, message_defaults(), "invoice")
            .with_retry(fast_retry(max_retries));

        TestPipeline {
            dir: self.dir,
            lifecycle: self.lifecycle,
            pipeline,
        }
    }
}

pub struct TestPipeline {
    pub dir: TempDir,
    pub lifecycle: Arc<ArtifactLifecycle>,
    pub pipeline: InvoicePipeline,
}

impl TestPipeline {
    /// Files currently left in artifact storage.
    pub fn stored_artifacts(&self) -> usize {
        std::fs::read_dir(self.dir.path().join("artifacts"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

pub fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(20),
        backoff_multiplier: 1.0,
        add_jitter: false,
    }
}

pub fn message_defaults() -> MessageDefaults {
    MessageDefaults {
        from: "billing@shop.example".to_string(),
        cc: vec!["owner@shop.example".to_string()],
        bcc: vec!["archive@shop.example".to_string()],
        sender_name: "Rao Crafts".to_string(),
    }
}

pub fn provider_config(server_uri: &str, encoding: PayloadEncoding, auth: AuthScheme) -> ProviderConfig {
    ProviderConfig {
        name: "test-provider".to_string(),
        endpoint: format!("{}{}", server_uri, SEND_PATH),
        auth,
        encoding,
        timeout: Duration::from_secs(5),
    }
}

pub fn json_config(server_uri: &str) -> ProviderConfig {
    provider_config(
        server_uri,
        PayloadEncoding::Json,
        AuthScheme::ApiKey(SecretString::new(TEST_API_KEY.to_string())),
    )
}

/// Scenario invoice: one discounted item, overall 5% discount, -5 adjustment.
pub fn sample_invoice() -> InvoiceDocument {
    InvoiceDocument {
        items: vec![LineItem::new("Canvas tote", Decimal::from(100), 2)
            .with_discount(Decimal::from(10), DiscountType::Percent)],
        customer_name: "Asha Rao".to_string(),
        customer_phone: "+91 98765 43210".to_string(),
        customer_address: "12 MG Road, Pune".to_string(),
        apply_overall_discount: true,
        overall_discount: Decimal::from(5),
        overall_discount_type: DiscountType::Percent,
        adjustment_amount: Decimal::from(-5),
        adjustment_amount_type: DiscountType::Flat,
        payment_method: "UPI".to_string(),
        issued_by: "Counter 2".to_string(),
        invoice_status: "PAID".to_string(),
        ..Default::default()
    }
}

pub fn sample_message() -> EmailMessage {
    EmailMessage {
        to: "customer@example.com".to_string(),
        from: "billing@shop.example".to_string(),
        cc: vec!["owner@shop.example".to_string()],
        bcc: vec![],
        subject: "Invoice - PAID".to_string(),
        html_body: Some("<p>Hi Asha, your invoice is attached.</p>".to_string()),
        text_body: Some("Hi Asha, your invoice is attached.".to_string()),
    }
}
