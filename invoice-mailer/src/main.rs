use invoice_mailer::config::InvoiceMailerConfig;
use invoice_mailer::models::InvoiceDocument;
use invoice_mailer::services::{
    ArtifactLifecycle, ArtifactStorage, AskamaTemplates, CommandCompositor, CommandExecutor,
    DeliveryDispatcher, DocumentRenderer, InvoicePipeline, Recipients,
};
use serde::Deserialize;
use service_core::error::AppError;
use service_core::observability::init_tracing;
use std::path::Path;
use std::sync::Arc;

/// Contents of the request file passed on the command line.
#[derive(Debug, Deserialize)]
struct SendRequest {
    to: String,
    #[serde(default)]
    cc: Vec<String>,
    #[serde(default)]
    bcc: Vec<String>,
    invoice: InvoiceDocument,
}

async fn read_request(path: &Path) -> Result<SendRequest, AppError> {
    let raw = tokio::fs::read(path).await.map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_slice(&raw).map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("invalid request {}: {}", path.display(), e))
    })
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = InvoiceMailerConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(
        &config.common.service_name,
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    )
    .map_err(|e| std::io::Error::other(format!("Tracing init error: {}", e)))?;

    let request_path = std::env::args().nth(1).ok_or_else(|| {
        std::io::Error::other("usage: invoice-mailer <request.json>".to_string())
    })?;

    let request = read_request(Path::new(&request_path)).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to read send request");
        std::io::Error::other(e.to_string())
    })?;

    let lifecycle = Arc::new(ArtifactLifecycle::new());

    let storage = ArtifactStorage::new(&config.rendering.artifact_dir)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to prepare artifact storage");
            std::io::Error::other(format!("Storage error: {}", e))
        })?;

    let compositor = CommandCompositor::new(
        config.rendering.compositor_program.clone(),
        CommandExecutor::new(config.rendering.compositor_timeout),
    );

    let renderer = DocumentRenderer::new(
        Arc::new(AskamaTemplates::new()),
        Arc::new(compositor),
        storage,
        config.rendering.resource_dir.clone(),
        lifecycle.clone(),
    );

    let dispatcher = DeliveryDispatcher::new(config.provider.clone(), lifecycle).map_err(|e| {
        tracing::error!(error = %e, "Failed to configure delivery");
        std::io::Error::other(e.to_string())
    })?;

    let pipeline = InvoicePipeline::new(
        renderer,
        dispatcher,
        config.email.defaults(),
        config.rendering.template_id.clone(),
    )
    .with_retry(config.retry.clone());

    let recipients = Recipients {
        to: request.to,
        cc: request.cc,
        bcc: request.bcc,
    };

    let attempt = pipeline
        .send_invoice(&request.invoice, &recipients)
        .await
        .map_err(|e| {
            tracing::error!(stage = e.stage(), error = %e, "Invoice delivery failed");
            std::io::Error::other(e.to_string())
        })?;

    let report = serde_json::to_string_pretty(&attempt)
        .map_err(|e| std::io::Error::other(format!("Cannot encode attempt: {}", e)))?;
    println!("{}", report);

    Ok(())
}
