//! Document rendering integration tests.

mod common;

use chrono::Local;
use common::{sample_invoice, FakeCompositor, TestContext, FAKE_PDF};
use invoice_mailer::models::PDF_CONTENT_TYPE;
use invoice_mailer::services::{
    compute_totals, AskamaTemplates, InvoiceContext, RenderError, TemplateRenderer,
};

#[tokio::test]
async fn render_persists_a_non_empty_pdf() {
    let ctx = TestContext::new().await;

    let artifact = ctx.render_sample().await;

    assert!(artifact.path().exists());
    assert!(artifact.path().starts_with(ctx.artifact_dir()));
    assert_eq!(artifact.size(), FAKE_PDF.len() as u64);
    assert_eq!(artifact.content_type(), PDF_CONTENT_TYPE);
    assert_eq!(std::fs::read(artifact.path()).unwrap(), FAKE_PDF);
    assert!(artifact.filename().starts_with("invoice_"));
    assert!(artifact.filename().ends_with(".pdf"));
}

#[tokio::test]
async fn rendered_artifact_is_tracked_and_idle() {
    let ctx = TestContext::new().await;

    let artifact = ctx.render_sample().await;

    assert!(!ctx.lifecycle.is_in_flight(artifact.id()));
    assert!(ctx.lifecycle.is_tracked(artifact.id()));
    assert_eq!(ctx.lifecycle.last_outcome(artifact.id()), None);
}

#[tokio::test]
async fn concurrent_renders_get_distinct_files() {
    let ctx = TestContext::new().await;
    let priced = compute_totals(&sample_invoice()).expect("Failed to price invoice");

    let (a, b, c) = tokio::join!(
        ctx.renderer.render(&priced, "invoice"),
        ctx.renderer.render(&priced, "invoice"),
        ctx.renderer.render(&priced, "invoice"),
    );
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

    assert_ne!(a.path(), b.path());
    assert_ne!(b.path(), c.path());
    assert_ne!(a.path(), c.path());
    assert_ne!(a.id(), b.id());
}

#[tokio::test]
async fn empty_compositor_output_is_a_render_error() {
    let ctx = TestContext::with_compositor(FakeCompositor::empty()).await;
    let priced = compute_totals(&sample_invoice()).expect("Failed to price invoice");

    let err = ctx.renderer.render(&priced, "invoice").await.unwrap_err();

    assert!(matches!(err, RenderError::EmptyDocument));
    let leftovers = std::fs::read_dir(ctx.artifact_dir()).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn unknown_template_is_a_render_error() {
    let ctx = TestContext::new().await;
    let priced = compute_totals(&sample_invoice()).expect("Failed to price invoice");

    let err = ctx.renderer.render(&priced, "receipt").await.unwrap_err();

    assert!(matches!(err, RenderError::UnknownTemplate(id) if id == "receipt"));
}

#[test]
fn invoice_template_shows_customer_and_totals() {
    let priced = compute_totals(&sample_invoice()).expect("Failed to price invoice");
    let context = InvoiceContext::new(&priced, Local::now());

    let html = AskamaTemplates::new()
        .render("invoice", &context)
        .expect("Failed to render template");

    assert!(html.contains("Asha Rao"));
    assert!(html.contains("Canvas tote"));
    assert!(html.contains("180.00"));
    assert!(html.contains("171.00"));
    assert!(html.contains("166.00"));
    assert!(html.contains("PAID"));
    assert!(html.contains("Payment method: UPI"));
}
