//! Metrics for invoice rendering and delivery.
//!
//! Recorded through the `metrics` facade; the embedding process decides which
//! recorder (if any) is installed.

use crate::models::DeliveryOutcome;
use metrics::{counter, histogram};
use std::time::Duration;

/// Record one classified delivery attempt.
pub fn record_delivery(provider: &str, outcome: DeliveryOutcome, elapsed: Duration) {
    counter!(
        "invoice_delivery_attempts_total",
        "provider" => provider.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
    histogram!("invoice_delivery_duration_seconds", "provider" => provider.to_string())
        .record(elapsed.as_secs_f64());
}

/// Record a render result (`success` or `failure`).
pub fn record_render(status: &'static str) {
    counter!("invoice_render_total", "status" => status).increment(1);
}
