//! Domain models for invoice-mailer.

mod artifact;
mod delivery;
mod email;
mod invoice;

pub use artifact::{RenderedArtifact, PDF_CONTENT_TYPE};
pub use delivery::{DeliveryAttempt, DeliveryOutcome};
pub use email::{merge_addresses, split_addresses, EmailMessage};
pub use invoice::{DiscountType, InvoiceDocument, LineItem, PricedInvoice, PricedLineItem};
