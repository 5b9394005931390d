//! service-core: Shared infrastructure for the invoice-mailer workspace.
pub mod config;
pub mod error;
pub mod observability;
pub mod retry;
