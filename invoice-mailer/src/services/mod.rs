pub mod calculator;
pub mod dispatcher;
pub mod executor;
pub mod lifecycle;
pub mod metrics;
pub mod pipeline;
pub mod providers;
pub mod renderer;
pub mod storage;

pub use calculator::compute_totals;
pub use dispatcher::DeliveryDispatcher;
pub use executor::{CommandExecutor, ExecError};
pub use lifecycle::{ArtifactLifecycle, Disposition, LifecycleError};
pub use pipeline::{InvoicePipeline, MessageDefaults, Recipients};
pub use providers::{
    AuthScheme, PayloadEncoding, ProviderAdapter, ProviderConfig, ProviderError,
    SmtpRelayCredentials,
};
pub use renderer::{
    AskamaTemplates, CommandCompositor, DocumentCompositor, DocumentRenderer, InvoiceContext,
    RenderError, TemplateRenderer,
};
pub use storage::ArtifactStorage;
