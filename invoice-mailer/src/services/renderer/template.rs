use super::{InvoiceContext, RenderError, TemplateRenderer};
use askama::Template;

pub const INVOICE_TEMPLATE: &str = "invoice";

#[derive(Template)]
#[template(path = "invoice.html")]
struct InvoiceHtml<'a> {
    invoice: &'a InvoiceContext,
}

/// Compile-time templates bundled with the crate.
#[derive(Debug, Default, Clone)]
pub struct AskamaTemplates;

impl AskamaTemplates {
    pub fn new() -> Self {
        Self
    }
}

impl TemplateRenderer for AskamaTemplates {
    fn render(&self, template_id: &str, context: &InvoiceContext) -> Result<String, RenderError> {
        match template_id {
            INVOICE_TEMPLATE => InvoiceHtml { invoice: context }
                .render()
                .map_err(|e| RenderError::Template(e.to_string())),
            other => Err(RenderError::UnknownTemplate(other.to_string())),
        }
    }
}
