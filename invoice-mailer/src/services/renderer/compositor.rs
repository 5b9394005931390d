use super::{DocumentCompositor, RenderError};
use crate::services::executor::CommandExecutor;
use async_trait::async_trait;
use std::path::Path;

/// Converts HTML to PDF by running an external program
/// (`wkhtmltopdf`-compatible: `<program> [args..] <input.html> -`).
#[derive(Debug, Clone)]
pub struct CommandCompositor {
    program: String,
    args: Vec<String>,
    executor: CommandExecutor,
}

impl CommandCompositor {
    pub fn new(program: impl Into<String>, executor: CommandExecutor) -> Self {
        Self {
            program: program.into(),
            args: vec![
                "--quiet".to_string(),
                "--enable-local-file-access".to_string(),
            ],
            executor,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

#[async_trait]
impl DocumentCompositor for CommandCompositor {
    async fn compose(&self, html: &str, resource_root: &Path) -> Result<Vec<u8>, RenderError> {
        // The HTML sits next to its resources so relative links resolve.
        let input = tempfile::Builder::new()
            .prefix("invoice-")
            .suffix(".html")
            .tempfile_in(resource_root)
            .map_err(|e| {
                RenderError::Compositor(format!(
                    "cannot stage HTML in {}: {}",
                    resource_root.display(),
                    e
                ))
            })?;
        tokio::fs::write(input.path(), html).await?;

        let mut args = self.args.clone();
        args.push(input.path().to_string_lossy().into_owned());
        args.push("-".to_string());

        let document = self
            .executor
            .run(&self.program, &args, Some(resource_root))
            .await?;

        tracing::debug!(
            program = %self.program,
            html_len = html.len(),
            output_size = document.len(),
            "HTML composed into document"
        );

        Ok(document)
    }
}
