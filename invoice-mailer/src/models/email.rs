use serde::Serialize;

/// Outgoing message. The attachment travels separately as a `RenderedArtifact`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmailMessage {
    /// Single address or a comma-joined list.
    pub to: String,
    pub from: String,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
}

impl EmailMessage {
    /// Checks the fields required before anything goes on the wire.
    pub fn validate(&self) -> Result<(), String> {
        if self.to.trim().is_empty() {
            return Err("Recipient email (to) is required".to_string());
        }
        if self.subject.trim().is_empty() {
            return Err("Subject is required".to_string());
        }
        if non_blank(&self.html_body).is_none() && non_blank(&self.text_body).is_none() {
            return Err("Email must have either text or HTML body".to_string());
        }
        Ok(())
    }

    pub fn html(&self) -> Option<&str> {
        non_blank(&self.html_body)
    }

    pub fn text(&self) -> Option<&str> {
        non_blank(&self.text_body)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Splits a comma-joined address list, trimming entries and dropping blanks.
pub fn split_addresses(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configured defaults first, then per-call entries; duplicates are dropped
/// case-insensitively.
pub fn merge_addresses(defaults: &[String], overrides: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(defaults.len() + overrides.len());
    for address in defaults.iter().chain(overrides) {
        let address = address.trim();
        if address.is_empty() {
            continue;
        }
        if !merged.iter().any(|m| m.eq_ignore_ascii_case(address)) {
            merged.push(address.to_string());
        }
    }
    merged
}
