//! JSON payloads with a base64-embedded attachment (Maileroo, Resend and
//! similar HTTP APIs). Credentials travel in headers only.

use super::{Attachment, AuthScheme, ProviderError};
use crate::models::EmailMessage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct JsonAdapter {
    auth: AuthScheme,
}

impl JsonAdapter {
    pub fn new(auth: AuthScheme) -> Self {
        Self { auth }
    }

    pub fn auth(&self) -> &AuthScheme {
        &self.auth
    }

    pub fn build_payload(
        &self,
        message: &EmailMessage,
        attachment: Attachment,
    ) -> Result<JsonPayload, ProviderError> {
        if matches!(self.auth, AuthScheme::SmtpRelay(_)) {
            return Err(ProviderError::Configuration(
                "JSON payloads cannot carry SMTP-relay credentials".to_string(),
            ));
        }

        let body = JsonEmail {
            to: message.to.trim().to_string(),
            from: message.from.clone(),
            subject: message.subject.clone(),
            html: message.html().map(str::to_string),
            text: message.text().map(str::to_string),
            cc: join_addresses(&message.cc),
            bcc: join_addresses(&message.bcc),
            attachments: vec![JsonAttachment {
                filename: attachment.filename,
                content: STANDARD.encode(&attachment.bytes),
                content_type: attachment.content_type,
            }],
        };

        Ok(JsonPayload { body })
    }
}

fn join_addresses(addresses: &[String]) -> Option<String> {
    let joined = addresses
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .collect::<Vec<_>>()
        .join(",");
    (!joined.is_empty()).then_some(joined)
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonEmail {
    pub to: String,
    pub from: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bcc: Option<String>,
    pub attachments: Vec<JsonAttachment>,
}

#[derive(Clone, Serialize)]
pub struct JsonAttachment {
    pub filename: String,
    /// Base64 of the attachment bytes.
    pub content: String,
    #[serde(rename = "type")]
    pub content_type: String,
}

impl std::fmt::Debug for JsonAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonAttachment")
            .field("filename", &self.filename)
            .field("content_len", &self.content.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

#[derive(Debug)]
pub struct JsonPayload {
    body: JsonEmail,
}

impl JsonPayload {
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProviderError> {
        serde_json::to_vec(&self.body)
            .map_err(|e| ProviderError::Payload(format!("failed to encode JSON body: {}", e)))
    }

    pub fn redacted(&self) -> String {
        let attachments = self
            .body
            .attachments
            .iter()
            .map(|a| format!("{} ({} base64 chars)", a.filename, a.content.len()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "json{{to={}, from={}, subject={}, cc={}, bcc={}, attachments=[{}]}}",
            self.body.to,
            self.body.from,
            self.body.subject,
            self.body.cc.as_deref().unwrap_or("-"),
            self.body.bcc.as_deref().unwrap_or("-"),
            attachments
        )
    }
}
