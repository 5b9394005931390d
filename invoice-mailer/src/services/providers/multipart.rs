//! `multipart/form-data` payloads, as accepted by SMTP-relay bridges and
//! form-based provider APIs.

use super::{Attachment, AuthScheme, ProviderError, REDACTED};
use crate::models::EmailMessage;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};

#[derive(Debug, Clone)]
pub struct MultipartAdapter {
    auth: AuthScheme,
}

impl MultipartAdapter {
    pub fn new(auth: AuthScheme) -> Self {
        Self { auth }
    }

    pub fn auth(&self) -> &AuthScheme {
        &self.auth
    }

    /// Field order: `to, from, subject`, one body field, `cc*, bcc*`, then
    /// relay credentials, then the `file` part. The body is `html` when
    /// present, otherwise `text`; bridges accept only one of them.
    pub fn build_payload(&self, message: &EmailMessage, attachment: Attachment) -> FormPayload {
        let mut fields = vec![
            FormField::plain("to", message.to.trim()),
            FormField::plain("from", &message.from),
            FormField::plain("subject", &message.subject),
        ];

        match (message.html(), message.text()) {
            (Some(html), _) => fields.push(FormField::plain("html", html)),
            (None, Some(text)) => fields.push(FormField::plain("text", text)),
            (None, None) => {}
        }

        for cc in message.cc.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            fields.push(FormField::plain("cc", cc));
        }
        for bcc in message.bcc.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            fields.push(FormField::plain("bcc", bcc));
        }

        if let AuthScheme::SmtpRelay(creds) = &self.auth {
            fields.push(FormField::plain("emailHost", &creds.host));
            fields.push(FormField::plain("emailPort", &creds.port.to_string()));
            fields.push(FormField::plain("emailUser", &creds.user));
            fields.push(FormField::secret("emailPassword", creds.password.clone()));
        }

        FormPayload {
            fields,
            file: attachment,
        }
    }
}

#[derive(Debug, Clone)]
pub enum FieldValue {
    Plain(String),
    Secret(SecretString),
}

#[derive(Debug, Clone)]
pub struct FormField {
    pub name: &'static str,
    pub value: FieldValue,
}

impl FormField {
    fn plain(name: &'static str, value: &str) -> Self {
        Self {
            name,
            value: FieldValue::Plain(value.to_string()),
        }
    }

    fn secret(name: &'static str, value: SecretString) -> Self {
        Self {
            name,
            value: FieldValue::Secret(value),
        }
    }
}

#[derive(Debug)]
pub struct FormPayload {
    fields: Vec<FormField>,
    file: Attachment,
}

impl FormPayload {
    /// Values of every field with this name, in order. Secrets come back redacted.
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.name == name)
            .map(|f| match &f.value {
                FieldValue::Plain(v) => v.as_str(),
                FieldValue::Secret(_) => REDACTED,
            })
            .collect()
    }

    pub fn redacted(&self) -> String {
        let mut parts: Vec<String> = self
            .fields
            .iter()
            .map(|f| match &f.value {
                FieldValue::Plain(v) if f.name == "html" || f.name == "text" => {
                    format!("{}=<{} chars>", f.name, v.chars().count())
                }
                FieldValue::Plain(v) => format!("{}={}", f.name, v),
                FieldValue::Secret(_) => format!("{}={}", f.name, REDACTED),
            })
            .collect();
        parts.push(format!(
            "file={} ({} bytes)",
            self.file.filename,
            self.file.bytes.len()
        ));
        format!("multipart{{{}}}", parts.join(", "))
    }

    /// Consume the payload into a reqwest form. Secrets are exposed only here.
    pub fn into_form(self) -> Result<Form, ProviderError> {
        let mut form = Form::new();
        for field in self.fields {
            let value = match field.value {
                FieldValue::Plain(v) => v,
                FieldValue::Secret(s) => s.expose_secret().clone(),
            };
            form = form.text(field.name, value);
        }

        let file = Part::bytes(self.file.bytes)
            .file_name(self.file.filename)
            .mime_str(&self.file.content_type)
            .map_err(|e| ProviderError::Payload(format!("invalid attachment type: {}", e)))?;

        Ok(form.part("file", file))
    }
}
