use crate::models::split_addresses;
use crate::services::pipeline::MessageDefaults;
use crate::services::providers::{AuthScheme, PayloadEncoding, ProviderConfig, SmtpRelayCredentials};
use secrecy::SecretString;
use service_core::config as core_config;
use service_core::error::AppError;
use service_core::retry::RetryConfig;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct InvoiceMailerConfig {
    pub common: core_config::Config,
    pub provider: ProviderConfig,
    pub email: EmailConfig,
    pub rendering: RenderingConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub from: String,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub sender_name: String,
}

impl EmailConfig {
    pub fn defaults(&self) -> MessageDefaults {
        MessageDefaults {
            from: self.from.clone(),
            cc: self.cc.clone(),
            bcc: self.bcc.clone(),
            sender_name: self.sender_name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderingConfig {
    pub artifact_dir: PathBuf,
    pub template_id: String,
    pub resource_dir: PathBuf,
    pub compositor_program: String,
    pub compositor_timeout: Duration,
}

impl InvoiceMailerConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let encoding = get_env("EMAIL_PAYLOAD_ENCODING", Some("json"), is_prod)?
            .parse::<PayloadEncoding>()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let auth = parse_auth(
            &get_env("EMAIL_AUTH_SCHEME", Some("api-key"), is_prod)?,
            get_env("EMAIL_API_KEY", Some(""), is_prod)?,
            || {
                Ok(SmtpRelayCredentials {
                    host: get_env("SMTP_HOST", Some(""), is_prod)?,
                    port: parse_setting("SMTP_PORT", &get_env("SMTP_PORT", Some("587"), is_prod)?)?,
                    user: get_env("SMTP_USER", Some(""), is_prod)?,
                    password: SecretString::new(get_env("SMTP_PASSWORD", Some(""), is_prod)?),
                })
            },
        )?;

        let default_artifact_dir = env::temp_dir().join("invoice-artifacts");

        Ok(InvoiceMailerConfig {
            common: common_config,
            provider: ProviderConfig {
                name: get_env("EMAIL_PROVIDER_NAME", Some("email-provider"), is_prod)?,
                endpoint: get_env("EMAIL_PROVIDER_URL", None, is_prod)?,
                auth,
                encoding,
                timeout: parse_secs(
                    "EMAIL_REQUEST_TIMEOUT_SECS",
                    &get_env("EMAIL_REQUEST_TIMEOUT_SECS", Some("30"), is_prod)?,
                )?,
            },
            email: EmailConfig {
                from: get_env("EMAIL_FROM", Some("invoices@example.com"), is_prod)?,
                cc: split_addresses(&get_env("EMAIL_CC", Some(""), is_prod)?),
                bcc: split_addresses(&get_env("EMAIL_BCC", Some(""), is_prod)?),
                sender_name: get_env("EMAIL_SENDER_NAME", Some("Billing"), is_prod)?,
            },
            rendering: RenderingConfig {
                artifact_dir: env::var("INVOICE_ARTIFACT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(default_artifact_dir),
                template_id: get_env("INVOICE_TEMPLATE_ID", Some("invoice"), is_prod)?,
                resource_dir: PathBuf::from(get_env(
                    "INVOICE_RESOURCE_DIR",
                    Some("resources"),
                    is_prod,
                )?),
                compositor_program: get_env(
                    "INVOICE_COMPOSITOR_PROGRAM",
                    Some("wkhtmltopdf"),
                    is_prod,
                )?,
                compositor_timeout: parse_secs(
                    "INVOICE_COMPOSITOR_TIMEOUT_SECS",
                    &get_env("INVOICE_COMPOSITOR_TIMEOUT_SECS", Some("60"), is_prod)?,
                )?,
            },
            retry: RetryConfig::with_max_retries(parse_setting(
                "EMAIL_MAX_RETRIES",
                &get_env("EMAIL_MAX_RETRIES", Some("3"), is_prod)?,
            )?),
        })
    }
}

/// Map the configured scheme name onto credentials. Relay credentials are
/// only read when the relay scheme is selected.
fn parse_auth<F>(scheme: &str, api_key: String, relay: F) -> Result<AuthScheme, AppError>
where
    F: FnOnce() -> Result<SmtpRelayCredentials, AppError>,
{
    match scheme.trim().to_lowercase().as_str() {
        "bearer" => Ok(AuthScheme::Bearer(SecretString::new(api_key))),
        "api-key" | "apikey" | "x-api-key" => Ok(AuthScheme::ApiKey(SecretString::new(api_key))),
        "smtp-relay" | "smtp" => Ok(AuthScheme::SmtpRelay(relay()?)),
        other => Err(AppError::ConfigError(anyhow::anyhow!(
            "Invalid auth scheme: {}",
            other
        ))),
    }
}

fn parse_setting<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("Invalid value for {}: '{}' ({})", key, raw, e))
    })
}

/// Whole seconds, at least one.
fn parse_secs(key: &str, raw: &str) -> Result<Duration, AppError> {
    match parse_setting::<u64>(key, raw)? {
        0 => Err(AppError::ConfigError(anyhow::anyhow!(
            "{} must be at least 1 second",
            key
        ))),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn no_relay() -> Result<SmtpRelayCredentials, AppError> {
        panic!("relay credentials should not be read")
    }

    #[test]
    fn header_schemes_carry_the_key() {
        match parse_auth("Bearer", "re_123".to_string(), no_relay).unwrap() {
            AuthScheme::Bearer(key) => assert_eq!(key.expose_secret(), "re_123"),
            other => panic!("unexpected scheme {:?}", other),
        }
        assert!(matches!(
            parse_auth("api-key", "k".to_string(), no_relay).unwrap(),
            AuthScheme::ApiKey(_)
        ));
    }

    #[test]
    fn relay_scheme_reads_credentials() {
        let auth = parse_auth("smtp-relay", String::new(), || {
            Ok(SmtpRelayCredentials {
                host: "smtp.example.com".to_string(),
                port: 587,
                user: "mailer".to_string(),
                password: SecretString::new("pw".to_string()),
            })
        })
        .unwrap();

        assert_eq!(auth.name(), "smtp-relay");
    }

    #[test]
    fn unknown_scheme_is_a_config_error() {
        let err = parse_auth("oauth", String::new(), no_relay).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn timeouts_must_be_positive_whole_seconds() {
        assert_eq!(
            parse_secs("EMAIL_REQUEST_TIMEOUT_SECS", " 45 ").unwrap(),
            Duration::from_secs(45)
        );
        assert!(matches!(
            parse_secs("EMAIL_REQUEST_TIMEOUT_SECS", "0"),
            Err(AppError::ConfigError(_))
        ));
        let err = parse_secs("INVOICE_COMPOSITOR_TIMEOUT_SECS", "soon").unwrap_err();
        assert!(err.to_string().contains("INVOICE_COMPOSITOR_TIMEOUT_SECS"));
    }

    #[test]
    fn malformed_numbers_are_config_errors() {
        assert_eq!(parse_setting::<u16>("SMTP_PORT", "2525").unwrap(), 2525);
        assert_eq!(parse_setting::<u32>("EMAIL_MAX_RETRIES", "5").unwrap(), 5);

        let err = parse_setting::<u16>("SMTP_PORT", "smtp").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.to_string().contains("SMTP_PORT"));

        assert!(parse_setting::<u16>("SMTP_PORT", "70000").is_err());
        assert!(parse_setting::<u32>("EMAIL_MAX_RETRIES", "-1").is_err());
    }

    #[test]
    fn email_defaults_copy_into_message_defaults() {
        let email = EmailConfig {
            from: "billing@shop.com".to_string(),
            cc: vec!["owner@shop.com".to_string()],
            bcc: vec![],
            sender_name: "Shop".to_string(),
        };
        let defaults = email.defaults();
        assert_eq!(defaults.from, "billing@shop.com");
        assert_eq!(defaults.cc, vec!["owner@shop.com".to_string()]);
    }
}
