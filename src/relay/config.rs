use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpTls {
    /// Plain connection upgraded with STARTTLS (port 587).
    #[default]
    StartTls,
    /// Implicit TLS (port 465).
    Wrapper,
    None,
}

impl FromStr for SmtpTls {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "starttls" | "true" => Ok(SmtpTls::StartTls),
            "wrapper" | "tls" => Ok(SmtpTls::Wrapper),
            "none" | "false" => Ok(SmtpTls::None),
            other => Err(format!("unknown SMTP TLS mode '{other}'")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_tls: SmtpTls,
    pub from_email: String,
    pub from_name: String,
    pub frontend_url: String,
    pub api_key: Option<String>,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            smtp_user: None,
            smtp_password: None,
            smtp_tls: SmtpTls::StartTls,
            from_email: "contact@doccollect.fr".to_string(),
            from_name: "DocCollect".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            api_key: None,
            rate_limit_max: 10,
            rate_limit_window: Duration::from_secs(15 * 60),
        }
    }
}

fn parsed<T: FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|err: T::Err| anyhow::anyhow!("{name} is invalid: {err}")),
        Err(_) => Ok(default),
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = RelayConfig::default();
        let window_secs: u64 = parsed(
            "RELAY_RATE_LIMIT_WINDOW_SECS",
            defaults.rate_limit_window.as_secs(),
        )?;

        Ok(Self {
            host: env::var("RELAY_HOST").unwrap_or(defaults.host),
            port: parsed("RELAY_PORT", defaults.port).context("RELAY_PORT must be a valid u16")?,
            smtp_host: env::var("SMTP_HOST").unwrap_or(defaults.smtp_host),
            smtp_port: parsed("SMTP_PORT", defaults.smtp_port)?,
            smtp_user: env::var("SMTP_USER").ok().filter(|v| !v.is_empty()),
            smtp_password: env::var("SMTP_PASSWORD").ok().filter(|v| !v.is_empty()),
            smtp_tls: parsed("SMTP_TLS", defaults.smtp_tls)?,
            from_email: env::var("SMTP_FROM_EMAIL").unwrap_or(defaults.from_email),
            from_name: env::var("SMTP_FROM_NAME").unwrap_or(defaults.from_name),
            frontend_url: env::var("FRONTEND_URL").unwrap_or(defaults.frontend_url),
            api_key: env::var("RELAY_API_KEY").ok().filter(|v| !v.is_empty()),
            rate_limit_max: parsed("RELAY_RATE_LIMIT_MAX", defaults.rate_limit_max)?,
            rate_limit_window: Duration::from_secs(window_secs),
        })
    }
}
