//! Outbound request emails: rendering, delivery through the relay, and the policy applied
//! when the relay cannot be reached.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::document_list::DocumentDefinition;

pub mod credentials;
pub mod http;
pub mod templates;

pub use http::HttpEmailTransport;
pub use templates::{EmailRenderer, RenderedEmail};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,
    pub name: String,
}

/// One-time login handed to the client. Never persisted in clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSummary {
    pub id: Uuid,
    pub client_name: String,
    pub client_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_list_name: Option<String>,
    pub requested_documents: Vec<DocumentDefinition>,
}

/// Body of `POST /send-email`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingEmail {
    pub to: Recipient,
    pub subject: String,
    pub html: String,
    pub text: String,
    pub credentials: LoginCredentials,
    pub request_data: RequestSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    #[serde(default)]
    pub message_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("email endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("email endpoint timed out")]
    Timeout,
    #[error("email endpoint unhealthy (status {0})")]
    Unhealthy(u16),
    #[error("email relay rejected the message ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl TransportError {
    /// Failures that mean "no relay available" rather than "relay said no".
    pub fn allows_fallback(&self) -> bool {
        !matches!(self, TransportError::Rejected { .. })
    }
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn health(&self) -> Result<(), TransportError>;
    async fn send(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt, TransportError>;
}

/// What to do when the relay is missing or unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Report success without dispatching; every other side effect still happens.
    #[default]
    Simulate,
    /// Refuse with `EmailError::Unavailable`.
    Fail,
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "simulate" => Ok(FallbackPolicy::Simulate),
            "fail" => Ok(FallbackPolicy::Fail),
            other => Err(format!("unknown email fallback policy '{other}'")),
        }
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackPolicy::Simulate => f.write_str("simulate"),
            FallbackPolicy::Fail => f.write_str("fail"),
        }
    }
}

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("email delivery unavailable: {0}")]
    Unavailable(String),
    #[error("email relay rejected the message ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("failed to render email: {0}")]
    Template(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent { message_id: String },
    Simulated { message_id: String },
}

impl Delivery {
    pub fn is_simulated(&self) -> bool {
        matches!(self, Delivery::Simulated { .. })
    }

    pub fn message_id(&self) -> &str {
        match self {
            Delivery::Sent { message_id } | Delivery::Simulated { message_id } => message_id,
        }
    }
}

/// Sends rendered emails through the configured transport, applying the fallback policy.
#[derive(Clone)]
pub struct EmailDispatcher {
    transport: Option<Arc<dyn EmailTransport>>,
    policy: FallbackPolicy,
}

impl EmailDispatcher {
    pub fn new(transport: Option<Arc<dyn EmailTransport>>, policy: FallbackPolicy) -> Self {
        Self { transport, policy }
    }

    pub async fn deliver(&self, email: &OutgoingEmail) -> Result<Delivery, EmailError> {
        let Some(transport) = &self.transport else {
            return self.fall_back(email, "no email endpoint configured");
        };

        if let Err(err) = transport.health().await {
            return self.fall_back(email, &err.to_string());
        }

        match transport.send(email).await {
            Ok(receipt) => {
                let message_id = receipt
                    .message_id
                    .unwrap_or_else(|| format!("relay-{}", Uuid::new_v4()));
                info!(
                    component = "email",
                    request_id = %email.request_data.id,
                    to = %email.to.email,
                    message_id = %message_id,
                    "request email sent"
                );
                Ok(Delivery::Sent { message_id })
            }
            Err(err) if err.allows_fallback() => self.fall_back(email, &err.to_string()),
            Err(TransportError::Rejected { status, message }) => {
                warn!(
                    component = "email",
                    request_id = %email.request_data.id,
                    status,
                    error = %message,
                    "email relay rejected the message"
                );
                Err(EmailError::Rejected { status, message })
            }
            Err(err) => Err(EmailError::Unavailable(err.to_string())),
        }
    }

    fn fall_back(&self, email: &OutgoingEmail, reason: &str) -> Result<Delivery, EmailError> {
        match self.policy {
            FallbackPolicy::Simulate => {
                let message_id = format!("simulated-{}", Uuid::new_v4());
                warn!(
                    component = "email",
                    request_id = %email.request_data.id,
                    to = %email.to.email,
                    subject = %email.subject,
                    documents = email.request_data.requested_documents.len(),
                    message_id = %message_id,
                    reason,
                    "email endpoint unavailable; simulating delivery"
                );
                Ok(Delivery::Simulated { message_id })
            }
            FallbackPolicy::Fail => {
                warn!(
                    component = "email",
                    request_id = %email.request_data.id,
                    reason,
                    "email endpoint unavailable; refusing to send"
                );
                Err(EmailError::Unavailable(reason.to_string()))
            }
        }
    }
}
