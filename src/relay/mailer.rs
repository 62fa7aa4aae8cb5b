use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use super::config::{RelayConfig, SmtpTls};

const DEFAULT_TEXT_BODY: &str = "Version texte non disponible";

/// A validated message ready for SMTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub html: String,
    pub text: Option<String>,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid message: {0}")]
    Invalid(String),
    #[error("SMTP authentication failed: {0}")]
    Auth(String),
    #[error("SMTP server unreachable: {0}")]
    Connection(String),
    #[error("SMTP error: {0}")]
    Other(String),
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn verify(&self) -> Result<(), MailError>;
    /// Returns the SMTP message id.
    async fn send(&self, message: &MailMessage) -> Result<String, MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &RelayConfig) -> Result<Self> {
        let builder = match config.smtp_tls {
            SmtpTls::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .context("failed to configure STARTTLS transport")?,
            SmtpTls::Wrapper => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .context("failed to configure TLS transport")?,
            SmtpTls::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host),
        }
        .port(config.smtp_port);

        let builder = if let (Some(user), Some(password)) = (&config.smtp_user, &config.smtp_password)
        {
            builder.credentials(Credentials::new(user.clone(), password.clone()))
        } else {
            builder
        };

        let address: Address = config
            .from_email
            .parse()
            .context("SMTP_FROM_EMAIL must be an email address")?;

        Ok(Self {
            transport: builder.build(),
            from: Mailbox::new(Some(config.from_name.clone()), address),
        })
    }

    fn build(&self, message: &MailMessage) -> Result<Message, MailError> {
        let address: Address = message
            .to_email
            .parse()
            .map_err(|_| MailError::Invalid("Adresse email du destinataire invalide".into()))?;
        let to = Mailbox::new(Some(message.to_name.clone()), address);
        let text = message
            .text
            .clone()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TEXT_BODY.to_string());

        Message::builder()
            .from(self.from.clone())
            .reply_to(self.from.clone())
            .to(to)
            .subject(message.subject.clone())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(message.html.clone()),
                    ),
            )
            .map_err(|err| MailError::Invalid(err.to_string()))
    }
}

fn classify(err: lettre::transport::smtp::Error) -> MailError {
    let message = err.to_string();
    let auth_failure = err
        .status()
        .map(|code| code.to_string().starts_with("53"))
        .unwrap_or(false);
    if auth_failure {
        MailError::Auth(message)
    } else if err.is_permanent() || err.is_client() || err.is_response() {
        MailError::Other(message)
    } else {
        MailError::Connection(message)
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn verify(&self) -> Result<(), MailError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MailError::Connection("SMTP server did not answer".into())),
            Err(err) => Err(classify(err)),
        }
    }

    async fn send(&self, message: &MailMessage) -> Result<String, MailError> {
        let email = self.build(message)?;
        let response = self.transport.send(email).await.map_err(classify)?;
        let message_id = response
            .message()
            .next()
            .map(str::to_string)
            .unwrap_or_else(|| response.code().to_string());
        Ok(message_id)
    }
}
