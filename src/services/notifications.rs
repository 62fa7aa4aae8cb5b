use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::domain::{
    account::NewClientAccount,
    request::{DeliveryMode, IssuedCredentials, Request},
    Actor,
};
use crate::email::{
    credentials::generate_password, EmailDispatcher, EmailRenderer, LoginCredentials,
    OutgoingEmail, Recipient, RequestSummary,
};
use crate::repository::{Repository, RequestStore, UserStore};

use super::requests::owned_request;
use super::{ServiceError, ServiceResult};

/// Result of a request email. `credentials` is the only place the password ever appears.
#[derive(Debug, Clone)]
pub struct EmailOutcome {
    pub success: bool,
    pub simulated: bool,
    pub message_id: String,
    pub credentials: LoginCredentials,
}

#[derive(Clone)]
pub struct Notifier {
    dispatcher: EmailDispatcher,
    renderer: EmailRenderer,
}

fn summary(request: &Request) -> RequestSummary {
    RequestSummary {
        id: request.id,
        client_name: request.client_name.clone(),
        client_email: request.client_email.clone(),
        document_list_name: request.document_list_name.clone(),
        requested_documents: request.requested_documents.clone(),
    }
}

impl Notifier {
    pub fn new(dispatcher: EmailDispatcher, renderer: EmailRenderer) -> Self {
        Self {
            dispatcher,
            renderer,
        }
    }

    /// Issues one-time client credentials and emails them with the list of requested
    /// documents. Nothing is persisted unless delivery succeeds or is simulated.
    pub async fn send_request_email(
        &self,
        repo: &dyn Repository,
        actor: &Actor,
        request_id: Uuid,
        custom_message: Option<String>,
    ) -> ServiceResult<EmailOutcome> {
        let request = owned_request(repo, actor, request_id)?;
        if request.email_sent {
            return Err(ServiceError::EmailAlreadySent);
        }

        let credentials = LoginCredentials {
            email: request.client_email.clone(),
            password: generate_password(),
        };
        let custom_message = custom_message
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty());
        let request_data = summary(&request);
        let rendered =
            self.renderer
                .render(&request_data, &credentials, custom_message.as_deref())?;

        let email = OutgoingEmail {
            to: Recipient {
                email: request.client_email.clone(),
                name: request.client_name.clone(),
            },
            subject: rendered.subject,
            html: rendered.html,
            text: rendered.text,
            credentials: credentials.clone(),
            request_data,
            custom_message,
        };
        let delivery = self.dispatcher.deliver(&email).await?;

        let generated_at = Utc::now();
        let password_hash = hash_password(&credentials.password)
            .map_err(|err| ServiceError::Internal(err.to_string()))?;

        let issued = IssuedCredentials {
            email: credentials.email.clone(),
            password_hash: password_hash.clone(),
            generated_at,
            delivery: if delivery.is_simulated() {
                DeliveryMode::Simulated
            } else {
                DeliveryMode::Sent
            },
        };
        // The flag decides which concurrent send owns the credentials.
        if !repo.mark_email_sent(request.id, &issued, generated_at)? {
            warn!(
                component = "notifications",
                request_id = %request.id,
                simulated = delivery.is_simulated(),
                message_id = %delivery.message_id(),
                "request email already sent by a concurrent call; these credentials were delivered but not stored"
            );
            return Err(ServiceError::EmailAlreadySent);
        }

        let account = NewClientAccount {
            id: request.client_id,
            email: credentials.email.to_lowercase(),
            password_hash,
            request_id: request.id,
            client_name: request.client_name.clone(),
            generated_at,
        };
        if let Err(err) = repo.upsert_client_account(&account) {
            warn!(
                component = "notifications",
                request_id = %request.id,
                client_id = %request.client_id,
                error = %err,
                "failed to store client credentials"
            );
        }

        info!(
            component = "notifications",
            request_id = %request.id,
            simulated = delivery.is_simulated(),
            message_id = %delivery.message_id(),
            "request email processed"
        );
        Ok(EmailOutcome {
            success: true,
            simulated: delivery.is_simulated(),
            message_id: delivery.message_id().to_string(),
            credentials,
        })
    }
}
