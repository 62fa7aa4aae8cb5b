use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use super::{MailError, MailMessage, RelayState, SERVICE_NAME};

const MIN_TOKEN_LENGTH: usize = 10;

#[derive(Debug)]
pub struct RelayError {
    status: StatusCode,
    message: String,
    code: &'static str,
}

impl RelayError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code,
        }
    }

    fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }
}

impl From<MailError> for RelayError {
    fn from(value: MailError) -> Self {
        match value {
            MailError::Invalid(message) => RelayError::validation(message),
            MailError::Auth(_) => RelayError::new(
                StatusCode::UNAUTHORIZED,
                "EAUTH",
                "Erreur d'authentification SMTP",
            ),
            MailError::Connection(_) => RelayError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "ECONNECTION",
                "Impossible de se connecter au serveur SMTP",
            ),
            MailError::Other(_) => RelayError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "ESEND",
                "Erreur lors de l'envoi de l'email",
            ),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "code": self.code,
            "timestamp": Utc::now().to_rfc3339(),
        }));
        (self.status, body).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RelayRecipient {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RelayCredentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Body of `POST /send-email`. Every field is optional so that missing ones produce a
/// validation error rather than a deserialization failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailBody {
    pub to: Option<RelayRecipient>,
    pub subject: Option<String>,
    pub html: Option<String>,
    pub text: Option<String>,
    pub credentials: Option<RelayCredentials>,
    #[serde(default)]
    pub request_data: Option<serde_json::Value>,
    #[serde(default)]
    pub custom_message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    pub success: bool,
    pub message_id: String,
    pub timestamp: String,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl SendEmailBody {
    fn into_message(self) -> Result<MailMessage, RelayError> {
        let to = self.to.unwrap_or_default();
        let (Some(to_email), Some(to_name)) = (present(&to.email), present(&to.name)) else {
            return Err(RelayError::validation(
                "Destinataire manquant (email et nom requis)",
            ));
        };
        let (Some(subject), Some(html)) = (present(&self.subject), present(&self.html)) else {
            return Err(RelayError::validation("Sujet et contenu HTML requis"));
        };
        let credentials = self.credentials.unwrap_or_default();
        if present(&credentials.email).is_none() || present(&credentials.password).is_none() {
            return Err(RelayError::validation("Identifiants client manquants"));
        }

        Ok(MailMessage {
            to_email: to_email.to_string(),
            to_name: to_name.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
            text: self.text,
        })
    }
}

fn authorize(state: &RelayState, headers: &HeaderMap) -> Result<(), RelayError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| RelayError::unauthorized("Token d'authentification requis"))?;

    if token.len() < MIN_TOKEN_LENGTH {
        return Err(RelayError::unauthorized("Token invalide"));
    }
    if let Some(expected) = &state.config.api_key {
        if token != expected {
            return Err(RelayError::unauthorized("Token invalide"));
        }
    }
    Ok(())
}

fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn send_email(
    State(state): State<RelayState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Json<SendEmailBody>, JsonRejection>,
) -> Result<Json<SendEmailResponse>, RelayError> {
    let client = client_key(&headers, peer.map(|ConnectInfo(addr)| addr));
    if let Err(retry_after) = state.limiter.check(&client, Instant::now()) {
        warn!(component = "relay", client = %client, "send rate limit exceeded");
        return Err(RelayError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMITED",
            format!(
                "Trop d'emails envoyés, veuillez réessayer dans {} secondes.",
                retry_after.as_secs()
            ),
        ));
    }
    authorize(&state, &headers)?;

    let Json(body) = body.map_err(|err| RelayError::validation(err.body_text()))?;
    let message = body.into_message()?;

    match state.mailer.send(&message).await {
        Ok(message_id) => {
            info!(
                component = "relay",
                to = %message.to_email,
                message_id = %message_id,
                "email sent"
            );
            Ok(Json(SendEmailResponse {
                success: true,
                message_id,
                timestamp: Utc::now().to_rfc3339(),
            }))
        }
        Err(err) => {
            error!(component = "relay", to = %message.to_email, error = %err, "email send failed");
            Err(err.into())
        }
    }
}

pub async fn test_email(
    State(state): State<RelayState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, RelayError> {
    authorize(&state, &headers)?;
    match state.mailer.verify().await {
        Ok(()) => Ok(Json(json!({
            "success": true,
            "message": "Configuration SMTP valide",
        }))),
        Err(err) => {
            warn!(component = "relay", error = %err, "SMTP verification failed");
            let mut relay_error = RelayError::from(err);
            if relay_error.status == StatusCode::INTERNAL_SERVER_ERROR {
                relay_error.message = "Configuration SMTP invalide".to_string();
            }
            Err(relay_error)
        }
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
    }))
}

pub async fn not_found(uri: Uri) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Route non trouvée",
            "path": uri.path(),
        })),
    )
}
