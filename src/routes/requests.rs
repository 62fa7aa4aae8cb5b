use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    domain::{
        document_list::DocumentDefinition,
        request::{DeliveryMode, Request, RequestKind, RequestStatus},
    },
    email::LoginCredentials,
    error::AppResult,
    services::requests::{self, CreateRequestInput, RequestDetail},
    state::AppState,
};

use super::documents::SlotResponse;

#[derive(Serialize)]
pub struct CredentialsSummary {
    pub email: String,
    pub generated_at: DateTime<Utc>,
    pub delivery: DeliveryMode,
}

#[derive(Serialize)]
pub struct RequestResponse {
    pub id: Uuid,
    pub client_id: Uuid,
    pub professional_id: Uuid,
    pub kind: RequestKind,
    pub status: RequestStatus,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub document_list_id: Option<Uuid>,
    pub document_list_name: Option<String>,
    pub ai_enabled: bool,
    pub validation_rules: Option<serde_json::Value>,
    pub requested_documents: Vec<DocumentDefinition>,
    pub documents_count: i32,
    pub pending_documents: i32,
    pub progress: u8,
    pub email_sent: bool,
    pub email_sent_at: Option<DateTime<Utc>>,
    pub client_credentials: Option<CredentialsSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Request> for RequestResponse {
    fn from(request: Request) -> Self {
        let progress = request.progress();
        Self {
            id: request.id,
            client_id: request.client_id,
            professional_id: request.professional_id,
            kind: request.kind,
            status: request.status,
            client_name: request.client_name,
            client_email: request.client_email,
            client_phone: request.client_phone,
            document_list_id: request.document_list_id,
            document_list_name: request.document_list_name,
            ai_enabled: request.ai_enabled,
            validation_rules: request.validation_rules,
            requested_documents: request.requested_documents,
            documents_count: request.documents_count,
            pending_documents: request.pending_documents,
            progress,
            email_sent: request.email_sent,
            email_sent_at: request.email_sent_at,
            client_credentials: request.client_credentials.map(|issued| CredentialsSummary {
                email: issued.email,
                generated_at: issued.generated_at,
                delivery: issued.delivery,
            }),
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct RequestDetailResponse {
    #[serde(flatten)]
    pub request: RequestResponse,
    pub documents: Vec<SlotResponse>,
}

impl From<RequestDetail> for RequestDetailResponse {
    fn from(detail: RequestDetail) -> Self {
        Self {
            request: detail.request.into(),
            documents: detail.slots.into_iter().map(SlotResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
pub struct MyRequestResponse {
    pub request: RequestResponse,
    pub created: bool,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: RequestStatus,
}

#[derive(Deserialize)]
pub struct SendEmailRequest {
    #[serde(default)]
    pub custom_message: Option<String>,
}

#[derive(Serialize)]
pub struct SendEmailResponse {
    pub success: bool,
    pub simulated: bool,
    pub message_id: String,
    pub credentials: LoginCredentials,
}

pub async fn list_requests(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<RequestResponse>>> {
    let requests = requests::list_requests(state.repo(), &user.actor())?;
    Ok(Json(requests.into_iter().map(RequestResponse::from).collect()))
}

pub async fn create_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateRequestInput>,
) -> AppResult<(StatusCode, Json<RequestResponse>)> {
    let request = requests::create_request(state.repo(), &user.actor(), payload)?;
    Ok((StatusCode::CREATED, Json(request.into())))
}

/// The caller's self-service request, created on first access.
pub async fn my_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<(StatusCode, Json<MyRequestResponse>)> {
    let (request, created) = requests::ensure_self_service_request(state.repo(), &user.actor())?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(MyRequestResponse {
            request: request.into(),
            created,
        }),
    ))
}

pub async fn get_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<RequestDetailResponse>> {
    let detail = requests::get_request(state.repo(), &user.actor(), request_id)?;
    Ok(Json(detail.into()))
}

pub async fn set_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<StatusRequest>,
) -> AppResult<Json<RequestResponse>> {
    let request = requests::set_status(state.repo(), &user.actor(), request_id, payload.status)?;
    Ok(Json(request.into()))
}

pub async fn send_email(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(request_id): Path<Uuid>,
    payload: Option<Json<SendEmailRequest>>,
) -> AppResult<Json<SendEmailResponse>> {
    let custom_message = payload.and_then(|Json(body)| body.custom_message);
    let outcome = state
        .notifier
        .send_request_email(
            state.repo(),
            &user.actor(),
            request_id,
            custom_message,
        )
        .await?;
    Ok(Json(SendEmailResponse {
        success: outcome.success,
        simulated: outcome.simulated,
        message_id: outcome.message_id,
        credentials: outcome.credentials,
    }))
}
