use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    domain::slot::{DocumentSlot, ReviewDecision, SlotStatus},
    error::{AppError, AppResult},
    services::uploads::{self, UploadedFile},
    state::AppState,
};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Serialize)]
pub struct SlotResponse {
    pub slot: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub checksum: String,
    pub status: SlotStatus,
    pub reject_reason: Option<String>,
    pub uploaded_by: Uuid,
    pub uploaded_at: DateTime<Utc>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl From<DocumentSlot> for SlotResponse {
    fn from(slot: DocumentSlot) -> Self {
        Self {
            slot: slot.slot,
            file_name: slot.file_name,
            file_type: slot.file_type,
            file_size: slot.file_size,
            checksum: slot.checksum,
            status: slot.status,
            reject_reason: slot.reject_reason,
            uploaded_by: slot.uploaded_by,
            uploaded_at: slot.uploaded_at,
            reviewed_by: slot.reviewed_by,
            reviewed_at: slot.reviewed_at,
        }
    }
}

#[derive(Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Serialize)]
pub struct DownloadResponse {
    pub url: String,
    pub expires_in: u64,
}

pub async fn list_documents(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<Vec<SlotResponse>>> {
    let slots = uploads::list_slots(state.repo(), &user.actor(), request_id)?;
    Ok(Json(slots.into_iter().map(SlotResponse::from).collect()))
}

/// Keeps axum's status for the failure, so an oversized body stays a 413.
fn multipart_failure(err: MultipartError, context: &str) -> AppError {
    let status = err.status();
    error!(error = %err, %status, "{context}");
    AppError::new(status, format!("{context}: {err}"))
}

pub async fn upload_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((request_id, slot)): Path<(Uuid, String)>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<SlotResponse>)> {
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_failure(err, "invalid multipart data"))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(|n| n.to_string());
        let content_type = field
            .content_type()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|err| multipart_failure(err, "failed to read file bytes"))?;
        let file_name = file_name.ok_or_else(|| {
            error!("upload rejected: missing original filename");
            AppError::bad_request("filename is required")
        })?;
        file = Some(UploadedFile {
            file_name,
            content_type,
            bytes: data.to_vec(),
        });
    }

    let file = file.ok_or_else(|| {
        error!("upload rejected: missing file field");
        AppError::bad_request("file field is required")
    })?;
    if file.bytes.is_empty() {
        error!("upload rejected: empty file payload");
        return Err(AppError::bad_request("file field must not be empty"));
    }
    let file_name = file.file_name.clone();

    let saved = uploads::upload_document(
        state.repo(),
        state.storage.as_ref(),
        &user.actor(),
        request_id,
        &slot,
        file,
    )
    .await
    .map_err(|err| {
        error!(error = %err, request_id = %request_id, slot = %slot, file_name = %file_name, "document upload failed");
        AppError::from(err)
    })?;

    info!(request_id = %request_id, slot = %slot, "document upload succeeded");
    Ok((StatusCode::CREATED, Json(saved.into())))
}

pub async fn validate_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((request_id, slot)): Path<(Uuid, String)>,
) -> AppResult<Json<SlotResponse>> {
    let saved = uploads::review_document(
        state.repo(),
        &user.actor(),
        request_id,
        &slot,
        ReviewDecision::Validate,
    )?;
    Ok(Json(saved.into()))
}

pub async fn reject_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((request_id, slot)): Path<(Uuid, String)>,
    Json(payload): Json<RejectRequest>,
) -> AppResult<Json<SlotResponse>> {
    let saved = uploads::review_document(
        state.repo(),
        &user.actor(),
        request_id,
        &slot,
        ReviewDecision::Reject {
            reason: payload.reason,
        },
    )?;
    Ok(Json(saved.into()))
}

pub async fn download_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((request_id, slot)): Path<(Uuid, String)>,
) -> AppResult<Json<DownloadResponse>> {
    let link = uploads::download_url(
        state.repo(),
        state.storage.as_ref(),
        &user.actor(),
        request_id,
        &slot,
        state.config.storage.download_url_ttl,
    )
    .await?;
    Ok(Json(DownloadResponse {
        url: link.url,
        expires_in: link.expires_in.as_secs(),
    }))
}
