use std::time::Duration;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    slot::{storage_path, validate_upload, DocumentSlot, ReviewDecision, SlotStatus},
    Actor,
};
use crate::repository::{Repository, SlotStore};
use crate::storage::{attachment_disposition, ObjectStorage};

use super::requests::{owned_request, recompute_counters, visible_request};
use super::{ServiceError, ServiceResult};

/// A file as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct DownloadLink {
    pub url: String,
    pub expires_in: Duration,
}

/// Stores a file against one requested document and puts the slot under review.
pub async fn upload_document(
    repo: &dyn Repository,
    storage: &dyn ObjectStorage,
    actor: &Actor,
    request_id: Uuid,
    slot: &str,
    file: UploadedFile,
) -> ServiceResult<DocumentSlot> {
    validate_upload(&file.content_type, file.bytes.len())?;

    let request = visible_request(repo, actor, request_id)?;
    if request.requested_slot(slot).is_none() {
        return Err(ServiceError::NotFound("document slot"));
    }
    let previous = repo.find_slot(request_id, slot)?;

    let uploaded_at = Utc::now();
    let key = storage_path(request_id, slot, &file.file_name, uploaded_at);
    let checksum = hex::encode(Sha256::digest(&file.bytes));
    let file_size = file.bytes.len() as i64;

    storage
        .put_object(
            &key,
            file.bytes,
            Some(file.content_type.clone()),
            Some(attachment_disposition(&file.file_name)),
        )
        .await
        .map_err(|err| {
            error!(error = %err, key = %key, "failed to store document");
            ServiceError::Storage(err.to_string())
        })?;

    let record = DocumentSlot {
        request_id,
        slot: slot.to_string(),
        file_name: file.file_name,
        file_type: file.content_type,
        file_size,
        storage_path: key.clone(),
        checksum,
        uploaded_by: actor.id,
        uploaded_at,
        status: SlotStatus::Validating,
        reject_reason: None,
        reviewed_by: None,
        reviewed_at: None,
    };

    let saved = match repo.upsert_slot(&record) {
        Ok(saved) => saved,
        Err(err) => {
            if let Err(cleanup) = storage.delete_object(&key).await {
                error!(
                    error = %cleanup,
                    key = %key,
                    "orphaned object left in storage after failed slot write"
                );
            }
            return Err(err.into());
        }
    };

    if let Some(previous) = previous.filter(|previous| previous.storage_path != key) {
        if let Err(err) = storage.delete_object(&previous.storage_path).await {
            warn!(
                error = %err,
                key = %previous.storage_path,
                "failed to delete replaced document"
            );
        }
    }

    recompute_counters(repo, request_id)?;

    info!(
        component = "uploads",
        request_id = %request_id,
        slot = %slot,
        size = file_size,
        checksum = %saved.checksum,
        "document uploaded"
    );
    Ok(saved)
}

pub fn list_slots(
    repo: &dyn Repository,
    actor: &Actor,
    request_id: Uuid,
) -> ServiceResult<Vec<DocumentSlot>> {
    visible_request(repo, actor, request_id)?;
    Ok(repo.list_slots(request_id)?)
}

/// Validates or rejects the document currently in a slot. Owner only.
pub fn review_document(
    repo: &dyn Repository,
    actor: &Actor,
    request_id: Uuid,
    slot: &str,
    decision: ReviewDecision,
) -> ServiceResult<DocumentSlot> {
    owned_request(repo, actor, request_id)?;
    let mut record = repo
        .find_slot(request_id, slot)?
        .ok_or(ServiceError::NotFound("document"))?;

    record.apply_review(&decision, actor.id, Utc::now())?;
    let saved = repo.save_review(&record)?.ok_or_else(|| {
        ServiceError::Conflict("document was replaced while under review".to_string())
    })?;
    recompute_counters(repo, request_id)?;

    info!(
        component = "uploads",
        request_id = %request_id,
        slot = %slot,
        status = %saved.status,
        reviewer = %actor.id,
        "document reviewed"
    );
    Ok(saved)
}

pub async fn download_url(
    repo: &dyn Repository,
    storage: &dyn ObjectStorage,
    actor: &Actor,
    request_id: Uuid,
    slot: &str,
    ttl: Duration,
) -> ServiceResult<DownloadLink> {
    visible_request(repo, actor, request_id)?;
    let record = repo
        .find_slot(request_id, slot)?
        .ok_or(ServiceError::NotFound("document"))?;
    let url = storage
        .presign_get_object(&record.storage_path, ttl)
        .await
        .map_err(|err| ServiceError::Storage(err.to_string()))?;
    Ok(DownloadLink {
        url,
        expires_in: ttl,
    })
}
