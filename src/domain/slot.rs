use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Largest accepted upload, in bytes (20 MiB).
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub const ALLOWED_CONTENT_TYPES: &[&str] = &["application/pdf", "image/png", "image/jpeg"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("unsupported file type '{0}': use PDF, PNG or JPEG")]
    InvalidFileType(String),
    #[error("file is too large ({size} bytes, maximum {max} bytes)")]
    FileTooLarge { size: usize, max: usize },
}

/// Checks type and size of a file before anything is written anywhere.
pub fn validate_upload(content_type: &str, size: usize) -> Result<(), UploadError> {
    let normalized = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if !ALLOWED_CONTENT_TYPES.contains(&normalized.as_str()) {
        return Err(UploadError::InvalidFileType(content_type.to_string()));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(UploadError::FileTooLarge {
            size,
            max: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}

/// Replaces every character outside `[A-Za-z0-9.-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "document".to_string()
    } else {
        sanitized
    }
}

pub fn storage_path(
    request_id: Uuid,
    slot: &str,
    file_name: &str,
    uploaded_at: DateTime<Utc>,
) -> String {
    format!(
        "requests/{request_id}/docs/{slot}/{}-{}",
        uploaded_at.timestamp_millis(),
        sanitize_file_name(file_name)
    )
}

/// Slot key for a requested document name: lowercase ASCII words joined by `-`.
pub fn slot_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars().flat_map(fold_accent) {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !key.is_empty() {
                key.push('-');
            }
            key.push(ch.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    key
}

fn fold_accent(ch: char) -> Vec<char> {
    match ch {
        'à' | 'â' | 'ä' | 'á' | 'À' | 'Â' | 'Ä' | 'Á' => vec!['a'],
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => vec!['e'],
        'î' | 'ï' | 'í' | 'Î' | 'Ï' | 'Í' => vec!['i'],
        'ô' | 'ö' | 'ó' | 'Ô' | 'Ö' | 'Ó' => vec!['o'],
        'ù' | 'û' | 'ü' | 'ú' | 'Ù' | 'Û' | 'Ü' | 'Ú' => vec!['u'],
        'ç' | 'Ç' => vec!['c'],
        'ñ' | 'Ñ' => vec!['n'],
        'œ' | 'Œ' => vec!['o', 'e'],
        'æ' | 'Æ' => vec!['a', 'e'],
        other => vec![other],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Pending,
    Validating,
    Validated,
    Rejected,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Pending => "pending",
            SlotStatus::Validating => "validating",
            SlotStatus::Validated => "validated",
            SlotStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SlotStatus::Validated | SlotStatus::Rejected)
    }

    /// Only `validating` slots can be reviewed.
    pub fn review(self, decision: &ReviewDecision) -> Result<SlotStatus, TransitionError> {
        let target = match decision {
            ReviewDecision::Validate => SlotStatus::Validated,
            ReviewDecision::Reject { reason } => {
                if reason.trim().is_empty() {
                    return Err(TransitionError::MissingReason);
                }
                SlotStatus::Rejected
            }
        };
        if self != SlotStatus::Validating {
            return Err(TransitionError::Invalid {
                from: self.as_str().to_string(),
                to: target.as_str().to_string(),
            });
        }
        Ok(target)
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(SlotStatus::Pending),
            "validating" => Ok(SlotStatus::Validating),
            "validated" => Ok(SlotStatus::Validated),
            "rejected" => Ok(SlotStatus::Rejected),
            other => Err(format!("unknown slot status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum ReviewDecision {
    Validate,
    Reject { reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot move from '{from}' to '{to}'")]
    Invalid { from: String, to: String },
    #[error("a rejection reason is required")]
    MissingReason,
}

/// The latest upload against one requested document of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSlot {
    pub request_id: Uuid,
    pub slot: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub storage_path: String,
    pub checksum: String,
    pub uploaded_by: Uuid,
    pub uploaded_at: DateTime<Utc>,
    pub status: SlotStatus,
    pub reject_reason: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl DocumentSlot {
    pub fn apply_review(
        &mut self,
        decision: &ReviewDecision,
        reviewer: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.status = self.status.review(decision)?;
        self.reject_reason = match decision {
            ReviewDecision::Validate => None,
            ReviewDecision::Reject { reason } => Some(reason.trim().to_string()),
        };
        self.reviewed_by = Some(reviewer);
        self.reviewed_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_supported_types_within_limit() {
        assert!(validate_upload("application/pdf", 1024).is_ok());
        assert!(validate_upload("image/JPEG", MAX_UPLOAD_BYTES).is_ok());
        assert!(validate_upload("image/png; charset=binary", 10).is_ok());
    }

    #[test]
    fn rejects_unsupported_types() {
        assert_eq!(
            validate_upload("text/plain", 10),
            Err(UploadError::InvalidFileType("text/plain".into()))
        );
    }

    #[test]
    fn rejects_files_over_twenty_mebibytes() {
        let size = 25 * 1024 * 1024;
        assert_eq!(
            validate_upload("application/pdf", size),
            Err(UploadError::FileTooLarge {
                size,
                max: MAX_UPLOAD_BYTES
            })
        );
        assert!(validate_upload("application/pdf", MAX_UPLOAD_BYTES + 1).is_err());
    }

    #[test]
    fn sanitizes_path_unsafe_characters() {
        assert_eq!(sanitize_file_name("fiche de paie (mai).pdf"), "fiche_de_paie__mai_.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
    }

    #[test]
    fn storage_path_is_timestamp_prefixed() {
        let request_id = Uuid::nil();
        let at = DateTime::from_timestamp(1_700_000_000, 0).expect("valid timestamp");
        assert_eq!(
            storage_path(request_id, "rib", "mon rib.pdf", at),
            format!("requests/{request_id}/docs/rib/1700000000000-mon_rib.pdf")
        );
    }

    #[test]
    fn slot_keys_fold_accents_and_punctuation() {
        assert_eq!(slot_key("Pièce d'identité"), "piece-d-identite");
        assert_eq!(slot_key("3 derniers bulletins de salaire"), "3-derniers-bulletins-de-salaire");
        assert_eq!(slot_key("  Relevé d'identité bancaire "), "releve-d-identite-bancaire");
    }

    #[test]
    fn only_validating_slots_can_be_reviewed() {
        assert_eq!(
            SlotStatus::Validating.review(&ReviewDecision::Validate),
            Ok(SlotStatus::Validated)
        );
        assert!(matches!(
            SlotStatus::Validated.review(&ReviewDecision::Validate),
            Err(TransitionError::Invalid { .. })
        ));
        assert!(matches!(
            SlotStatus::Pending.review(&ReviewDecision::Reject {
                reason: "flou".into()
            }),
            Err(TransitionError::Invalid { .. })
        ));
    }

    #[test]
    fn rejection_needs_a_reason() {
        assert_eq!(
            SlotStatus::Validating.review(&ReviewDecision::Reject {
                reason: "  ".into()
            }),
            Err(TransitionError::MissingReason)
        );
    }

    #[test]
    fn review_records_reviewer_and_reason() {
        let reviewer = Uuid::new_v4();
        let now = Utc::now();
        let mut slot = DocumentSlot {
            request_id: Uuid::new_v4(),
            slot: "rib".into(),
            file_name: "rib.pdf".into(),
            file_type: "application/pdf".into(),
            file_size: 10,
            storage_path: "requests/x/docs/rib/1-rib.pdf".into(),
            checksum: String::new(),
            uploaded_by: Uuid::new_v4(),
            uploaded_at: now,
            status: SlotStatus::Validating,
            reject_reason: None,
            reviewed_by: None,
            reviewed_at: None,
        };

        slot.apply_review(
            &ReviewDecision::Reject {
                reason: " Document illisible ".into(),
            },
            reviewer,
            now,
        )
        .expect("validating slot can be rejected");

        assert_eq!(slot.status, SlotStatus::Rejected);
        assert_eq!(slot.reject_reason.as_deref(), Some("Document illisible"));
        assert_eq!(slot.reviewed_by, Some(reviewer));
        assert!(slot.status.is_terminal());
    }
}
