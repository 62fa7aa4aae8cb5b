use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document_list::DocumentDefinition;
use super::slot::{slot_key, DocumentSlot, SlotStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    /// Closed requests stay closed; re-applying the current status is a no-op.
    pub fn can_become(&self, next: RequestStatus) -> bool {
        *self == next || *self == RequestStatus::Pending
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(RequestStatus::Pending),
            "completed" => Ok(RequestStatus::Completed),
            "cancelled" => Ok(RequestStatus::Cancelled),
            other => Err(format!("unknown request status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    #[default]
    DocumentRequest,
    SelfService,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::DocumentRequest => "document_request",
            RequestKind::SelfService => "self_service",
        }
    }
}

impl FromStr for RequestKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "document_request" => Ok(RequestKind::DocumentRequest),
            "self_service" => Ok(RequestKind::SelfService),
            other => Err(format!("unknown request kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    Sent,
    Simulated,
}

/// Record of the one-time credentials issued for a request. Only the hash is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedCredentials {
    pub email: String,
    pub password_hash: String,
    pub generated_at: DateTime<Utc>,
    pub delivery: DeliveryMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: Uuid,
    pub client_id: Uuid,
    pub professional_id: Uuid,
    pub created_by: Uuid,
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
    pub email_sent: bool,
    pub email_sent_at: Option<DateTime<Utc>>,
    pub client_credentials: Option<IssuedCredentials>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Request {
    pub fn progress(&self) -> u8 {
        progress(self.documents_count, self.pending_documents)
    }

    /// Requested document whose slug matches `slot`.
    pub fn requested_slot(&self, slot: &str) -> Option<&DocumentDefinition> {
        self.requested_documents
            .iter()
            .find(|document| slot_key(&document.name) == slot)
    }

    pub fn slot_keys(&self) -> Vec<String> {
        self.requested_documents
            .iter()
            .map(|document| slot_key(&document.name))
            .collect()
    }

    /// Access for the uploading side: the client the request targets.
    pub fn is_client(&self, identity: Uuid) -> bool {
        self.client_id == identity
    }
}

/// Completion percentage. Zero when nothing is requested.
pub fn progress(documents_count: i32, pending_documents: i32) -> u8 {
    if documents_count <= 0 {
        return 0;
    }
    let done = f64::from(documents_count - pending_documents);
    let percent = (done / f64::from(documents_count) * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Outstanding documents given the current slots. Rejected slots count as pending.
pub fn pending_documents(request: &Request, slots: &[DocumentSlot]) -> i32 {
    let keys = request.slot_keys();
    let validated = slots
        .iter()
        .filter(|slot| slot.request_id == request.id)
        .filter(|slot| slot.status == SlotStatus::Validated)
        .filter(|slot| keys.contains(&slot.slot))
        .count() as i32;
    (request.documents_count - validated).max(0)
}

/// Documents seeded into a client's self-service request.
pub fn self_service_documents() -> Vec<DocumentDefinition> {
    vec![
        DocumentDefinition::new(
            "Pièce d'identité",
            Some("Carte d'identité, passeport ou titre de séjour en cours de validité"),
            true,
        ),
        DocumentDefinition::new(
            "Justificatif de domicile",
            Some("Facture d'électricité, de gaz ou quittance de loyer de moins de 3 mois"),
            true,
        ),
        DocumentDefinition::new(
            "Justificatifs de revenus",
            Some("3 derniers bulletins de salaire ou bilan comptable pour les indépendants"),
            true,
        ),
    ]
}

#[derive(Debug, Clone)]
pub struct NewRequest {
    pub id: Uuid,
    pub client_id: Uuid,
    pub professional_id: Uuid,
    pub created_by: Uuid,
    pub kind: RequestKind,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub document_list_id: Option<Uuid>,
    pub document_list_name: Option<String>,
    pub ai_enabled: bool,
    pub validation_rules: Option<serde_json::Value>,
    pub requested_documents: Vec<DocumentDefinition>,
}

impl NewRequest {
    pub fn documents_count(&self) -> i32 {
        self.requested_documents.len() as i32
    }

    pub fn self_service(identity: Uuid, owner: Uuid, email: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id: identity,
            professional_id: owner,
            created_by: identity,
            kind: RequestKind::SelfService,
            client_name: email.to_string(),
            client_email: email.to_string(),
            client_phone: String::new(),
            document_list_id: None,
            document_list_name: None,
            ai_enabled: false,
            validation_rules: None,
            requested_documents: self_service_documents(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(documents: &[&str]) -> Request {
        let now = Utc::now();
        let requested: Vec<DocumentDefinition> = documents
            .iter()
            .map(|name| DocumentDefinition::new(name, None, true))
            .collect();
        Request {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            professional_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            kind: RequestKind::DocumentRequest,
            status: RequestStatus::Pending,
            client_name: "Jean Dupont".into(),
            client_email: "jean@example.com".into(),
            client_phone: String::new(),
            document_list_id: None,
            document_list_name: None,
            ai_enabled: false,
            validation_rules: None,
            documents_count: requested.len() as i32,
            pending_documents: requested.len() as i32,
            requested_documents: requested,
            email_sent: false,
            email_sent_at: None,
            client_credentials: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn slot(request: &Request, key: &str, status: SlotStatus) -> DocumentSlot {
        DocumentSlot {
            request_id: request.id,
            slot: key.into(),
            file_name: "file.pdf".into(),
            file_type: "application/pdf".into(),
            file_size: 1,
            storage_path: String::new(),
            checksum: String::new(),
            uploaded_by: request.client_id,
            uploaded_at: Utc::now(),
            status,
            reject_reason: None,
            reviewed_by: None,
            reviewed_at: None,
        }
    }

    #[test]
    fn progress_bounds() {
        assert_eq!(progress(0, 0), 0);
        assert_eq!(progress(0, 3), 0);
        assert_eq!(progress(4, 4), 0);
        assert_eq!(progress(4, 0), 100);
        assert_eq!(progress(3, 2), 33);
        assert_eq!(progress(3, 1), 67);
        assert_eq!(progress(2, 5), 0);
        assert_eq!(progress(2, -1), 100);
    }

    #[test]
    fn one_validated_out_of_five_is_twenty_percent() {
        let mut request = request_with(&["A", "B", "C", "D", "E"]);
        let slots = vec![
            slot(&request, "a", SlotStatus::Validated),
            slot(&request, "b", SlotStatus::Validating),
            slot(&request, "c", SlotStatus::Rejected),
        ];
        request.pending_documents = pending_documents(&request, &slots);
        assert_eq!(request.pending_documents, 4);
        assert_eq!(request.progress(), 20);
    }

    #[test]
    fn slots_outside_the_request_do_not_count() {
        let request = request_with(&["Pièce d'identité"]);
        let slots = vec![slot(&request, "bulletin", SlotStatus::Validated)];
        assert_eq!(pending_documents(&request, &slots), 1);
    }

    #[test]
    fn requested_slot_matches_slug() {
        let request = request_with(&["Pièce d'identité", "RIB"]);
        assert!(request.requested_slot("piece-d-identite").is_some());
        assert!(request.requested_slot("rib").is_some());
        assert!(request.requested_slot("passport").is_none());
    }

    #[test]
    fn closed_requests_do_not_reopen() {
        assert!(RequestStatus::Pending.can_become(RequestStatus::Completed));
        assert!(RequestStatus::Completed.can_become(RequestStatus::Completed));
        assert!(!RequestStatus::Cancelled.can_become(RequestStatus::Pending));
        assert!(!RequestStatus::Completed.can_become(RequestStatus::Cancelled));
    }

    #[test]
    fn self_service_request_seeds_three_documents() {
        let identity = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let request = NewRequest::self_service(identity, owner, "client@example.com");
        assert_eq!(request.kind, RequestKind::SelfService);
        assert_eq!(request.professional_id, owner);
        assert_eq!(request.created_by, identity);
        assert_eq!(request.documents_count(), 3);
    }
}
