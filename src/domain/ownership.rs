use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Collections whose records carry a `created_by` owner field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnedCollection {
    Clients,
    DocumentLists,
}

impl OwnedCollection {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnedCollection::Clients => "clients",
            OwnedCollection::DocumentLists => "document_lists",
        }
    }
}

impl std::str::FromStr for OwnedCollection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "clients" => Ok(OwnedCollection::Clients),
            "document_lists" => Ok(OwnedCollection::DocumentLists),
            other => Err(format!("unknown collection '{other}'")),
        }
    }
}

/// Audit entry for one backfill batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnershipRepair {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub collection: OwnedCollection,
    pub record_ids: Vec<Uuid>,
    pub fixed_count: i32,
    pub performed_at: DateTime<Utc>,
}
