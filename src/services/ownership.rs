use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::domain::{ownership::OwnedCollection, Actor};
use crate::repository::{OwnershipStore, Repository};

use super::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub clients_fixed: usize,
    pub lists_fixed: usize,
}

/// Assigns the actor as owner of every client and document list that has none. Admin only;
/// each non-empty batch is audited by the store.
pub fn repair_ownership(repo: &dyn Repository, actor: &Actor) -> ServiceResult<RepairReport> {
    if !actor.is_admin() {
        return Err(ServiceError::forbidden(
            "ownership repair is restricted to administrators",
        ));
    }

    let at = Utc::now();
    let fixed = |collection: OwnedCollection| -> ServiceResult<usize> {
        let ids = repo.repair_owners(collection, actor.id, at)?;
        info!(
            component = "ownership",
            collection = collection.as_str(),
            actor = %actor.id,
            fixed = ids.len(),
            "ownership repair batch"
        );
        Ok(ids.len())
    };

    Ok(RepairReport {
        clients_fixed: fixed(OwnedCollection::Clients)?,
        lists_fixed: fixed(OwnedCollection::DocumentLists)?,
    })
}
