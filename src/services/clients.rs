use tracing::info;
use uuid::Uuid;

use crate::domain::{
    client::{Client, ClientDraft, ClientUpdate},
    Actor,
};
use crate::repository::{ClientStore, Repository, RequestStore};

use super::{require_professional, ServiceError, ServiceResult};

pub fn create_client(
    repo: &dyn Repository,
    actor: &Actor,
    draft: ClientDraft,
) -> ServiceResult<Client> {
    require_professional(actor)?;
    let new_client = draft
        .into_new_client(actor.id)
        .map_err(ServiceError::Validation)?;
    let client = repo.create_client(&new_client)?;
    info!(component = "clients", client_id = %client.id, owner = %actor.id, "client created");
    Ok(client)
}

pub fn list_clients(repo: &dyn Repository, actor: &Actor) -> ServiceResult<Vec<Client>> {
    require_professional(actor)?;
    Ok(repo.list_clients_by_owner(actor.id)?)
}

pub fn get_client(repo: &dyn Repository, actor: &Actor, id: Uuid) -> ServiceResult<Client> {
    let client = repo.find_client(id)?.ok_or(ServiceError::NotFound("client"))?;
    if !actor.owns(client.created_by) {
        return Err(ServiceError::forbidden("this client belongs to another account"));
    }
    Ok(client)
}

pub fn update_client(
    repo: &dyn Repository,
    actor: &Actor,
    id: Uuid,
    update: ClientUpdate,
) -> ServiceResult<Client> {
    let current = get_client(repo, actor, id)?;
    let normalized = update
        .normalize(&current)
        .map_err(ServiceError::Validation)?;
    Ok(repo.update_client(id, &normalized)?)
}

/// Recomputes the client's counters from its requests. Identities without a client record
/// are skipped.
pub fn sync_client_counters(repo: &dyn Repository, client_id: Uuid) -> ServiceResult<()> {
    if repo.find_client(client_id)?.is_none() {
        return Ok(());
    }
    let requests = repo.list_requests_by_client(client_id)?;
    let documents: i32 = requests.iter().map(|r| r.documents_count).sum();
    let pending: i32 = requests.iter().map(|r| r.pending_documents).sum();
    repo.set_client_counters(client_id, documents, pending)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        account::Role,
        client::{Address, ClientStatus},
    };
    use crate::repository::MemoryRepository;

    fn draft() -> ClientDraft {
        ClientDraft {
            first_name: "Jean".into(),
            last_name: "Dupont".into(),
            email: "jean@example.com".into(),
            phone: String::new(),
            address: Address::default(),
            notes: String::new(),
        }
    }

    #[test]
    fn only_the_owner_can_read_or_update() {
        let repo = MemoryRepository::new();
        let owner = Actor::new(Uuid::new_v4(), "owner@example.com", Role::Professional);
        let other = Actor::new(Uuid::new_v4(), "other@example.com", Role::Professional);
        let client = create_client(&repo, &owner, draft()).unwrap();

        assert!(get_client(&repo, &owner, client.id).is_ok());
        assert!(matches!(
            get_client(&repo, &other, client.id),
            Err(ServiceError::Forbidden(_))
        ));
        let update = ClientUpdate {
            status: Some(ClientStatus::Inactive),
            ..ClientUpdate::default()
        };
        assert!(matches!(
            update_client(&repo, &other, client.id, update.clone()),
            Err(ServiceError::Forbidden(_))
        ));
        let updated = update_client(&repo, &owner, client.id, update).unwrap();
        assert_eq!(updated.status, ClientStatus::Inactive);
    }

    #[test]
    fn clients_cannot_create_clients() {
        let repo = MemoryRepository::new();
        let client_actor = Actor::new(Uuid::new_v4(), "c@example.com", Role::Client);
        assert!(matches!(
            create_client(&repo, &client_actor, draft()),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn listing_is_scoped_to_owner() {
        let repo = MemoryRepository::new();
        let owner = Actor::new(Uuid::new_v4(), "owner@example.com", Role::Professional);
        let other = Actor::new(Uuid::new_v4(), "other@example.com", Role::Professional);
        create_client(&repo, &owner, draft()).unwrap();
        create_client(&repo, &other, draft()).unwrap();
        assert_eq!(list_clients(&repo, &owner).unwrap().len(), 1);
    }
}
