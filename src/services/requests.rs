use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    account::Role,
    document_list::{normalize_documents, DocumentDefinition},
    request::{pending_documents, NewRequest, Request, RequestKind, RequestStatus},
    slot::DocumentSlot,
    Actor,
};
use crate::repository::{
    ClientStore, DocumentListStore, Repository, RepositoryError, RequestStore, SlotStore,
};

use super::{clients, document_lists, require_professional, ServiceError, ServiceResult};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRequestInput {
    pub client_id: Uuid,
    #[serde(default)]
    pub documents: Option<Vec<DocumentDefinition>>,
    #[serde(default)]
    pub document_list_id: Option<Uuid>,
    #[serde(default)]
    pub ai_enabled: bool,
    #[serde(default)]
    pub validation_rules: Option<serde_json::Value>,
}

/// A request together with its uploaded slots.
#[derive(Debug, Clone)]
pub struct RequestDetail {
    pub request: Request,
    pub slots: Vec<DocumentSlot>,
}

pub fn create_request(
    repo: &dyn Repository,
    actor: &Actor,
    input: CreateRequestInput,
) -> ServiceResult<Request> {
    require_professional(actor)?;
    let client = clients::get_client(repo, actor, input.client_id)?;

    let template = match input.document_list_id {
        Some(id) => Some(document_lists::get_list(repo, actor, id)?),
        None => None,
    };
    let explicit = input.documents.filter(|documents| !documents.is_empty());

    let (documents, seeded_from_template) = match (explicit, &template) {
        (Some(documents), _) => (documents, false),
        (None, Some(list)) => (list.documents.clone(), true),
        (None, None) => {
            return Err(ServiceError::Validation(
                "select a document list or at least one document".to_string(),
            ))
        }
    };
    let documents = normalize_documents(documents).map_err(ServiceError::Validation)?;

    let new_request = NewRequest {
        id: Uuid::new_v4(),
        client_id: client.id,
        professional_id: actor.id,
        created_by: actor.id,
        kind: RequestKind::DocumentRequest,
        client_name: client.full_name.clone(),
        client_email: client.email.clone(),
        client_phone: client.phone.clone(),
        document_list_id: template.as_ref().map(|list| list.id),
        document_list_name: template.as_ref().map(|list| list.name.clone()),
        ai_enabled: input.ai_enabled,
        validation_rules: input.validation_rules,
        requested_documents: documents,
    };
    let request = repo.create_request(&new_request)?;

    if seeded_from_template {
        if let Some(list) = &template {
            repo.increment_list_usage(list.id)?;
        }
    }
    clients::sync_client_counters(repo, client.id)?;

    info!(
        component = "requests",
        request_id = %request.id,
        client_id = %client.id,
        documents = request.documents_count,
        "document request created"
    );
    Ok(request)
}

pub fn list_requests(repo: &dyn Repository, actor: &Actor) -> ServiceResult<Vec<Request>> {
    let requests = match actor.role {
        Role::Client => repo.list_requests_by_client(actor.id)?,
        Role::Professional | Role::Admin => repo.list_requests_by_professional(actor.id)?,
    };
    Ok(requests)
}

pub(crate) fn find_request(repo: &dyn Repository, id: Uuid) -> ServiceResult<Request> {
    repo.find_request(id)?.ok_or(ServiceError::NotFound("request"))
}

/// Owner or admin.
pub(crate) fn owned_request(
    repo: &dyn Repository,
    actor: &Actor,
    id: Uuid,
) -> ServiceResult<Request> {
    let request = find_request(repo, id)?;
    if !actor.owns(Some(request.professional_id)) {
        return Err(ServiceError::forbidden("this request belongs to another account"));
    }
    Ok(request)
}

/// Owner, admin, or the client the request targets.
pub(crate) fn visible_request(
    repo: &dyn Repository,
    actor: &Actor,
    id: Uuid,
) -> ServiceResult<Request> {
    let request = find_request(repo, id)?;
    if !actor.owns(Some(request.professional_id)) && !request.is_client(actor.id) {
        return Err(ServiceError::forbidden("this request belongs to another account"));
    }
    Ok(request)
}

pub fn get_request(repo: &dyn Repository, actor: &Actor, id: Uuid) -> ServiceResult<RequestDetail> {
    let request = visible_request(repo, actor, id)?;
    let slots = repo.list_slots(request.id)?;
    Ok(RequestDetail { request, slots })
}

pub fn set_status(
    repo: &dyn Repository,
    actor: &Actor,
    id: Uuid,
    status: RequestStatus,
) -> ServiceResult<Request> {
    let request = owned_request(repo, actor, id)?;
    if !request.status.can_become(status) {
        return Err(ServiceError::Conflict(format!(
            "request is {} and cannot become {status}",
            request.status
        )));
    }
    let updated = repo.set_request_status(id, status)?;
    info!(
        component = "requests",
        request_id = %id,
        from = %request.status,
        to = %status,
        "request status changed"
    );
    Ok(updated)
}

/// Returns the caller's self-service request, creating it on first use. The boolean is true
/// when this call created it.
pub fn ensure_self_service_request(
    repo: &dyn Repository,
    actor: &Actor,
) -> ServiceResult<(Request, bool)> {
    if actor.role != Role::Client {
        return Err(ServiceError::forbidden(
            "self-service requests are for client accounts",
        ));
    }
    if let Some(existing) = repo.find_self_service_request(actor.id)? {
        return Ok((existing, false));
    }

    let owner = repo
        .find_client(actor.id)?
        .and_then(|client| client.created_by)
        .unwrap_or(actor.id);

    match repo.create_request(&NewRequest::self_service(actor.id, owner, &actor.username)) {
        Ok(request) => {
            info!(
                component = "requests",
                request_id = %request.id,
                client_id = %actor.id,
                owner = %owner,
                "self-service request created"
            );
            Ok((request, true))
        }
        Err(RepositoryError::ConstraintViolation(_)) => {
            warn!(
                component = "requests",
                client_id = %actor.id,
                "concurrent self-service bootstrap; reusing existing request"
            );
            let existing = repo
                .find_self_service_request(actor.id)?
                .ok_or(ServiceError::NotFound("request"))?;
            Ok((existing, false))
        }
        Err(err) => Err(err.into()),
    }
}

/// Recomputes `pending_documents` from the slots, then the client's totals.
pub fn recompute_counters(repo: &dyn Repository, request_id: Uuid) -> ServiceResult<Request> {
    let mut request = find_request(repo, request_id)?;
    let slots = repo.list_slots(request_id)?;
    let pending = pending_documents(&request, &slots);
    if pending != request.pending_documents {
        repo.set_request_pending(request_id, pending)?;
        request.pending_documents = pending;
    }
    clients::sync_client_counters(repo, request.client_id)?;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        client::{Address, ClientDraft},
        document_list::{DocumentListDraft, ListCategory},
    };
    use crate::repository::MemoryRepository;

    fn pro() -> Actor {
        Actor::new(Uuid::new_v4(), "pro@example.com", Role::Professional)
    }

    fn client_for(repo: &MemoryRepository, owner: &Actor) -> Uuid {
        clients::create_client(
            repo,
            owner,
            ClientDraft {
                first_name: "Jean".into(),
                last_name: "Dupont".into(),
                email: "jean@example.com".into(),
                phone: String::new(),
                address: Address::default(),
                notes: String::new(),
            },
        )
        .unwrap()
        .id
    }

    fn template(repo: &MemoryRepository, owner: &Actor) -> Uuid {
        document_lists::create_list(
            repo,
            owner,
            DocumentListDraft {
                name: "Location".into(),
                description: String::new(),
                category: ListCategory::Location,
                documents: vec![
                    DocumentDefinition::new("Carte d'identité", None, true),
                    DocumentDefinition::new("RIB", None, false),
                ],
                is_template: true,
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn template_seeds_documents_and_counts_usage() {
        let repo = MemoryRepository::new();
        let owner = pro();
        let client_id = client_for(&repo, &owner);
        let list_id = template(&repo, &owner);

        let request = create_request(
            &repo,
            &owner,
            CreateRequestInput {
                client_id,
                document_list_id: Some(list_id),
                ..CreateRequestInput::default()
            },
        )
        .unwrap();

        assert_eq!(request.documents_count, 2);
        assert_eq!(request.pending_documents, 2);
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.document_list_name.as_deref(), Some("Location"));
        assert_eq!(repo.find_list(list_id).unwrap().unwrap().usage_count, 1);
        assert_eq!(repo.find_client(client_id).unwrap().unwrap().documents_count, 2);
    }

    #[test]
    fn explicit_documents_override_the_template() {
        let repo = MemoryRepository::new();
        let owner = pro();
        let client_id = client_for(&repo, &owner);
        let list_id = template(&repo, &owner);

        let request = create_request(
            &repo,
            &owner,
            CreateRequestInput {
                client_id,
                document_list_id: Some(list_id),
                documents: Some(vec![DocumentDefinition::new("Avis d'imposition", None, true)]),
                ..CreateRequestInput::default()
            },
        )
        .unwrap();

        assert_eq!(request.documents_count, 1);
        assert_eq!(repo.find_list(list_id).unwrap().unwrap().usage_count, 0);
    }

    #[test]
    fn request_needs_documents_or_template() {
        let repo = MemoryRepository::new();
        let owner = pro();
        let client_id = client_for(&repo, &owner);
        let err = create_request(
            &repo,
            &owner,
            CreateRequestInput {
                client_id,
                documents: Some(vec![]),
                ..CreateRequestInput::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn requests_for_foreign_clients_are_forbidden() {
        let repo = MemoryRepository::new();
        let owner = pro();
        let client_id = client_for(&repo, &owner);
        let err = create_request(
            &repo,
            &pro(),
            CreateRequestInput {
                client_id,
                documents: Some(vec![DocumentDefinition::new("RIB", None, true)]),
                ..CreateRequestInput::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn self_service_bootstrap_is_idempotent() {
        let repo = MemoryRepository::new();
        let client = Actor::new(Uuid::new_v4(), "client@example.com", Role::Client);

        let (first, created) = ensure_self_service_request(&repo, &client).unwrap();
        assert!(created);
        assert_eq!(first.kind, RequestKind::SelfService);
        assert_eq!(first.professional_id, client.id);

        let (second, created) = ensure_self_service_request(&repo, &client).unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(list_requests(&repo, &client).unwrap().len(), 1);
    }

    #[test]
    fn closed_request_cannot_be_reopened() {
        let repo = MemoryRepository::new();
        let owner = pro();
        let client_id = client_for(&repo, &owner);
        let request = create_request(
            &repo,
            &owner,
            CreateRequestInput {
                client_id,
                documents: Some(vec![DocumentDefinition::new("RIB", None, true)]),
                ..CreateRequestInput::default()
            },
        )
        .unwrap();

        set_status(&repo, &owner, request.id, RequestStatus::Cancelled).unwrap();
        assert!(matches!(
            set_status(&repo, &owner, request.id, RequestStatus::Pending),
            Err(ServiceError::Conflict(_))
        ));
    }
}
