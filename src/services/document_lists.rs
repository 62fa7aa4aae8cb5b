use tracing::info;
use uuid::Uuid;

use crate::domain::{
    document_list::{sample_lists, DocumentList, DocumentListDraft, DocumentListUpdate},
    Actor,
};
use crate::repository::{DocumentListStore, Repository};

use super::{require_professional, ServiceError, ServiceResult};

pub fn create_list(
    repo: &dyn Repository,
    actor: &Actor,
    draft: DocumentListDraft,
) -> ServiceResult<DocumentList> {
    require_professional(actor)?;
    let list = draft
        .into_new_list(actor.id)
        .map_err(ServiceError::Validation)?;
    Ok(repo.create_list(&list)?)
}

pub fn list_lists(repo: &dyn Repository, actor: &Actor) -> ServiceResult<Vec<DocumentList>> {
    require_professional(actor)?;
    Ok(repo.list_lists_by_owner(actor.id)?)
}

fn find(repo: &dyn Repository, id: Uuid) -> ServiceResult<DocumentList> {
    repo.find_list(id)?.ok_or(ServiceError::NotFound("document list"))
}

fn owned(repo: &dyn Repository, actor: &Actor, id: Uuid) -> ServiceResult<DocumentList> {
    require_professional(actor)?;
    let list = find(repo, id)?;
    if !actor.owns(list.created_by) {
        return Err(ServiceError::forbidden("this list belongs to another account"));
    }
    Ok(list)
}

/// Readable by its owner, and by any professional when flagged as a template.
pub fn get_list(repo: &dyn Repository, actor: &Actor, id: Uuid) -> ServiceResult<DocumentList> {
    require_professional(actor)?;
    let list = find(repo, id)?;
    if !list.is_template && !actor.owns(list.created_by) {
        return Err(ServiceError::forbidden("this list belongs to another account"));
    }
    Ok(list)
}

pub fn update_list(
    repo: &dyn Repository,
    actor: &Actor,
    id: Uuid,
    update: DocumentListUpdate,
) -> ServiceResult<DocumentList> {
    let current = owned(repo, actor, id)?;
    let changes = update.apply(&current).map_err(ServiceError::Validation)?;
    Ok(repo.update_list(id, &changes)?)
}

pub fn delete_list(repo: &dyn Repository, actor: &Actor, id: Uuid) -> ServiceResult<()> {
    owned(repo, actor, id)?;
    repo.delete_list(id)?;
    info!(component = "document_lists", list_id = %id, "document list deleted");
    Ok(())
}

/// Detached copy owned by the caller, with a fresh usage counter.
pub fn duplicate_list(
    repo: &dyn Repository,
    actor: &Actor,
    id: Uuid,
) -> ServiceResult<DocumentList> {
    let source = get_list(repo, actor, id)?;
    let copy = repo.create_list(&source.duplicate_for(actor.id))?;
    info!(
        component = "document_lists",
        source_id = %source.id,
        list_id = %copy.id,
        "document list duplicated"
    );
    Ok(copy)
}

pub fn seed_samples(repo: &dyn Repository, actor: &Actor) -> ServiceResult<Vec<DocumentList>> {
    require_professional(actor)?;
    let created = sample_lists(actor.id)
        .iter()
        .map(|list| repo.create_list(list))
        .collect::<Result<Vec<_>, _>>()?;
    info!(
        component = "document_lists",
        owner = %actor.id,
        count = created.len(),
        "sample lists created"
    );
    Ok(created)
}
