//! Persistence seams. Services depend on these traits only; `pg` backs them with
//! PostgreSQL and `memory` with in-process tables.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    account::{ClientAccount, NewClientAccount, NewUser, User},
    client::{Client, NewClient, NormalizedClientUpdate},
    document_list::{DocumentList, DocumentListChanges, NewDocumentList},
    ownership::{OwnedCollection, OwnershipRepair},
    request::{IssuedCredentials, NewRequest, Request, RequestStatus},
    slot::DocumentSlot,
};

pub mod errors;
pub mod memory;
pub mod pg;

pub use errors::{RepositoryError, RepositoryResult};
pub use memory::MemoryRepository;
pub use pg::PgRepository;

pub trait UserStore {
    fn create_user(&self, user: &NewUser) -> RepositoryResult<User>;
    fn find_user(&self, id: Uuid) -> RepositoryResult<Option<User>>;
    fn find_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>>;

    /// Inserts or replaces the account keyed by its id.
    fn upsert_client_account(&self, account: &NewClientAccount)
        -> RepositoryResult<ClientAccount>;
    fn find_client_account_by_email(&self, email: &str)
        -> RepositoryResult<Option<ClientAccount>>;
    fn record_client_login(&self, id: Uuid, at: DateTime<Utc>) -> RepositoryResult<()>;
}

pub trait ClientStore {
    fn create_client(&self, client: &NewClient) -> RepositoryResult<Client>;
    fn find_client(&self, id: Uuid) -> RepositoryResult<Option<Client>>;
    /// Newest first.
    fn list_clients_by_owner(&self, owner: Uuid) -> RepositoryResult<Vec<Client>>;
    fn update_client(&self, id: Uuid, update: &NormalizedClientUpdate)
        -> RepositoryResult<Client>;
    fn set_client_counters(
        &self,
        id: Uuid,
        documents_count: i32,
        pending_documents: i32,
    ) -> RepositoryResult<()>;
}

pub trait DocumentListStore {
    fn create_list(&self, list: &NewDocumentList) -> RepositoryResult<DocumentList>;
    fn find_list(&self, id: Uuid) -> RepositoryResult<Option<DocumentList>>;
    fn list_lists_by_owner(&self, owner: Uuid) -> RepositoryResult<Vec<DocumentList>>;
    fn update_list(&self, id: Uuid, changes: &DocumentListChanges)
        -> RepositoryResult<DocumentList>;
    fn delete_list(&self, id: Uuid) -> RepositoryResult<()>;
    fn increment_list_usage(&self, id: Uuid) -> RepositoryResult<()>;
}

pub trait RequestStore {
    /// Fails with a constraint violation when the client already has a self-service request.
    fn create_request(&self, request: &NewRequest) -> RepositoryResult<Request>;
    fn find_request(&self, id: Uuid) -> RepositoryResult<Option<Request>>;
    fn find_self_service_request(&self, client_id: Uuid) -> RepositoryResult<Option<Request>>;
    fn list_requests_by_professional(&self, owner: Uuid) -> RepositoryResult<Vec<Request>>;
    fn list_requests_by_client(&self, client_id: Uuid) -> RepositoryResult<Vec<Request>>;
    fn set_request_status(&self, id: Uuid, status: RequestStatus) -> RepositoryResult<Request>;
    fn set_request_pending(&self, id: Uuid, pending_documents: i32) -> RepositoryResult<()>;
    /// Sets the email flag only if it is still unset. Returns whether this call set it.
    fn mark_email_sent(
        &self,
        id: Uuid,
        credentials: &IssuedCredentials,
        at: DateTime<Utc>,
    ) -> RepositoryResult<bool>;
}

pub trait SlotStore {
    fn find_slot(&self, request_id: Uuid, slot: &str) -> RepositoryResult<Option<DocumentSlot>>;
    fn list_slots(&self, request_id: Uuid) -> RepositoryResult<Vec<DocumentSlot>>;
    /// Last writer wins.
    fn upsert_slot(&self, slot: &DocumentSlot) -> RepositoryResult<DocumentSlot>;
    /// Stores a review decision only while the slot is under review and still holds the
    /// upload at `slot.storage_path`. `None` when either no longer holds.
    fn save_review(&self, slot: &DocumentSlot) -> RepositoryResult<Option<DocumentSlot>>;
}

pub trait OwnershipStore {
    /// Assigns `actor` to every record of `collection` without an owner and writes the audit
    /// row, atomically. Returns the ids that were fixed.
    fn repair_owners(
        &self,
        collection: OwnedCollection,
        actor: Uuid,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Uuid>>;
    fn list_ownership_repairs(&self) -> RepositoryResult<Vec<OwnershipRepair>>;
}

pub trait Repository:
    UserStore + ClientStore + DocumentListStore + RequestStore + SlotStore + OwnershipStore + Send + Sync
{
}

impl<T> Repository for T where
    T: UserStore
        + ClientStore
        + DocumentListStore
        + RequestStore
        + SlotStore
        + OwnershipStore
        + Send
        + Sync
{
}
