use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::domain::{
    account::{ClientAccount, NewClientAccount, NewUser, User},
    client::{Client, NewClient, NormalizedClientUpdate},
    document_list::{DocumentList, DocumentListChanges, NewDocumentList},
    ownership::{OwnedCollection, OwnershipRepair},
    request::{IssuedCredentials, NewRequest, Request, RequestKind, RequestStatus},
    slot::{DocumentSlot, SlotStatus},
};

use super::{
    ClientStore, DocumentListStore, OwnershipStore, RepositoryError, RepositoryResult,
    RequestStore, SlotStore, UserStore,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    client_accounts: Vec<ClientAccount>,
    clients: Vec<Client>,
    lists: Vec<DocumentList>,
    requests: Vec<Request>,
    slots: Vec<DocumentSlot>,
    repairs: Vec<OwnershipRepair>,
}

/// In-process store used when no database is configured, and by the test suite.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
    fail_slot_writes: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent slot write fail, to exercise storage cleanup paths.
    pub fn set_slot_write_failure(&self, fail: bool) {
        self.fail_slot_writes.store(fail, Ordering::SeqCst);
    }

    /// Inserts a client exactly as given, including a missing owner.
    pub fn insert_client_record(&self, client: Client) {
        self.tables.lock().clients.push(client);
    }

    /// Inserts a list exactly as given, including a missing owner.
    pub fn insert_list_record(&self, list: DocumentList) {
        self.tables.lock().lists.push(list);
    }

    fn check_slot_write(&self) -> RepositoryResult<()> {
        if self.fail_slot_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database("slot write rejected".to_string()));
        }
        Ok(())
    }
}

fn not_found<T>(value: Option<T>) -> RepositoryResult<T> {
    value.ok_or(RepositoryError::NotFound)
}

impl UserStore for MemoryRepository {
    fn create_user(&self, user: &NewUser) -> RepositoryResult<User> {
        let mut tables = self.tables.lock();
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "username '{}' already exists",
                user.username
            )));
        }
        let now = Utc::now();
        let created = User {
            id: user.id,
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            quota_remaining: user.quota_remaining,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    fn find_user(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        Ok(self.tables.lock().users.iter().find(|u| u.id == id).cloned())
    }

    fn find_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        Ok(self
            .tables
            .lock()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    fn upsert_client_account(
        &self,
        account: &NewClientAccount,
    ) -> RepositoryResult<ClientAccount> {
        let mut tables = self.tables.lock();
        if tables
            .client_accounts
            .iter()
            .any(|a| a.email == account.email && a.id != account.id)
        {
            return Err(RepositoryError::ConstraintViolation(format!(
                "client account email '{}' already exists",
                account.email
            )));
        }
        let stored = ClientAccount {
            id: account.id,
            email: account.email.clone(),
            password_hash: account.password_hash.clone(),
            request_id: account.request_id,
            client_name: account.client_name.clone(),
            is_active: true,
            generated_at: account.generated_at,
            last_login_at: None,
        };
        match tables.client_accounts.iter().position(|a| a.id == account.id) {
            Some(index) => {
                let existing = &mut tables.client_accounts[index];
                *existing = ClientAccount {
                    last_login_at: existing.last_login_at,
                    ..stored
                };
                Ok(existing.clone())
            }
            None => {
                tables.client_accounts.push(stored.clone());
                Ok(stored)
            }
        }
    }

    fn find_client_account_by_email(
        &self,
        email: &str,
    ) -> RepositoryResult<Option<ClientAccount>> {
        Ok(self
            .tables
            .lock()
            .client_accounts
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }

    fn record_client_login(&self, id: Uuid, at: DateTime<Utc>) -> RepositoryResult<()> {
        let mut tables = self.tables.lock();
        let account = not_found(tables.client_accounts.iter_mut().find(|a| a.id == id))?;
        account.last_login_at = Some(at);
        Ok(())
    }
}

impl ClientStore for MemoryRepository {
    fn create_client(&self, client: &NewClient) -> RepositoryResult<Client> {
        let now = Utc::now();
        let created = Client {
            id: client.id,
            first_name: client.first_name.clone(),
            last_name: client.last_name.clone(),
            full_name: client.full_name.clone(),
            email: client.email.clone(),
            phone: client.phone.clone(),
            address: client.address.clone(),
            notes: client.notes.clone(),
            created_by: Some(client.created_by),
            status: client.status,
            documents_count: 0,
            pending_documents: 0,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().clients.push(created.clone());
        Ok(created)
    }

    fn find_client(&self, id: Uuid) -> RepositoryResult<Option<Client>> {
        Ok(self.tables.lock().clients.iter().find(|c| c.id == id).cloned())
    }

    fn list_clients_by_owner(&self, owner: Uuid) -> RepositoryResult<Vec<Client>> {
        Ok(self
            .tables
            .lock()
            .clients
            .iter()
            .rev()
            .filter(|c| c.created_by == Some(owner))
            .cloned()
            .collect())
    }

    fn update_client(
        &self,
        id: Uuid,
        update: &NormalizedClientUpdate,
    ) -> RepositoryResult<Client> {
        let mut tables = self.tables.lock();
        let client = not_found(tables.clients.iter_mut().find(|c| c.id == id))?;
        client.first_name = update.first_name.clone();
        client.last_name = update.last_name.clone();
        client.full_name = update.full_name.clone();
        client.email = update.email.clone();
        client.phone = update.phone.clone();
        client.address = update.address.clone();
        client.notes = update.notes.clone();
        client.status = update.status;
        client.updated_at = Utc::now();
        Ok(client.clone())
    }

    fn set_client_counters(
        &self,
        id: Uuid,
        documents_count: i32,
        pending_documents: i32,
    ) -> RepositoryResult<()> {
        let mut tables = self.tables.lock();
        let client = not_found(tables.clients.iter_mut().find(|c| c.id == id))?;
        client.documents_count = documents_count;
        client.pending_documents = pending_documents;
        client.updated_at = Utc::now();
        Ok(())
    }
}

impl DocumentListStore for MemoryRepository {
    fn create_list(&self, list: &NewDocumentList) -> RepositoryResult<DocumentList> {
        let now = Utc::now();
        let created = DocumentList {
            id: list.id,
            name: list.name.clone(),
            description: list.description.clone(),
            category: list.category,
            documents: list.documents.clone(),
            is_template: list.is_template,
            usage_count: 0,
            created_by: Some(list.created_by),
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().lists.push(created.clone());
        Ok(created)
    }

    fn find_list(&self, id: Uuid) -> RepositoryResult<Option<DocumentList>> {
        Ok(self.tables.lock().lists.iter().find(|l| l.id == id).cloned())
    }

    fn list_lists_by_owner(&self, owner: Uuid) -> RepositoryResult<Vec<DocumentList>> {
        Ok(self
            .tables
            .lock()
            .lists
            .iter()
            .rev()
            .filter(|l| l.created_by == Some(owner))
            .cloned()
            .collect())
    }

    fn update_list(
        &self,
        id: Uuid,
        changes: &DocumentListChanges,
    ) -> RepositoryResult<DocumentList> {
        let mut tables = self.tables.lock();
        let list = not_found(tables.lists.iter_mut().find(|l| l.id == id))?;
        list.name = changes.name.clone();
        list.description = changes.description.clone();
        list.category = changes.category;
        list.documents = changes.documents.clone();
        list.is_template = changes.is_template;
        list.updated_at = Utc::now();
        Ok(list.clone())
    }

    fn delete_list(&self, id: Uuid) -> RepositoryResult<()> {
        let mut tables = self.tables.lock();
        let before = tables.lists.len();
        tables.lists.retain(|l| l.id != id);
        if tables.lists.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn increment_list_usage(&self, id: Uuid) -> RepositoryResult<()> {
        let mut tables = self.tables.lock();
        let list = not_found(tables.lists.iter_mut().find(|l| l.id == id))?;
        list.usage_count += 1;
        Ok(())
    }
}

impl RequestStore for MemoryRepository {
    fn create_request(&self, request: &NewRequest) -> RepositoryResult<Request> {
        let mut tables = self.tables.lock();
        if request.kind == RequestKind::SelfService
            && tables.requests.iter().any(|r| {
                r.kind == RequestKind::SelfService && r.client_id == request.client_id
            })
        {
            return Err(RepositoryError::ConstraintViolation(format!(
                "self-service request already exists for client {}",
                request.client_id
            )));
        }
        let now = Utc::now();
        let count = request.documents_count();
        let created = Request {
            id: request.id,
            client_id: request.client_id,
            professional_id: request.professional_id,
            created_by: request.created_by,
            kind: request.kind,
            status: RequestStatus::Pending,
            client_name: request.client_name.clone(),
            client_email: request.client_email.clone(),
            client_phone: request.client_phone.clone(),
            document_list_id: request.document_list_id,
            document_list_name: request.document_list_name.clone(),
            ai_enabled: request.ai_enabled,
            validation_rules: request.validation_rules.clone(),
            requested_documents: request.requested_documents.clone(),
            documents_count: count,
            pending_documents: count,
            email_sent: false,
            email_sent_at: None,
            client_credentials: None,
            created_at: now,
            updated_at: now,
        };
        tables.requests.push(created.clone());
        Ok(created)
    }

    fn find_request(&self, id: Uuid) -> RepositoryResult<Option<Request>> {
        Ok(self.tables.lock().requests.iter().find(|r| r.id == id).cloned())
    }

    fn find_self_service_request(&self, client_id: Uuid) -> RepositoryResult<Option<Request>> {
        Ok(self
            .tables
            .lock()
            .requests
            .iter()
            .find(|r| r.kind == RequestKind::SelfService && r.client_id == client_id)
            .cloned())
    }

    fn list_requests_by_professional(&self, owner: Uuid) -> RepositoryResult<Vec<Request>> {
        Ok(self
            .tables
            .lock()
            .requests
            .iter()
            .rev()
            .filter(|r| r.professional_id == owner)
            .cloned()
            .collect())
    }

    fn list_requests_by_client(&self, client_id: Uuid) -> RepositoryResult<Vec<Request>> {
        Ok(self
            .tables
            .lock()
            .requests
            .iter()
            .rev()
            .filter(|r| r.client_id == client_id)
            .cloned()
            .collect())
    }

    fn set_request_status(&self, id: Uuid, status: RequestStatus) -> RepositoryResult<Request> {
        let mut tables = self.tables.lock();
        let request = not_found(tables.requests.iter_mut().find(|r| r.id == id))?;
        request.status = status;
        request.updated_at = Utc::now();
        Ok(request.clone())
    }

    fn set_request_pending(&self, id: Uuid, pending_documents: i32) -> RepositoryResult<()> {
        let mut tables = self.tables.lock();
        let request = not_found(tables.requests.iter_mut().find(|r| r.id == id))?;
        request.pending_documents = pending_documents;
        request.updated_at = Utc::now();
        Ok(())
    }

    fn mark_email_sent(
        &self,
        id: Uuid,
        credentials: &IssuedCredentials,
        at: DateTime<Utc>,
    ) -> RepositoryResult<bool> {
        let mut tables = self.tables.lock();
        let request = not_found(tables.requests.iter_mut().find(|r| r.id == id))?;
        if request.email_sent {
            return Ok(false);
        }
        request.email_sent = true;
        request.email_sent_at = Some(at);
        request.client_credentials = Some(credentials.clone());
        request.updated_at = at;
        Ok(true)
    }
}

impl SlotStore for MemoryRepository {
    fn find_slot(&self, request_id: Uuid, slot: &str) -> RepositoryResult<Option<DocumentSlot>> {
        Ok(self
            .tables
            .lock()
            .slots
            .iter()
            .find(|s| s.request_id == request_id && s.slot == slot)
            .cloned())
    }

    fn list_slots(&self, request_id: Uuid) -> RepositoryResult<Vec<DocumentSlot>> {
        Ok(self
            .tables
            .lock()
            .slots
            .iter()
            .filter(|s| s.request_id == request_id)
            .cloned()
            .collect())
    }

    fn upsert_slot(&self, slot: &DocumentSlot) -> RepositoryResult<DocumentSlot> {
        self.check_slot_write()?;
        let mut tables = self.tables.lock();
        match tables
            .slots
            .iter()
            .position(|s| s.request_id == slot.request_id && s.slot == slot.slot)
        {
            Some(index) => tables.slots[index] = slot.clone(),
            None => tables.slots.push(slot.clone()),
        }
        Ok(slot.clone())
    }

    fn save_review(&self, slot: &DocumentSlot) -> RepositoryResult<Option<DocumentSlot>> {
        self.check_slot_write()?;
        let mut tables = self.tables.lock();
        let Some(existing) = tables.slots.iter_mut().find(|s| {
            s.request_id == slot.request_id
                && s.slot == slot.slot
                && s.status == SlotStatus::Validating
                && s.storage_path == slot.storage_path
        }) else {
            return Ok(None);
        };
        existing.status = slot.status;
        existing.reject_reason = slot.reject_reason.clone();
        existing.reviewed_by = slot.reviewed_by;
        existing.reviewed_at = slot.reviewed_at;
        Ok(Some(existing.clone()))
    }
}

impl OwnershipStore for MemoryRepository {
    fn repair_owners(
        &self,
        collection: OwnedCollection,
        actor: Uuid,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Uuid>> {
        let mut tables = self.tables.lock();
        let fixed: Vec<Uuid> = match collection {
            OwnedCollection::Clients => tables
                .clients
                .iter_mut()
                .filter(|c| c.created_by.is_none())
                .map(|c| {
                    c.created_by = Some(actor);
                    c.updated_at = at;
                    c.id
                })
                .collect(),
            OwnedCollection::DocumentLists => tables
                .lists
                .iter_mut()
                .filter(|l| l.created_by.is_none())
                .map(|l| {
                    l.created_by = Some(actor);
                    l.updated_at = at;
                    l.id
                })
                .collect(),
        };
        if !fixed.is_empty() {
            tables.repairs.push(OwnershipRepair {
                id: Uuid::new_v4(),
                actor_id: actor,
                collection,
                record_ids: fixed.clone(),
                fixed_count: fixed.len() as i32,
                performed_at: at,
            });
        }
        Ok(fixed)
    }

    fn list_ownership_repairs(&self) -> RepositoryResult<Vec<OwnershipRepair>> {
        Ok(self.tables.lock().repairs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        client::{Address, ClientStatus},
        request::NewRequest,
    };

    fn orphan_client() -> Client {
        let now = Utc::now();
        Client {
            id: Uuid::new_v4(),
            first_name: "Marie".into(),
            last_name: "Curie".into(),
            full_name: "Marie Curie".into(),
            email: "marie@example.com".into(),
            phone: String::new(),
            address: Address::default(),
            notes: String::new(),
            created_by: None,
            status: ClientStatus::Active,
            documents_count: 0,
            pending_documents: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn second_self_service_request_is_a_constraint_violation() {
        let repo = MemoryRepository::new();
        let identity = Uuid::new_v4();
        repo.create_request(&NewRequest::self_service(identity, identity, "c@example.com"))
            .expect("first insert");

        let err = repo
            .create_request(&NewRequest::self_service(identity, identity, "c@example.com"))
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn mark_email_sent_only_succeeds_once() {
        let repo = MemoryRepository::new();
        let identity = Uuid::new_v4();
        let request = repo
            .create_request(&NewRequest::self_service(identity, identity, "c@example.com"))
            .expect("insert");
        let credentials = IssuedCredentials {
            email: "c@example.com".into(),
            password_hash: "hash".into(),
            generated_at: Utc::now(),
            delivery: crate::domain::request::DeliveryMode::Simulated,
        };

        assert!(repo.mark_email_sent(request.id, &credentials, Utc::now()).unwrap());
        assert!(!repo.mark_email_sent(request.id, &credentials, Utc::now()).unwrap());
    }

    #[test]
    fn repair_writes_one_audit_row_per_non_empty_batch() {
        let repo = MemoryRepository::new();
        repo.insert_client_record(orphan_client());
        repo.insert_client_record(orphan_client());
        let actor = Uuid::new_v4();

        let fixed = repo
            .repair_owners(OwnedCollection::Clients, actor, Utc::now())
            .unwrap();
        let again = repo
            .repair_owners(OwnedCollection::Clients, actor, Utc::now())
            .unwrap();

        assert_eq!(fixed.len(), 2);
        assert!(again.is_empty());
        let repairs = repo.list_ownership_repairs().unwrap();
        assert_eq!(repairs.len(), 1);
        assert_eq!(repairs[0].fixed_count, 2);
        assert_eq!(repo.list_clients_by_owner(actor).unwrap().len(), 2);
    }
}
