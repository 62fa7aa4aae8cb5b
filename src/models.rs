use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    account::{self, NewClientAccount as DomainNewClientAccount},
    client::{self, Address},
    document_list::{self, DocumentDefinition},
    ownership,
    request::{self, IssuedCredentials},
    slot,
};
use crate::repository::RepositoryError;
use crate::schema::*;

fn invalid(message: String) -> RepositoryError {
    RepositoryError::InvalidData(message)
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub quota_remaining: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub quota_remaining: i32,
}

impl TryFrom<User> for account::User {
    type Error = RepositoryError;

    fn try_from(row: User) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            role: row.role.parse().map_err(invalid)?,
            quota_remaining: row.quota_remaining,
            created_at: row.created_at.and_utc(),
            updated_at: row.updated_at.and_utc(),
        })
    }
}

impl From<&account::NewUser> for NewUser {
    fn from(user: &account::NewUser) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role.as_str().to_string(),
            quota_remaining: user.quota_remaining,
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = client_accounts)]
pub struct ClientAccount {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub request_id: Uuid,
    pub client_name: String,
    pub is_active: bool,
    pub generated_at: NaiveDateTime,
    pub last_login_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = client_accounts)]
pub struct NewClientAccount {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub request_id: Uuid,
    pub client_name: String,
    pub is_active: bool,
    pub generated_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<ClientAccount> for account::ClientAccount {
    fn from(row: ClientAccount) -> Self {
        Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            request_id: row.request_id,
            client_name: row.client_name,
            is_active: row.is_active,
            generated_at: row.generated_at.and_utc(),
            last_login_at: row.last_login_at.map(|at| at.and_utc()),
        }
    }
}

impl From<&DomainNewClientAccount> for NewClientAccount {
    fn from(account: &DomainNewClientAccount) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            password_hash: account.password_hash.clone(),
            request_id: account.request_id,
            client_name: account.client_name.clone(),
            is_active: true,
            generated_at: account.generated_at.naive_utc(),
            updated_at: chrono::Utc::now().naive_utc(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = clients)]
pub struct Client {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub notes: String,
    pub created_by: Option<Uuid>,
    pub status: String,
    pub documents_count: i32,
    pub pending_documents: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = clients)]
pub struct NewClient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub notes: String,
    pub created_by: Option<Uuid>,
    pub status: String,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = clients)]
pub struct ClientChanges {
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub notes: String,
    pub status: String,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<Client> for client::Client {
    type Error = RepositoryError;

    fn try_from(row: Client) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            address: Address {
                street: row.street,
                city: row.city,
                postal_code: row.postal_code,
                country: row.country,
            },
            notes: row.notes,
            created_by: row.created_by,
            status: row.status.parse().map_err(invalid)?,
            documents_count: row.documents_count,
            pending_documents: row.pending_documents,
            created_at: row.created_at.and_utc(),
            updated_at: row.updated_at.and_utc(),
        })
    }
}

impl From<&client::NewClient> for NewClient {
    fn from(client: &client::NewClient) -> Self {
        Self {
            id: client.id,
            first_name: client.first_name.clone(),
            last_name: client.last_name.clone(),
            full_name: client.full_name.clone(),
            email: client.email.clone(),
            phone: client.phone.clone(),
            street: client.address.street.clone(),
            city: client.address.city.clone(),
            postal_code: client.address.postal_code.clone(),
            country: client.address.country.clone(),
            notes: client.notes.clone(),
            created_by: Some(client.created_by),
            status: client.status.as_str().to_string(),
        }
    }
}

impl From<&client::NormalizedClientUpdate> for ClientChanges {
    fn from(update: &client::NormalizedClientUpdate) -> Self {
        Self {
            first_name: update.first_name.clone(),
            last_name: update.last_name.clone(),
            full_name: update.full_name.clone(),
            email: update.email.clone(),
            phone: update.phone.clone(),
            street: update.address.street.clone(),
            city: update.address.city.clone(),
            postal_code: update.address.postal_code.clone(),
            country: update.address.country.clone(),
            notes: update.notes.clone(),
            status: update.status.as_str().to_string(),
            updated_at: chrono::Utc::now().naive_utc(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = document_lists)]
pub struct DocumentList {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub documents: serde_json::Value,
    pub is_template: bool,
    pub usage_count: i32,
    pub created_by: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = document_lists)]
pub struct NewDocumentList {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub documents: serde_json::Value,
    pub is_template: bool,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = document_lists)]
pub struct DocumentListChanges {
    pub name: String,
    pub description: String,
    pub category: String,
    pub documents: serde_json::Value,
    pub is_template: bool,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<DocumentList> for document_list::DocumentList {
    type Error = RepositoryError;

    fn try_from(row: DocumentList) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            category: row.category.parse().map_err(invalid)?,
            documents: serde_json::from_value::<Vec<DocumentDefinition>>(row.documents)?,
            is_template: row.is_template,
            usage_count: row.usage_count,
            created_by: row.created_by,
            created_at: row.created_at.and_utc(),
            updated_at: row.updated_at.and_utc(),
        })
    }
}

impl TryFrom<&document_list::NewDocumentList> for NewDocumentList {
    type Error = RepositoryError;

    fn try_from(list: &document_list::NewDocumentList) -> Result<Self, Self::Error> {
        Ok(Self {
            id: list.id,
            name: list.name.clone(),
            description: list.description.clone(),
            category: list.category.as_str().to_string(),
            documents: serde_json::to_value(&list.documents)?,
            is_template: list.is_template,
            created_by: Some(list.created_by),
        })
    }
}

impl TryFrom<&document_list::DocumentListChanges> for DocumentListChanges {
    type Error = RepositoryError;

    fn try_from(changes: &document_list::DocumentListChanges) -> Result<Self, Self::Error> {
        Ok(Self {
            name: changes.name.clone(),
            description: changes.description.clone(),
            category: changes.category.as_str().to_string(),
            documents: serde_json::to_value(&changes.documents)?,
            is_template: changes.is_template,
            updated_at: chrono::Utc::now().naive_utc(),
        })
    }
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = requests)]
pub struct Request {
    pub id: Uuid,
    pub client_id: Uuid,
    pub professional_id: Uuid,
    pub created_by: Uuid,
    pub kind: String,
    pub status: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub document_list_id: Option<Uuid>,
    pub document_list_name: Option<String>,
    pub ai_enabled: bool,
    pub validation_rules: Option<serde_json::Value>,
    pub requested_documents: serde_json::Value,
    pub documents_count: i32,
    pub pending_documents: i32,
    pub email_sent: bool,
    pub email_sent_at: Option<NaiveDateTime>,
    pub client_credentials: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = requests)]
pub struct NewRequest {
    pub id: Uuid,
    pub client_id: Uuid,
    pub professional_id: Uuid,
    pub created_by: Uuid,
    pub kind: String,
    pub status: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub document_list_id: Option<Uuid>,
    pub document_list_name: Option<String>,
    pub ai_enabled: bool,
    pub validation_rules: Option<serde_json::Value>,
    pub requested_documents: serde_json::Value,
    pub documents_count: i32,
    pub pending_documents: i32,
}

impl TryFrom<Request> for request::Request {
    type Error = RepositoryError;

    fn try_from(row: Request) -> Result<Self, Self::Error> {
        let client_credentials = row
            .client_credentials
            .map(serde_json::from_value::<IssuedCredentials>)
            .transpose()?;
        Ok(Self {
            id: row.id,
            client_id: row.client_id,
            professional_id: row.professional_id,
            created_by: row.created_by,
            kind: row.kind.parse().map_err(invalid)?,
            status: row.status.parse().map_err(invalid)?,
            client_name: row.client_name,
            client_email: row.client_email,
            client_phone: row.client_phone,
            document_list_id: row.document_list_id,
            document_list_name: row.document_list_name,
            ai_enabled: row.ai_enabled,
            validation_rules: row.validation_rules,
            requested_documents: serde_json::from_value(row.requested_documents)?,
            documents_count: row.documents_count,
            pending_documents: row.pending_documents,
            email_sent: row.email_sent,
            email_sent_at: row.email_sent_at.map(|at| at.and_utc()),
            client_credentials,
            created_at: row.created_at.and_utc(),
            updated_at: row.updated_at.and_utc(),
        })
    }
}

impl TryFrom<&request::NewRequest> for NewRequest {
    type Error = RepositoryError;

    fn try_from(request: &request::NewRequest) -> Result<Self, Self::Error> {
        let count = request.documents_count();
        Ok(Self {
            id: request.id,
            client_id: request.client_id,
            professional_id: request.professional_id,
            created_by: request.created_by,
            kind: request.kind.as_str().to_string(),
            status: request::RequestStatus::Pending.as_str().to_string(),
            client_name: request.client_name.clone(),
            client_email: request.client_email.clone(),
            client_phone: request.client_phone.clone(),
            document_list_id: request.document_list_id,
            document_list_name: request.document_list_name.clone(),
            ai_enabled: request.ai_enabled,
            validation_rules: request.validation_rules.clone(),
            requested_documents: serde_json::to_value(&request.requested_documents)?,
            documents_count: count,
            pending_documents: count,
        })
    }
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = document_slots)]
#[diesel(primary_key(request_id, slot))]
#[diesel(treat_none_as_null = true)]
pub struct DocumentSlot {
    pub request_id: Uuid,
    pub slot: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub storage_path: String,
    pub checksum: String,
    pub uploaded_by: Uuid,
    pub uploaded_at: NaiveDateTime,
    pub status: String,
    pub reject_reason: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<NaiveDateTime>,
}

impl TryFrom<DocumentSlot> for slot::DocumentSlot {
    type Error = RepositoryError;

    fn try_from(row: DocumentSlot) -> Result<Self, Self::Error> {
        Ok(Self {
            request_id: row.request_id,
            slot: row.slot,
            file_name: row.file_name,
            file_type: row.file_type,
            file_size: row.file_size,
            storage_path: row.storage_path,
            checksum: row.checksum,
            uploaded_by: row.uploaded_by,
            uploaded_at: row.uploaded_at.and_utc(),
            status: row.status.parse().map_err(invalid)?,
            reject_reason: row.reject_reason,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at.map(|at| at.and_utc()),
        })
    }
}

impl From<&slot::DocumentSlot> for DocumentSlot {
    fn from(slot: &slot::DocumentSlot) -> Self {
        Self {
            request_id: slot.request_id,
            slot: slot.slot.clone(),
            file_name: slot.file_name.clone(),
            file_type: slot.file_type.clone(),
            file_size: slot.file_size,
            storage_path: slot.storage_path.clone(),
            checksum: slot.checksum.clone(),
            uploaded_by: slot.uploaded_by,
            uploaded_at: slot.uploaded_at.naive_utc(),
            status: slot.status.as_str().to_string(),
            reject_reason: slot.reject_reason.clone(),
            reviewed_by: slot.reviewed_by,
            reviewed_at: slot.reviewed_at.map(|at| at.naive_utc()),
        }
    }
}

#[derive(Debug, Clone, Queryable, Insertable, Identifiable)]
#[diesel(table_name = ownership_repairs)]
pub struct OwnershipRepair {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub collection: String,
    pub record_ids: Vec<Uuid>,
    pub fixed_count: i32,
    pub performed_at: NaiveDateTime,
}

impl TryFrom<OwnershipRepair> for ownership::OwnershipRepair {
    type Error = RepositoryError;

    fn try_from(row: OwnershipRepair) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            actor_id: row.actor_id,
            collection: row.collection.parse().map_err(invalid)?,
            record_ids: row.record_ids,
            fixed_count: row.fixed_count,
            performed_at: row.performed_at.and_utc(),
        })
    }
}
