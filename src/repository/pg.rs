use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    db::PgPool,
    domain::{
        account::{ClientAccount, NewClientAccount, NewUser, User},
        client::{Client, NewClient, NormalizedClientUpdate},
        document_list::{DocumentList, DocumentListChanges, NewDocumentList},
        ownership::{OwnedCollection, OwnershipRepair},
        request::{IssuedCredentials, NewRequest, Request, RequestKind, RequestStatus},
        slot::{DocumentSlot, SlotStatus},
    },
    models,
};

use super::{
    ClientStore, DocumentListStore, OwnershipStore, RepositoryError, RepositoryResult,
    RequestStore, SlotStore, UserStore,
};

/// Diesel implementation of every store trait.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> RepositoryResult<Vec<T>>
where
    T: TryFrom<R, Error = RepositoryError>,
{
    rows.into_iter().map(T::try_from).collect()
}

impl UserStore for PgRepository {
    fn create_user(&self, user: &NewUser) -> RepositoryResult<User> {
        use crate::schema::users;

        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(users::table)
            .values(models::NewUser::from(user))
            .get_result::<models::User>(&mut conn)?;
        row.try_into()
    }

    fn find_user(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        use crate::schema::users;

        let mut conn = self.pool.get()?;
        users::table
            .find(id)
            .first::<models::User>(&mut conn)
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    fn find_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        use crate::schema::users;

        let mut conn = self.pool.get()?;
        users::table
            .filter(users::username.eq(username))
            .first::<models::User>(&mut conn)
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    fn upsert_client_account(
        &self,
        account: &NewClientAccount,
    ) -> RepositoryResult<ClientAccount> {
        use crate::schema::client_accounts;

        let mut conn = self.pool.get()?;
        let values = models::NewClientAccount::from(account);
        let row = diesel::insert_into(client_accounts::table)
            .values(&values)
            .on_conflict(client_accounts::id)
            .do_update()
            .set(&values)
            .get_result::<models::ClientAccount>(&mut conn)?;
        Ok(row.into())
    }

    fn find_client_account_by_email(
        &self,
        email: &str,
    ) -> RepositoryResult<Option<ClientAccount>> {
        use crate::schema::client_accounts;

        let mut conn = self.pool.get()?;
        let row = client_accounts::table
            .filter(client_accounts::email.eq(email))
            .first::<models::ClientAccount>(&mut conn)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn record_client_login(&self, id: Uuid, at: DateTime<Utc>) -> RepositoryResult<()> {
        use crate::schema::client_accounts;

        let mut conn = self.pool.get()?;
        let updated = diesel::update(client_accounts::table.find(id))
            .set((
                client_accounts::last_login_at.eq(Some(at.naive_utc())),
                client_accounts::updated_at.eq(at.naive_utc()),
            ))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

impl ClientStore for PgRepository {
    fn create_client(&self, client: &NewClient) -> RepositoryResult<Client> {
        use crate::schema::clients;

        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(clients::table)
            .values(models::NewClient::from(client))
            .get_result::<models::Client>(&mut conn)?;
        row.try_into()
    }

    fn find_client(&self, id: Uuid) -> RepositoryResult<Option<Client>> {
        use crate::schema::clients;

        let mut conn = self.pool.get()?;
        clients::table
            .find(id)
            .first::<models::Client>(&mut conn)
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    fn list_clients_by_owner(&self, owner: Uuid) -> RepositoryResult<Vec<Client>> {
        use crate::schema::clients;

        let mut conn = self.pool.get()?;
        let rows = clients::table
            .filter(clients::created_by.eq(owner))
            .order(clients::created_at.desc())
            .load::<models::Client>(&mut conn)?;
        convert_all(rows)
    }

    fn update_client(
        &self,
        id: Uuid,
        update: &NormalizedClientUpdate,
    ) -> RepositoryResult<Client> {
        use crate::schema::clients;

        let mut conn = self.pool.get()?;
        let row = diesel::update(clients::table.find(id))
            .set(models::ClientChanges::from(update))
            .get_result::<models::Client>(&mut conn)?;
        row.try_into()
    }

    fn set_client_counters(
        &self,
        id: Uuid,
        documents_count: i32,
        pending_documents: i32,
    ) -> RepositoryResult<()> {
        use crate::schema::clients;

        let mut conn = self.pool.get()?;
        diesel::update(clients::table.find(id))
            .set((
                clients::documents_count.eq(documents_count),
                clients::pending_documents.eq(pending_documents),
                clients::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut conn)?;
        Ok(())
    }
}

impl DocumentListStore for PgRepository {
    fn create_list(&self, list: &NewDocumentList) -> RepositoryResult<DocumentList> {
        use crate::schema::document_lists;

        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(document_lists::table)
            .values(models::NewDocumentList::try_from(list)?)
            .get_result::<models::DocumentList>(&mut conn)?;
        row.try_into()
    }

    fn find_list(&self, id: Uuid) -> RepositoryResult<Option<DocumentList>> {
        use crate::schema::document_lists;

        let mut conn = self.pool.get()?;
        document_lists::table
            .find(id)
            .first::<models::DocumentList>(&mut conn)
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    fn list_lists_by_owner(&self, owner: Uuid) -> RepositoryResult<Vec<DocumentList>> {
        use crate::schema::document_lists;

        let mut conn = self.pool.get()?;
        let rows = document_lists::table
            .filter(document_lists::created_by.eq(owner))
            .order(document_lists::created_at.desc())
            .load::<models::DocumentList>(&mut conn)?;
        convert_all(rows)
    }

    fn update_list(
        &self,
        id: Uuid,
        changes: &DocumentListChanges,
    ) -> RepositoryResult<DocumentList> {
        use crate::schema::document_lists;

        let mut conn = self.pool.get()?;
        let row = diesel::update(document_lists::table.find(id))
            .set(models::DocumentListChanges::try_from(changes)?)
            .get_result::<models::DocumentList>(&mut conn)?;
        row.try_into()
    }

    fn delete_list(&self, id: Uuid) -> RepositoryResult<()> {
        use crate::schema::document_lists;

        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(document_lists::table.find(id)).execute(&mut conn)?;
        if deleted == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn increment_list_usage(&self, id: Uuid) -> RepositoryResult<()> {
        use crate::schema::document_lists;

        let mut conn = self.pool.get()?;
        diesel::update(document_lists::table.find(id))
            .set(document_lists::usage_count.eq(document_lists::usage_count + 1))
            .execute(&mut conn)?;
        Ok(())
    }
}

impl RequestStore for PgRepository {
    fn create_request(&self, request: &NewRequest) -> RepositoryResult<Request> {
        use crate::schema::requests;

        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(requests::table)
            .values(models::NewRequest::try_from(request)?)
            .get_result::<models::Request>(&mut conn)?;
        row.try_into()
    }

    fn find_request(&self, id: Uuid) -> RepositoryResult<Option<Request>> {
        use crate::schema::requests;

        let mut conn = self.pool.get()?;
        requests::table
            .find(id)
            .first::<models::Request>(&mut conn)
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    fn find_self_service_request(&self, client_id: Uuid) -> RepositoryResult<Option<Request>> {
        use crate::schema::requests;

        let mut conn = self.pool.get()?;
        requests::table
            .filter(requests::client_id.eq(client_id))
            .filter(requests::kind.eq(RequestKind::SelfService.as_str()))
            .first::<models::Request>(&mut conn)
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    fn list_requests_by_professional(&self, owner: Uuid) -> RepositoryResult<Vec<Request>> {
        use crate::schema::requests;

        let mut conn = self.pool.get()?;
        let rows = requests::table
            .filter(requests::professional_id.eq(owner))
            .order(requests::created_at.desc())
            .load::<models::Request>(&mut conn)?;
        convert_all(rows)
    }

    fn list_requests_by_client(&self, client_id: Uuid) -> RepositoryResult<Vec<Request>> {
        use crate::schema::requests;

        let mut conn = self.pool.get()?;
        let rows = requests::table
            .filter(requests::client_id.eq(client_id))
            .order(requests::created_at.desc())
            .load::<models::Request>(&mut conn)?;
        convert_all(rows)
    }

    fn set_request_status(&self, id: Uuid, status: RequestStatus) -> RepositoryResult<Request> {
        use crate::schema::requests;

        let mut conn = self.pool.get()?;
        let row = diesel::update(requests::table.find(id))
            .set((
                requests::status.eq(status.as_str()),
                requests::updated_at.eq(Utc::now().naive_utc()),
            ))
            .get_result::<models::Request>(&mut conn)?;
        row.try_into()
    }

    fn set_request_pending(&self, id: Uuid, pending_documents: i32) -> RepositoryResult<()> {
        use crate::schema::requests;

        let mut conn = self.pool.get()?;
        diesel::update(requests::table.find(id))
            .set((
                requests::pending_documents.eq(pending_documents),
                requests::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut conn)?;
        Ok(())
    }

    fn mark_email_sent(
        &self,
        id: Uuid,
        credentials: &IssuedCredentials,
        at: DateTime<Utc>,
    ) -> RepositoryResult<bool> {
        use crate::schema::requests;

        let mut conn = self.pool.get()?;
        let credentials = serde_json::to_value(credentials)?;
        let updated = diesel::update(
            requests::table
                .filter(requests::id.eq(id))
                .filter(requests::email_sent.eq(false)),
        )
        .set((
            requests::email_sent.eq(true),
            requests::email_sent_at.eq(Some(at.naive_utc())),
            requests::client_credentials.eq(Some(credentials)),
            requests::updated_at.eq(at.naive_utc()),
        ))
        .execute(&mut conn)?;
        Ok(updated == 1)
    }
}

impl SlotStore for PgRepository {
    fn find_slot(&self, request_id: Uuid, slot: &str) -> RepositoryResult<Option<DocumentSlot>> {
        use crate::schema::document_slots;

        let mut conn = self.pool.get()?;
        document_slots::table
            .find((request_id, slot))
            .first::<models::DocumentSlot>(&mut conn)
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    fn list_slots(&self, request_id: Uuid) -> RepositoryResult<Vec<DocumentSlot>> {
        use crate::schema::document_slots;

        let mut conn = self.pool.get()?;
        let rows = document_slots::table
            .filter(document_slots::request_id.eq(request_id))
            .order(document_slots::slot.asc())
            .load::<models::DocumentSlot>(&mut conn)?;
        convert_all(rows)
    }

    fn upsert_slot(&self, slot: &DocumentSlot) -> RepositoryResult<DocumentSlot> {
        use crate::schema::document_slots;

        let mut conn = self.pool.get()?;
        let values = models::DocumentSlot::from(slot);
        let row = diesel::insert_into(document_slots::table)
            .values(&values)
            .on_conflict((document_slots::request_id, document_slots::slot))
            .do_update()
            .set(&values)
            .get_result::<models::DocumentSlot>(&mut conn)?;
        row.try_into()
    }

    fn save_review(&self, slot: &DocumentSlot) -> RepositoryResult<Option<DocumentSlot>> {
        use crate::schema::document_slots;

        let mut conn = self.pool.get()?;
        let target = document_slots::table
            .find((slot.request_id, &slot.slot))
            .filter(document_slots::status.eq(SlotStatus::Validating.as_str()))
            .filter(document_slots::storage_path.eq(&slot.storage_path));
        let row = diesel::update(target)
            .set((
                document_slots::status.eq(slot.status.as_str()),
                document_slots::reject_reason.eq(slot.reject_reason.as_deref()),
                document_slots::reviewed_by.eq(slot.reviewed_by),
                document_slots::reviewed_at.eq(slot.reviewed_at.map(|at| at.naive_utc())),
            ))
            .get_result::<models::DocumentSlot>(&mut conn)
            .optional()?;
        row.map(TryInto::try_into).transpose()
    }
}

impl OwnershipStore for PgRepository {
    fn repair_owners(
        &self,
        collection: OwnedCollection,
        actor: Uuid,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Uuid>> {
        use crate::schema::{clients, document_lists, ownership_repairs};

        let mut conn = self.pool.get()?;
        let stamp = at.naive_utc();
        conn.transaction::<_, RepositoryError, _>(|conn| {
            let fixed: Vec<Uuid> = match collection {
                OwnedCollection::Clients => diesel::update(
                    clients::table.filter(clients::created_by.is_null()),
                )
                .set((
                    clients::created_by.eq(Some(actor)),
                    clients::updated_at.eq(stamp),
                ))
                .returning(clients::id)
                .get_results(conn)?,
                OwnedCollection::DocumentLists => diesel::update(
                    document_lists::table.filter(document_lists::created_by.is_null()),
                )
                .set((
                    document_lists::created_by.eq(Some(actor)),
                    document_lists::updated_at.eq(stamp),
                ))
                .returning(document_lists::id)
                .get_results(conn)?,
            };

            if !fixed.is_empty() {
                diesel::insert_into(ownership_repairs::table)
                    .values(models::OwnershipRepair {
                        id: Uuid::new_v4(),
                        actor_id: actor,
                        collection: collection.as_str().to_string(),
                        record_ids: fixed.clone(),
                        fixed_count: fixed.len() as i32,
                        performed_at: stamp,
                    })
                    .execute(conn)?;
            }

            Ok(fixed)
        })
    }

    fn list_ownership_repairs(&self) -> RepositoryResult<Vec<OwnershipRepair>> {
        use crate::schema::ownership_repairs;

        let mut conn = self.pool.get()?;
        let rows = ownership_repairs::table
            .order(ownership_repairs::performed_at.asc())
            .load::<models::OwnershipRepair>(&mut conn)?;
        convert_all(rows)
    }
}
