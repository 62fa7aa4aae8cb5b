use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    domain::client::{Address, Client, ClientDraft, ClientStatus, ClientUpdate},
    error::AppResult,
    services::clients,
    state::AppState,
};

#[derive(Serialize)]
pub struct ClientResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: Address,
    pub notes: String,
    pub status: ClientStatus,
    pub created_by: Option<Uuid>,
    pub documents_count: i32,
    pub pending_documents: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Client> for ClientResponse {
    fn from(client: Client) -> Self {
        Self {
            id: client.id,
            first_name: client.first_name,
            last_name: client.last_name,
            full_name: client.full_name,
            email: client.email,
            phone: client.phone,
            address: client.address,
            notes: client.notes,
            status: client.status,
            created_by: client.created_by,
            documents_count: client.documents_count,
            pending_documents: client.pending_documents,
            created_at: client.created_at,
            updated_at: client.updated_at,
        }
    }
}

pub async fn list_clients(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<ClientResponse>>> {
    let clients = clients::list_clients(state.repo(), &user.actor())?;
    Ok(Json(clients.into_iter().map(ClientResponse::from).collect()))
}

pub async fn create_client(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ClientDraft>,
) -> AppResult<(StatusCode, Json<ClientResponse>)> {
    let client = clients::create_client(state.repo(), &user.actor(), payload)?;
    Ok((StatusCode::CREATED, Json(client.into())))
}

pub async fn get_client(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(client_id): Path<Uuid>,
) -> AppResult<Json<ClientResponse>> {
    let client = clients::get_client(state.repo(), &user.actor(), client_id)?;
    Ok(Json(client.into()))
}

pub async fn update_client(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(client_id): Path<Uuid>,
    Json(payload): Json<ClientUpdate>,
) -> AppResult<Json<ClientResponse>> {
    let client = clients::update_client(state.repo(), &user.actor(), client_id, payload)?;
    Ok(Json(client.into()))
}
