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
    domain::document_list::{
        DocumentDefinition, DocumentList, DocumentListDraft, DocumentListUpdate, ListCategory,
    },
    error::AppResult,
    services::document_lists,
    state::AppState,
};

#[derive(Serialize)]
pub struct DocumentListResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: ListCategory,
    pub documents: Vec<DocumentDefinition>,
    pub is_template: bool,
    pub usage_count: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DocumentList> for DocumentListResponse {
    fn from(list: DocumentList) -> Self {
        Self {
            id: list.id,
            name: list.name,
            description: list.description,
            category: list.category,
            documents: list.documents,
            is_template: list.is_template,
            usage_count: list.usage_count,
            created_by: list.created_by,
            created_at: list.created_at,
            updated_at: list.updated_at,
        }
    }
}

fn respond_all(lists: Vec<DocumentList>) -> Json<Vec<DocumentListResponse>> {
    Json(lists.into_iter().map(DocumentListResponse::from).collect())
}

pub async fn list_lists(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<DocumentListResponse>>> {
    Ok(respond_all(document_lists::list_lists(
        state.repo(),
        &user.actor(),
    )?))
}

pub async fn create_list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<DocumentListDraft>,
) -> AppResult<(StatusCode, Json<DocumentListResponse>)> {
    let list = document_lists::create_list(state.repo(), &user.actor(), payload)?;
    Ok((StatusCode::CREATED, Json(list.into())))
}

pub async fn seed_samples(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<(StatusCode, Json<Vec<DocumentListResponse>>)> {
    let lists = document_lists::seed_samples(state.repo(), &user.actor())?;
    Ok((StatusCode::CREATED, respond_all(lists)))
}

pub async fn get_list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(list_id): Path<Uuid>,
) -> AppResult<Json<DocumentListResponse>> {
    let list = document_lists::get_list(state.repo(), &user.actor(), list_id)?;
    Ok(Json(list.into()))
}

pub async fn update_list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(list_id): Path<Uuid>,
    Json(payload): Json<DocumentListUpdate>,
) -> AppResult<Json<DocumentListResponse>> {
    let list = document_lists::update_list(state.repo(), &user.actor(), list_id, payload)?;
    Ok(Json(list.into()))
}

pub async fn delete_list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(list_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    document_lists::delete_list(state.repo(), &user.actor(), list_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn duplicate_list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(list_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<DocumentListResponse>)> {
    let list = document_lists::duplicate_list(state.repo(), &user.actor(), list_id)?;
    Ok((StatusCode::CREATED, Json(list.into())))
}
