use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    domain::account::{Role, User},
    error::{AppError, AppResult},
    services::{accounts, ServiceError},
    state::AppState,
};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ClientLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub quota_remaining: i32,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            quota_remaining: user.quota_remaining,
        }
    }
}

#[derive(Serialize)]
pub struct ClientLoginResponse {
    #[serde(flatten)]
    pub token: LoginResponse,
    pub client_id: Uuid,
    pub request_id: Uuid,
    pub client_name: String,
}

fn issue_token(
    state: &AppState,
    subject: Uuid,
    username: &str,
    role: Role,
) -> AppResult<LoginResponse> {
    let access_token = state.jwt.generate_token(subject, username, role)?;
    Ok(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.expires_in_secs(),
    })
}

fn credential_failure(err: ServiceError, who: &str) -> AppError {
    match err {
        ServiceError::InvalidCredentials => {
            warn!(component = "auth", username = %who, "login rejected");
            AppError::unauthorized()
        }
        other => other.into(),
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = accounts::register(state.repo(), &payload.email, &payload.password)?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = accounts::authenticate(state.repo(), &payload.username, &payload.password)
        .map_err(|err| credential_failure(err, &payload.username))?;
    info!(component = "auth", user_id = %user.id, role = %user.role, "user logged in");
    Ok(Json(issue_token(&state, user.id, &user.username, user.role)?))
}

/// Login with the one-time credentials sent in a request email.
pub async fn client_login(
    State(state): State<AppState>,
    Json(payload): Json<ClientLoginRequest>,
) -> AppResult<Json<ClientLoginResponse>> {
    let account = accounts::authenticate_client(state.repo(), &payload.email, &payload.password)
        .map_err(|err| credential_failure(err, &payload.email))?;
    info!(
        component = "auth",
        client_id = %account.id,
        request_id = %account.request_id,
        "client logged in"
    );
    let token = issue_token(&state, account.id, &account.email, Role::Client)?;
    Ok(Json(ClientLoginResponse {
        token,
        client_id: account.id,
        request_id: account.request_id,
        client_name: account.client_name,
    }))
}

pub async fn me(user: AuthenticatedUser) -> Json<AuthenticatedUser> {
    Json(user)
}
