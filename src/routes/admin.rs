use axum::{extract::State, Json};

use crate::{
    auth::AuthenticatedUser,
    error::AppResult,
    services::ownership::{self, RepairReport},
    state::AppState,
};

pub async fn repair_ownership(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<RepairReport>> {
    Ok(Json(ownership::repair_ownership(
        state.repo(),
        &user.actor(),
    )?))
}
