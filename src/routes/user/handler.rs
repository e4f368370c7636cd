use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    AppState,
    auth::{AuthUser, Role},
    error::{AppError, AppResult},
    utils::success_to_api_response,
};

use super::model::{CreateUserRequest, UpdateUserRequest, User};

#[axum::debug_handler]
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_role(Role::Admin)?;

    let created = User::create(
        &state.pool,
        &req.email,
        &req.password,
        req.role.unwrap_or(Role::User),
        state.config.hash_rounds,
    )
    .await?;
    Ok(success_to_api_response(created))
}

#[axum::debug_handler]
pub async fn find_all(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    user.require_role(Role::Admin)?;

    let users = User::find_all(&state.pool).await?;
    Ok(success_to_api_response(users))
}

#[axum::debug_handler]
pub async fn find_one(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    user.require_role(Role::Admin)?;

    let found = User::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("用户不存在".into()))?;
    Ok(success_to_api_response(found))
}

#[axum::debug_handler]
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_role(Role::Admin)?;

    let updated = User::update(&state.pool, id, req, state.config.hash_rounds).await?;
    Ok(success_to_api_response(updated))
}

#[axum::debug_handler]
pub async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    user.require_role(Role::Admin)?;

    let id = User::delete(&state.pool, id).await?;
    tracing::info!(admin = user.id(), deleted = id, "user removed");
    Ok(success_to_api_response(id))
}
