use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    AppState,
    auth::{AuthUser, Role},
    error::{AppError, AppResult},
    utils::{ApiQuery, success_to_api_response},
};

use super::model::{CreateDirectorRequest, Director, DirectorQuery, UpdateDirectorRequest};

#[axum::debug_handler]
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateDirectorRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_role(Role::Admin)?;

    let director = Director::create(&state.pool, req).await?;
    tracing::info!(id = director.id, "director created");
    Ok(success_to_api_response(director))
}

#[axum::debug_handler]
pub async fn find_all(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<DirectorQuery>,
) -> AppResult<impl IntoResponse> {
    let directors = Director::find_all(&state.pool, query.name.as_deref()).await?;
    Ok(success_to_api_response(directors))
}

#[axum::debug_handler]
pub async fn find_one(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let director = Director::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("导演不存在".into()))?;
    Ok(success_to_api_response(director))
}

#[axum::debug_handler]
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateDirectorRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_role(Role::Admin)?;

    let director = Director::update(&state.pool, id, req).await?;
    Ok(success_to_api_response(director))
}

#[axum::debug_handler]
pub async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    user.require_role(Role::Admin)?;

    let id = Director::delete(&state.pool, id).await?;
    Ok(success_to_api_response(id))
}
