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

use super::model::{CreateGenreRequest, Genre, UpdateGenreRequest};

#[axum::debug_handler]
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateGenreRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_role(Role::Admin)?;

    let genre = Genre::create(&state.pool, req).await?;
    Ok(success_to_api_response(genre))
}

#[axum::debug_handler]
pub async fn find_all(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let genres = Genre::find_all(&state.pool).await?;
    Ok(success_to_api_response(genres))
}

#[axum::debug_handler]
pub async fn find_one(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let genre = Genre::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("类型不存在".into()))?;
    Ok(success_to_api_response(genre))
}

#[axum::debug_handler]
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateGenreRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_role(Role::Admin)?;

    let genre = Genre::update(&state.pool, id, req).await?;
    Ok(success_to_api_response(genre))
}

#[axum::debug_handler]
pub async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    user.require_role(Role::Admin)?;

    let id = Genre::delete(&state.pool, id).await?;
    Ok(success_to_api_response(id))
}
