use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    AppState,
    auth::{AuthUser, MaybeUser, Role},
    cache::MovieCacheOperations,
    error::AppResult,
    pagination::{CursorQuery, next_cursor},
    utils::{ApiQuery, success_to_api_response},
};

use super::like::toggle_like;
use super::model::{
    CreateMovieRequest, Movie, MovieList, MovieListQuery, MovieView, SORT_COLUMNS,
    UpdateMovieRequest, with_relations,
};

#[axum::debug_handler]
pub async fn find_all(
    State(state): State<AppState>,
    user: MaybeUser,
    ApiQuery(query): ApiQuery<MovieListQuery>,
) -> AppResult<impl IntoResponse> {
    let take = query.take()?;
    let cursor = CursorQuery::new(SORT_COLUMNS, &query.order(), query.cursor.as_deref())?;

    let (movies, count) =
        Movie::find_page(&state.pool, query.title.as_deref(), &cursor, take).await?;
    let data = with_relations(&state.pool, movies, &state.config.asset_base_url, user.id()).await?;
    let next_cursor = next_cursor(&data, &cursor.order())?;

    Ok(success_to_api_response(MovieList {
        data,
        next_cursor,
        count,
    }))
}

#[axum::debug_handler]
pub async fn find_recent(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<impl IntoResponse> {
    if let Some(cached) = MovieCacheOperations::get_recent::<MovieView>(state.cache.as_ref()).await? {
        tracing::debug!("recent movies served from cache");
        return Ok(success_to_api_response(cached));
    }

    let movies: Vec<MovieView> = Movie::find_recent(&state.pool)
        .await?
        .iter()
        .map(|m| MovieView::new(m, &state.config.asset_base_url))
        .collect();

    MovieCacheOperations::cache_recent(state.cache.as_ref(), &movies).await?;
    Ok(success_to_api_response(movies))
}

#[axum::debug_handler]
pub async fn find_one(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let movie = Movie::find_one(&state.pool, id, &state.config.asset_base_url).await?;
    Ok(success_to_api_response(movie))
}

#[axum::debug_handler]
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateMovieRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_role(Role::Admin)?;

    let id = Movie::create(&state.pool, &state.storage, req, user.id()).await?;
    let movie = Movie::find_one(&state.pool, id, &state.config.asset_base_url).await?;
    Ok(success_to_api_response(movie))
}

#[axum::debug_handler]
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateMovieRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_role(Role::Admin)?;

    Movie::update(&state.pool, id, req).await?;
    let movie = Movie::find_one(&state.pool, id, &state.config.asset_base_url).await?;
    Ok(success_to_api_response(movie))
}

#[axum::debug_handler]
pub async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    user.require_role(Role::Admin)?;

    let id = Movie::delete(&state.pool, id).await?;
    Ok(success_to_api_response(id))
}

#[axum::debug_handler]
pub async fn like(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let status = toggle_like(&state.pool, id, user.id(), true).await?;
    Ok(success_to_api_response(status))
}

#[axum::debug_handler]
pub async fn dislike(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let status = toggle_like(&state.pool, id, user.id(), false).await?;
    Ok(success_to_api_response(status))
}

