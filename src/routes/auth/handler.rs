use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header::AUTHORIZATION},
    response::IntoResponse,
};

use crate::{
    AppState,
    auth::{AuthUser, BasicCredentials, RefreshUser, Role, TokenType, parse_basic},
    error::{AppError, AppResult},
    routes::user::User,
    utils::{success_to_api_response, verify_password},
};

use super::model::{AccessTokenResponse, BlockTokenRequest, LoginResponse};

/// 注册和登录都从 Basic 头读取账号密码
fn basic_credentials(headers: &HeaderMap) -> AppResult<BasicCredentials> {
    let raw = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::BadRequest("缺少 Authorization 头".into()))?
        .to_str()
        .map_err(|_| AppError::BadRequest("令牌格式错误".into()))?;
    parse_basic(raw)
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let creds = basic_credentials(&headers)?;

    if User::find_by_email(&state.pool, &creds.email).await?.is_some() {
        return Err(AppError::BadRequest("该邮箱已经注册".into()));
    }

    let user = User::create(
        &state.pool,
        &creds.email,
        &creds.password,
        Role::User,
        state.config.hash_rounds,
    )
    .await?;
    Ok(success_to_api_response(user))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let creds = basic_credentials(&headers)?;
    let invalid = || AppError::BadRequest("邮箱或密码错误".into());

    let user = User::find_by_email(&state.pool, &creds.email)
        .await?
        .ok_or_else(invalid)?;

    let matched = verify_password(&creds.password, &user.password)
        .map_err(|e| AppError::Internal(format!("Failed to verify password: {}", e)))?;
    if !matched {
        tracing::info!(user = user.id, "login rejected: wrong password");
        return Err(invalid());
    }

    let response = LoginResponse {
        refresh_token: state.tokens.issue(user.id, user.role, TokenType::Refresh)?,
        access_token: state.tokens.issue(user.id, user.role, TokenType::Access)?,
    };
    tracing::info!(user = user.id, "user logged in");
    Ok(success_to_api_response(response))
}

/// 用刷新令牌换新的访问令牌
#[axum::debug_handler]
pub async fn rotate_access_token(
    State(state): State<AppState>,
    RefreshUser(claims): RefreshUser,
) -> AppResult<impl IntoResponse> {
    let access_token = state
        .tokens
        .issue(claims.sub, claims.role, TokenType::Access)?;
    Ok(success_to_api_response(AccessTokenResponse { access_token }))
}

#[axum::debug_handler]
pub async fn block_token(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<BlockTokenRequest>,
) -> AppResult<impl IntoResponse> {
    let blocked = state.tokens.block(state.cache.as_ref(), &req.token).await?;
    tracing::info!(by = user.id(), sub = blocked.sub, "token revoked");
    Ok(success_to_api_response(true))
}

#[axum::debug_handler]
pub async fn private(AuthUser(claims): AuthUser) -> AppResult<impl IntoResponse> {
    Ok(success_to_api_response(claims))
}
