use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use crate::{
    AppState,
    auth::parse_bearer,
    error::AppError,
};

/// 解析 Bearer 令牌并把载荷放进请求扩展
///
/// 没有 Authorization 头的请求按匿名用户放行，是否必须登录由各个接口的
/// 提取器决定。格式错误返回 400，验签失败、过期或已封禁返回 401。
pub async fn bearer_token_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(header) = req.headers().get(AUTHORIZATION) else {
        return Ok(next.run(req).await);
    };

    let raw = header
        .to_str()
        .map_err(|_| AppError::BadRequest("令牌格式错误".into()))?;
    let token = parse_bearer(raw)?;

    let claims = state.tokens.authenticate(state.cache.as_ref(), token).await?;
    tracing::debug!(sub = claims.sub, token_type = ?claims.token_type, "bearer token accepted");

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
