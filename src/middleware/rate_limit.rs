use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use chrono::{Timelike, Utc};

use crate::{
    auth::Claims,
    cache::{SharedCache, ThrottleCacheOperations, keys::throttle_key},
    error::AppError,
};

/// 按 方法+路径+用户+分钟 统计请求次数的固定窗口限流
#[derive(Clone)]
pub struct Throttle {
    cache: SharedCache,
    limit: u32,
}

impl Throttle {
    pub fn new(cache: SharedCache, limit: u32) -> Self {
        Self { cache, limit }
    }

    /// 当前计数达到上限即拒绝
    pub fn allows(&self, count: i64) -> bool {
        count < i64::from(self.limit)
    }

    pub async fn check(self, req: Request<Body>, next: Next) -> Result<Response, AppError> {
        // 未登录用户不限流
        let Some(user_id) = req.extensions().get::<Claims>().map(|c| c.sub) else {
            return Ok(next.run(req).await);
        };

        let path = req
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());
        let key = throttle_key(req.method().as_str(), &path, user_id, Utc::now().minute());

        let count = ThrottleCacheOperations::current(self.cache.as_ref(), &key).await?;
        tracing::debug!(key = %key, count, limit = self.limit, "throttle check");

        if !self.allows(count) {
            return Err(AppError::Throttled);
        }

        let response = next.run(req).await;

        if response.status().is_success() {
            if let Err(e) = ThrottleCacheOperations::increment(self.cache.as_ref(), &key).await {
                tracing::warn!(error = %e, key = %key, "failed to bump throttle counter");
            }
        }

        Ok(response)
    }
}

pub async fn throttle(
    State(throttle): State<Throttle>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    throttle.check(req, next).await
}
