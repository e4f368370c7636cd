use std::time::Duration;

use crate::auth::Claims;
use crate::cache::keys::{block_token_key, token_key};
use crate::cache::models::BlockedToken;
use crate::cache::{CacheError, CacheStore};

/// 载荷缓存比令牌提前失效的秒数
pub const PAYLOAD_SAFETY_MARGIN_SECS: i64 = 30;

/// 载荷缓存时长：剩余有效期减去安全余量，至少一秒
pub fn payload_ttl(exp: i64, now: i64) -> Duration {
    Duration::from_secs((exp - now - PAYLOAD_SAFETY_MARGIN_SECS).max(1) as u64)
}

/// 封禁标记时长：令牌剩余有效期，至少一秒
pub fn block_ttl(exp: i64, now: i64) -> Duration {
    Duration::from_secs((exp - now).max(1) as u64)
}

/// 令牌缓存操作
pub struct TokenCacheOperations;

impl TokenCacheOperations {
    /// 缓存已验证的令牌载荷
    pub async fn cache_payload(
        cache: &dyn CacheStore,
        token: &str,
        claims: &Claims,
        now: i64,
    ) -> Result<(), CacheError> {
        let json = serde_json::to_string(claims)?;
        cache
            .set(&token_key(token), &json, payload_ttl(claims.exp, now))
            .await
    }

    /// 获取已缓存的令牌载荷
    pub async fn get_payload(
        cache: &dyn CacheStore,
        token: &str,
    ) -> Result<Option<Claims>, CacheError> {
        match cache.get(&token_key(token)).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// 封禁令牌，同时移除其载荷缓存
    pub async fn block(
        cache: &dyn CacheStore,
        token: &str,
        claims: &Claims,
        now: i64,
    ) -> Result<(), CacheError> {
        let marker = BlockedToken {
            blocked: true,
            sub: claims.sub,
            expires_at: claims.exp,
        };
        let json = serde_json::to_string(&marker)?;

        cache
            .set(&block_token_key(token), &json, block_ttl(claims.exp, now))
            .await?;
        cache.delete(&token_key(token)).await
    }

    pub async fn is_blocked(cache: &dyn CacheStore, token: &str) -> Result<bool, CacheError> {
        match cache.get(&block_token_key(token)).await? {
            Some(json) => {
                let marker: BlockedToken = serde_json::from_str(&json)?;
                Ok(marker.blocked)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_ttl_keeps_margin() {
        assert_eq!(payload_ttl(1_000, 700), Duration::from_secs(270));
    }

    #[test]
    fn ttls_floor_at_one_second() {
        assert_eq!(payload_ttl(1_000, 990), Duration::from_secs(1));
        assert_eq!(payload_ttl(1_000, 2_000), Duration::from_secs(1));
        assert_eq!(block_ttl(1_000, 1_000), Duration::from_secs(1));
    }

    #[test]
    fn block_ttl_matches_remaining_lifetime() {
        assert_eq!(block_ttl(1_000, 700), Duration::from_secs(300));
    }
}
