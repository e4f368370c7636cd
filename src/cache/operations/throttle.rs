use std::time::Duration;

use crate::cache::{CacheError, CacheStore};

/// 限流窗口长度
pub const THROTTLE_WINDOW: Duration = Duration::from_secs(60);

/// 限流计数缓存操作
pub struct ThrottleCacheOperations;

impl ThrottleCacheOperations {
    /// 读取当前窗口内的请求数，不存在时为 0
    pub async fn current(cache: &dyn CacheStore, key: &str) -> Result<i64, CacheError> {
        match cache.get(key).await? {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| CacheError::NotAnInteger(key.to_string())),
            None => Ok(0),
        }
    }

    /// 原子地加一，并把过期时间固定为窗口长度
    pub async fn increment(cache: &dyn CacheStore, key: &str) -> Result<i64, CacheError> {
        cache.incr(key, THROTTLE_WINDOW).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[tokio::test]
    async fn counts_per_key() {
        let cache = MemoryCache::new();
        assert_eq!(ThrottleCacheOperations::current(&cache, "a").await.unwrap(), 0);

        ThrottleCacheOperations::increment(&cache, "a").await.unwrap();
        ThrottleCacheOperations::increment(&cache, "a").await.unwrap();
        ThrottleCacheOperations::increment(&cache, "b").await.unwrap();

        assert_eq!(ThrottleCacheOperations::current(&cache, "a").await.unwrap(), 2);
        assert_eq!(ThrottleCacheOperations::current(&cache, "b").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let cache = std::sync::Arc::new(MemoryCache::new());
        let mut handles = Vec::new();
        for _ in 0..20 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                ThrottleCacheOperations::increment(cache.as_ref(), "k").await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(ThrottleCacheOperations::current(cache.as_ref(), "k").await.unwrap(), 20);
    }
}
