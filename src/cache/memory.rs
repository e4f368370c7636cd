use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};

use super::{CacheError, CacheStore, ttl_secs};

/// 进程内最多保留的键数量
const MAX_CAPACITY: u64 = 100_000;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

impl Entry {
    fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            ttl: Duration::from_secs(ttl_secs(ttl)),
        }
    }
}

/// 每个键按写入时给的 ttl 过期，覆盖写入会重新计时
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// 进程内缓存，未配置 Redis 时使用，测试也依赖它
pub struct MemoryCache {
    entries: Cache<String, Entry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(MAX_CAPACITY)
    }

    pub fn with_capacity(max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { entries }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.get(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .insert(key.to_string(), Entry::new(value.to_string(), ttl))
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.invalidate(key).await;
        Ok(())
    }

    async fn incr(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        // 同一个键的计算是串行的，非整数值保持不动
        let result = self
            .entries
            .entry(key.to_string())
            .and_compute_with(|current| {
                let op = match current.map(|e| e.into_value()) {
                    None => Op::Put(Entry::new("1".to_string(), ttl)),
                    Some(entry) => match entry.value.parse::<i64>() {
                        Ok(n) => Op::Put(Entry::new((n + 1).to_string(), ttl)),
                        Err(_) => Op::Nop,
                    },
                };
                std::future::ready(op)
            })
            .await;

        match result {
            CompResult::Inserted(entry) | CompResult::ReplacedWith(entry) => entry
                .into_value()
                .value
                .parse::<i64>()
                .map_err(|_| CacheError::NotAnInteger(key.to_string())),
            _ => Err(CacheError::NotAnInteger(key.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn set_get_delete() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_secs(10)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));

        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn incr_counts_from_one() {
        let cache = MemoryCache::new();
        assert_eq!(cache.incr("c", Duration::from_secs(60)).await.unwrap(), 1);
        assert_eq!(cache.incr("c", Duration::from_secs(60)).await.unwrap(), 2);
        assert_eq!(cache.get("c").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn incr_rejects_non_integer() {
        let cache = MemoryCache::new();
        cache.set("c", "abc", Duration::from_secs(60)).await.unwrap();
        assert!(matches!(
            cache.incr("c", Duration::from_secs(60)).await,
            Err(CacheError::NotAnInteger(_))
        ));
        assert_eq!(cache.get("c").await.unwrap().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn concurrent_incr_loses_no_update() {
        let cache = Arc::new(MemoryCache::new());
        let handles: Vec<_> = (0..50)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.incr("c", Duration::from_secs(60)).await.unwrap() })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(cache.get("c").await.unwrap().as_deref(), Some("50"));
    }

    #[tokio::test]
    async fn expired_entries_are_evicted_without_being_read() {
        let cache = MemoryCache::new();
        for i in 0..1000 {
            cache
                .set(&format!("token:{i}"), "v", Duration::from_secs(1))
                .await
                .unwrap();
        }
        cache.set("long", "v", Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;
        cache.entries.run_pending_tasks().await;

        assert_eq!(cache.entries.entry_count(), 1);
        assert_eq!(cache.get("token:0").await.unwrap(), None);
        assert_eq!(cache.get("long").await.unwrap().as_deref(), Some("v"));
    }
}
