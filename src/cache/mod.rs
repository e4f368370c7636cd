// 缓存模块
// 对外只暴露 get/set/delete/incr 四个原语，具体实现可以是 Redis 或进程内存

pub mod keys;
pub mod memory;
pub mod models;
pub mod operations;
pub mod redis_store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryCache;
pub use operations::{MovieCacheOperations, ThrottleCacheOperations, TokenCacheOperations};
pub use redis_store::RedisCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("value under {0} is not an integer")]
    NotAnInteger(String),
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// ttl 不足一秒时按一秒处理
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// 原子自增并把过期时间设置为 ttl，返回自增后的值
    async fn incr(&self, key: &str, ttl: Duration) -> Result<i64, CacheError>;
}

pub type SharedCache = Arc<dyn CacheStore>;

pub(crate) fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}
