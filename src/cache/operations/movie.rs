use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use crate::cache::keys::MOVIE_RECENT_KEY;
use crate::cache::{CacheError, CacheStore};

/// 最新电影列表的缓存时长
pub const MOVIE_RECENT_TTL: Duration = Duration::from_secs(10);

/// 电影列表缓存操作
pub struct MovieCacheOperations;

impl MovieCacheOperations {
    pub async fn get_recent<T: DeserializeOwned>(
        cache: &dyn CacheStore,
    ) -> Result<Option<Vec<T>>, CacheError> {
        match cache.get(MOVIE_RECENT_KEY).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub async fn cache_recent<T: Serialize>(
        cache: &dyn CacheStore,
        movies: &[T],
    ) -> Result<(), CacheError> {
        let json = serde_json::to_string(movies)?;
        cache.set(MOVIE_RECENT_KEY, &json, MOVIE_RECENT_TTL).await
    }
}
