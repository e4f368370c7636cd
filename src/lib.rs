use std::sync::Arc;

use auth::TokenService;
use cache::SharedCache;
use config::Config;
use sqlx::PgPool;
use storage::AssetStorage;

pub mod auth;
pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod pagination;
pub mod result;
pub mod router;
pub mod routes;
pub mod storage;
pub mod tasks;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub cache: SharedCache,
    pub tokens: TokenService,
    pub storage: AssetStorage,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config, cache: SharedCache) -> Self {
        let tokens = TokenService::from_config(&config);
        let storage = AssetStorage::new(config.temp_dir(), config.movie_dir());
        Self {
            pool,
            config: Arc::new(config),
            cache,
            tokens,
            storage,
        }
    }
}
