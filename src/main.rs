use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use movieflix::{
    AppState,
    cache::{MemoryCache, RedisCache, SharedCache},
    config::Config,
    database, logging, router, tasks,
};

#[tokio::main]
async fn main() {
    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 初始化日志
    let _log_guard = logging::init(&config.log_dir).expect("Failed to open log file");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 设置数据库连接池并执行迁移
    let pool = database::connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");
    database::MIGRATOR
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // 未配置 Redis 时使用进程内缓存
    let cache: SharedCache = match &config.redis_url {
        Some(url) => Arc::new(RedisCache::open(url).expect("Failed to create Redis client")),
        None => {
            tracing::warn!("REDIS_URL not set, using in-process cache");
            Arc::new(MemoryCache::new())
        }
    };

    let state = AppState::new(pool, config, cache);

    tasks::spawn_tasks(&state);

    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    let app = router::create_router(state);

    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
