use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    /// 未配置时使用进程内缓存
    pub redis_url: Option<String>,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_expiration_secs: u64,
    pub refresh_token_expiration_secs: u64,
    pub hash_rounds: u32,
    pub server_host: String,
    pub server_port: u16,
    pub public_dir: String,
    pub asset_base_url: String,
    pub upload_max_bytes: usize,
    pub orphan_file_max_age_secs: u64,
    pub orphan_sweep_interval_secs: u64,
    pub like_count_interval_secs: u64,
    pub movie_list_throttle: u32,
    /// 日志文件目录，文件名固定为 logs.log
    pub log_dir: String,
}

/// 解析时长，支持 `h` 后缀表示小时，否则按秒计算
fn parse_duration_secs(raw: &str, default: u64) -> u64 {
    let raw = raw.trim();
    match raw.strip_suffix('h') {
        Some(hours) => hours.parse::<u64>().map(|h| h * 3600).unwrap_or(default),
        None => raw.parse::<u64>().unwrap_or(default),
    }
}

fn optional_secs(key: &str, default: u64) -> u64 {
    env::var(key)
        .map(|v| parse_duration_secs(&v, default))
        .unwrap_or(default)
}

fn optional<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL").ok().filter(|v| !v.trim().is_empty()),
            access_token_secret: env::var("ACCESS_TOKEN_SECRET")?,
            refresh_token_secret: env::var("REFRESH_TOKEN_SECRET")?,
            access_token_expiration_secs: optional_secs("ACCESS_TOKEN_EXPIRATION", 300),
            refresh_token_expiration_secs: optional_secs("REFRESH_TOKEN_EXPIRATION", 24 * 3600),
            hash_rounds: optional("HASH_ROUNDS", 10),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            server_port: optional("SERVER_PORT", 3000),
            public_dir: env::var("PUBLIC_DIR").unwrap_or_else(|_| "public".into()),
            asset_base_url: env::var("ASSET_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            upload_max_bytes: optional("UPLOAD_MAX_BYTES", 20 * 1024 * 1024),
            orphan_file_max_age_secs: optional_secs("ORPHAN_FILE_MAX_AGE", 24 * 3600),
            orphan_sweep_interval_secs: optional_secs("ORPHAN_SWEEP_INTERVAL", 3600),
            like_count_interval_secs: optional_secs("LIKE_COUNT_INTERVAL", 60),
            movie_list_throttle: optional("MOVIE_LIST_THROTTLE", 5),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".into()),
        })
    }

    pub fn access_token_expiration(&self) -> Duration {
        Duration::from_secs(self.access_token_expiration_secs)
    }

    pub fn refresh_token_expiration(&self) -> Duration {
        Duration::from_secs(self.refresh_token_expiration_secs)
    }

    pub fn orphan_file_max_age(&self) -> Duration {
        Duration::from_secs(self.orphan_file_max_age_secs)
    }

    pub fn orphan_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.orphan_sweep_interval_secs)
    }

    pub fn like_count_interval(&self) -> Duration {
        Duration::from_secs(self.like_count_interval_secs)
    }

    /// 上传文件的临时目录
    pub fn temp_dir(&self) -> PathBuf {
        PathBuf::from(&self.public_dir).join("temp")
    }

    /// 电影文件的正式目录
    pub fn movie_dir(&self) -> PathBuf {
        PathBuf::from(&self.public_dir).join("movie")
    }
}
