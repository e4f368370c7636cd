/// 缓存键模块
/// 令牌相关的键只保存原始令牌的摘要，不直接把令牌写进键名
use sha2::{Digest, Sha256};

/// 已验证令牌载荷缓存键前缀
const TOKEN_PREFIX: &str = "token:";

/// 已封禁令牌缓存键前缀
const BLOCK_TOKEN_PREFIX: &str = "block_token:";

/// 限流计数缓存键前缀
const THROTTLE_PREFIX: &str = "throttle:";

/// 最新电影列表缓存键
pub const MOVIE_RECENT_KEY: &str = "movie:recent";

fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// 生成令牌载荷缓存键
pub fn token_key(token: &str) -> String {
    format!("{}{}", TOKEN_PREFIX, token_digest(token))
}

/// 生成令牌封禁缓存键
pub fn block_token_key(token: &str) -> String {
    format!("{}{}", BLOCK_TOKEN_PREFIX, token_digest(token))
}

/// 生成限流窗口缓存键，按 方法_路径_用户_分钟 区分
pub fn throttle_key(method: &str, path: &str, user_id: i64, minute: u32) -> String {
    format!("{}{}_{}_{}_{}", THROTTLE_PREFIX, method, path, user_id, minute)
}
