use serde::{Deserialize, Serialize};

/// 令牌封禁标记
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BlockedToken {
    pub blocked: bool,
    pub sub: i64,
    pub expires_at: i64, // Unix timestamp
}
