use axum::{Json, extract::FromRequestParts};
use bcrypt::{hash, verify};
use serde::Serialize;

use crate::{error::AppError, result::ApiResponse};

/// 查询参数解析失败时按统一格式返回 400
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum_extra::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

pub fn hash_password(password: &str, rounds: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), rounds)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: error_codes::SUCCESS,
        msg: "success".into(),
        resp_data: Some(data),
    })
}

pub fn error_to_api_response<T>(code: i32, msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code,
        msg,
        resp_data: None,
    })
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const DUPLICATE_KEY: i32 = 1001;
    pub const AUTH_FAILED: i32 = 1002;
    pub const PERMISSION_DENIED: i32 = 1003;
    pub const NOT_FOUND: i32 = 1004;
    pub const RATE_LIMIT: i32 = 1005;
    pub const DATABASE_ERROR: i32 = 1006;
    pub const INTERNAL_ERROR: i32 = 5000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        // 测试用最低成本
        let hashed = hash_password("1234", 4).unwrap();
        assert!(verify_password("1234", &hashed).unwrap());
        assert!(!verify_password("4321", &hashed).unwrap());
    }

    #[test]
    fn error_envelope_has_no_data() {
        let Json(body) = error_to_api_response::<()>(error_codes::NOT_FOUND, "x".into());
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["code"], 1004);
        assert!(value.get("resp_data").is_none());
    }
}
