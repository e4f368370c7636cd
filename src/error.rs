use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::cache::CacheError;
use crate::utils::{error_codes, error_to_api_response};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("请求次数超过限制")]
    Throttled,

    #[error("重复的键")]
    DuplicateKey,

    /// 查询本身失败，按客户端错误处理
    #[error("数据库错误")]
    Query(#[source] sqlx::Error),

    /// 连接池、IO 等存储层故障
    #[error("存储服务不可用")]
    Storage(#[source] sqlx::Error),

    #[error("缓存服务不可用")]
    Cache(#[from] CacheError),

    #[error("文件操作失败")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::DuplicateKey,
            sqlx::Error::Database(_) => AppError::Query(e),
            _ => AppError::Storage(e),
        }
    }
}

impl From<axum_extra::extract::QueryRejection> for AppError {
    fn from(rejection: axum_extra::extract::QueryRejection) -> Self {
        AppError::BadRequest(format!("查询参数错误: {rejection}"))
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::DuplicateKey | AppError::Query(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) | AppError::Throttled => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Storage(_) | AppError::Cache(_) | AppError::Io(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            AppError::BadRequest(_) => error_codes::VALIDATION_ERROR,
            AppError::DuplicateKey => error_codes::DUPLICATE_KEY,
            AppError::Query(_) => error_codes::DATABASE_ERROR,
            AppError::Unauthorized(_) => error_codes::AUTH_FAILED,
            AppError::Forbidden(_) => error_codes::PERMISSION_DENIED,
            AppError::Throttled => error_codes::RATE_LIMIT,
            AppError::NotFound(_) => error_codes::NOT_FOUND,
            _ => error_codes::INTERNAL_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Query(e) => tracing::warn!(error = %e, "query failed"),
            AppError::Storage(e) => tracing::error!(error = %e, "storage error"),
            AppError::Cache(e) => tracing::error!(error = %e, "cache error"),
            AppError::Io(e) => tracing::error!(error = %e, "io error"),
            AppError::Internal(e) => tracing::error!(error = %e, "internal error"),
            _ => {}
        }

        let status = self.status();
        let body = error_to_api_response::<()>(self.code(), self.to_string());
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_row_not_found_to_server_error() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn throttle_is_permission_denied() {
        assert_eq!(AppError::Throttled.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Throttled.code(), error_codes::RATE_LIMIT);
    }
}
