use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::auth::Role;
use crate::error::{AppError, AppResult};
use crate::utils::hash_password;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub role: Role,
    #[serde(skip_serializing, default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing, default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

const USER_COLUMNS: &str = "id, email, password, role, created_at, updated_at";

pub(crate) fn validate_email(email: &str) -> AppResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest("邮箱格式错误".into()))
    }
}

impl User {
    pub async fn create(
        pool: &PgPool,
        email: &str,
        password: &str,
        role: Role,
        hash_rounds: u32,
    ) -> AppResult<Self> {
        validate_email(email)?;

        let password_hash = hash_password(password, hash_rounds)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password, role)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(pool)
        .await?;

        tracing::info!("Created user: {}", user.id);
        Ok(user)
    }

    pub async fn find_all(pool: &PgPool) -> AppResult<Vec<Self>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> AppResult<Option<Self>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> AppResult<Option<Self>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn update(
        pool: &PgPool,
        id: i64,
        req: UpdateUserRequest,
        hash_rounds: u32,
    ) -> AppResult<Self> {
        if let Some(email) = &req.email {
            validate_email(email)?;
        }

        let password_hash = req
            .password
            .map(|pwd| hash_password(&pwd, hash_rounds))
            .transpose()
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET email = COALESCE($1, email),
                password = COALESCE($2, password),
                role = COALESCE($3, role),
                updated_at = NOW(),
                version = version + 1
            WHERE id = $4
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(req.email)
        .bind(password_hash)
        .bind(req.role)
        .bind(id)
        .fetch_optional(pool)
        .await?;

        user.ok_or_else(|| AppError::NotFound("用户不存在".into()))
    }

    pub async fn delete(pool: &PgPool, id: i64) -> AppResult<i64> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("用户不存在".into()));
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_is_never_serialized() {
        let user = User {
            id: 1,
            email: "a@b.com".into(),
            password: "$2b$hash".into(),
            role: Role::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "user");
        assert_eq!(json["email"], "a@b.com");
    }

    #[test]
    fn email_validation() {
        assert!(validate_email("test@example.com").is_ok());
        assert!(validate_email("test").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a@localhost").is_err());
    }
}
