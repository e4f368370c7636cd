use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Director {
    pub id: i64,
    pub name: String,
    pub dob: NaiveDate,
    pub nationality: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDirectorRequest {
    pub name: String,
    pub dob: NaiveDate,
    pub nationality: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDirectorRequest {
    pub name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub nationality: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DirectorQuery {
    pub name: Option<String>,
}

const DIRECTOR_COLUMNS: &str = "id, name, dob, nationality, created_at, updated_at";

fn require_text(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} 不能为空", field)));
    }
    Ok(())
}

impl Director {
    pub async fn create(pool: &PgPool, req: CreateDirectorRequest) -> AppResult<Self> {
        require_text(&req.name, "name")?;
        require_text(&req.nationality, "nationality")?;

        let director = sqlx::query_as::<_, Director>(&format!(
            r#"
            INSERT INTO director (name, dob, nationality)
            VALUES ($1, $2, $3)
            RETURNING {DIRECTOR_COLUMNS}
            "#
        ))
        .bind(req.name)
        .bind(req.dob)
        .bind(req.nationality)
        .fetch_one(pool)
        .await?;

        Ok(director)
    }

    /// 按名字模糊查询，不传名字时返回全部
    pub async fn find_all(pool: &PgPool, name: Option<&str>) -> AppResult<Vec<Self>> {
        let directors = sqlx::query_as::<_, Director>(&format!(
            r#"
            SELECT {DIRECTOR_COLUMNS} FROM director
            WHERE ($1::text IS NULL OR name LIKE '%' || $1 || '%')
            ORDER BY id
            "#
        ))
        .bind(name)
        .fetch_all(pool)
        .await?;

        Ok(directors)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> AppResult<Option<Self>> {
        let director = sqlx::query_as::<_, Director>(&format!(
            "SELECT {DIRECTOR_COLUMNS} FROM director WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(director)
    }

    pub async fn find_by_ids(pool: &PgPool, ids: &[i64]) -> AppResult<Vec<Self>> {
        let directors = sqlx::query_as::<_, Director>(&format!(
            "SELECT {DIRECTOR_COLUMNS} FROM director WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(pool)
        .await?;

        Ok(directors)
    }

    pub async fn update(pool: &PgPool, id: i64, req: UpdateDirectorRequest) -> AppResult<Self> {
        if let Some(name) = &req.name {
            require_text(name, "name")?;
        }

        let director = sqlx::query_as::<_, Director>(&format!(
            r#"
            UPDATE director
            SET name = COALESCE($1, name),
                dob = COALESCE($2, dob),
                nationality = COALESCE($3, nationality),
                updated_at = NOW(),
                version = version + 1
            WHERE id = $4
            RETURNING {DIRECTOR_COLUMNS}
            "#
        ))
        .bind(req.name)
        .bind(req.dob)
        .bind(req.nationality)
        .bind(id)
        .fetch_optional(pool)
        .await?;

        director.ok_or_else(|| AppError::NotFound("导演不存在".into()))
    }

    pub async fn delete(pool: &PgPool, id: i64) -> AppResult<i64> {
        let result = sqlx::query("DELETE FROM director WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("导演不存在".into()));
        }
        Ok(id)
    }
}
