use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Genre {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGenreRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateGenreRequest {
    pub name: Option<String>,
}

/// 电影与类型的关联行
#[derive(Debug, Clone, FromRow)]
pub struct MovieGenre {
    pub movie_id: i64,
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MovieGenre> for Genre {
    fn from(row: MovieGenre) -> Self {
        Genre {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const GENRE_COLUMNS: &str = "id, name, created_at, updated_at";

impl Genre {
    pub async fn create(pool: &PgPool, req: CreateGenreRequest) -> AppResult<Self> {
        if req.name.trim().is_empty() {
            return Err(AppError::BadRequest("name 不能为空".into()));
        }

        let genre = sqlx::query_as::<_, Genre>(&format!(
            "INSERT INTO genre (name) VALUES ($1) RETURNING {GENRE_COLUMNS}"
        ))
        .bind(req.name)
        .fetch_one(pool)
        .await?;

        Ok(genre)
    }

    pub async fn find_all(pool: &PgPool) -> AppResult<Vec<Self>> {
        let genres = sqlx::query_as::<_, Genre>(&format!(
            "SELECT {GENRE_COLUMNS} FROM genre ORDER BY id"
        ))
        .fetch_all(pool)
        .await?;

        Ok(genres)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> AppResult<Option<Self>> {
        let genre = sqlx::query_as::<_, Genre>(&format!(
            "SELECT {GENRE_COLUMNS} FROM genre WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(genre)
    }

    /// 批量读取多部电影的类型
    pub async fn find_by_movies(pool: &PgPool, movie_ids: &[i64]) -> AppResult<Vec<MovieGenre>> {
        let rows = sqlx::query_as::<_, MovieGenre>(
            r#"
            SELECT mg.movie_id, g.id, g.name, g.created_at, g.updated_at
            FROM movie_genres mg
            JOIN genre g ON g.id = mg.genre_id
            WHERE mg.movie_id = ANY($1)
            ORDER BY mg.movie_id, g.id
            "#,
        )
        .bind(movie_ids)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    pub async fn update(pool: &PgPool, id: i64, req: UpdateGenreRequest) -> AppResult<Self> {
        let genre = sqlx::query_as::<_, Genre>(&format!(
            r#"
            UPDATE genre
            SET name = COALESCE($1, name),
                updated_at = NOW(),
                version = version + 1
            WHERE id = $2
            RETURNING {GENRE_COLUMNS}
            "#
        ))
        .bind(req.name)
        .bind(id)
        .fetch_optional(pool)
        .await?;

        genre.ok_or_else(|| AppError::NotFound("类型不存在".into()))
    }

    pub async fn delete(pool: &PgPool, id: i64) -> AppResult<i64> {
        let result = sqlx::query("DELETE FROM genre WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("类型不存在".into()));
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movie_genre_row_drops_movie_id() {
        let now = Utc::now();
        let genre: Genre = MovieGenre {
            movie_id: 7,
            id: 2,
            name: "drama".into(),
            created_at: now,
            updated_at: now,
        }
        .into();
        assert_eq!(genre.id, 2);

        let json = serde_json::to_value(&genre).unwrap();
        assert_eq!(json["name"], "drama");
        assert!(json.get("movieId").is_none());
    }
}
