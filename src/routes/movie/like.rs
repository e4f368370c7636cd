//! 点赞/点踩切换
//!
//! 每个 (用户, 电影) 只有三种状态：点赞、点踩、无记录。

use std::collections::HashMap;

use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};

use crate::{
    database::rollback,
    error::{AppError, AppResult},
};

/// 一次切换请求对应的写操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAction {
    Create(bool),
    Delete,
    Update(bool),
}

impl LikeAction {
    /// 无记录则新建；与已有值相同则取消；不同则改写
    pub fn resolve(existing: Option<bool>, requested: bool) -> Self {
        match existing {
            None => LikeAction::Create(requested),
            Some(current) if current == requested => LikeAction::Delete,
            Some(_) => LikeAction::Update(requested),
        }
    }

    /// 执行后的状态，None 表示中立
    pub fn outcome(self) -> Option<bool> {
        match self {
            LikeAction::Create(v) | LikeAction::Update(v) => Some(v),
            LikeAction::Delete => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatus {
    pub is_like: Option<bool>,
}

#[derive(Debug, FromRow)]
struct LikeRecord {
    movie_id: i64,
    is_like: bool,
}

/// 切换点赞状态。同一用户的切换在事务里锁住用户行后串行执行
pub async fn toggle_like(
    pool: &PgPool,
    movie_id: i64,
    user_id: i64,
    is_like: bool,
) -> AppResult<LikeStatus> {
    let mut tx = pool.begin().await?;
    let action = match apply_toggle(&mut *tx, movie_id, user_id, is_like).await {
        Ok(action) => action,
        Err(e) => return Err(rollback(tx, e).await),
    };
    tx.commit().await?;

    tracing::debug!(movie_id, user_id, ?action, "like toggled");
    Ok(LikeStatus {
        is_like: action.outcome(),
    })
}

async fn apply_toggle(
    conn: &mut PgConnection,
    movie_id: i64,
    user_id: i64,
    is_like: bool,
) -> AppResult<LikeAction> {
    let movie_exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM movie WHERE id = $1)")
        .bind(movie_id)
        .fetch_one(&mut *conn)
        .await?;
    if !movie_exists {
        return Err(AppError::NotFound("电影不存在".into()));
    }

    // NO KEY UPDATE 不会阻塞其他事务插入点赞记录时的外键检查
    let locked: Option<i64> =
        sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR NO KEY UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;
    if locked.is_none() {
        return Err(AppError::Unauthorized("用户不存在".into()));
    }

    let existing: Option<bool> = sqlx::query_scalar(
        "SELECT is_like FROM movie_user_like WHERE movie_id = $1 AND user_id = $2",
    )
    .bind(movie_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    let action = LikeAction::resolve(existing, is_like);
    match action {
        LikeAction::Create(value) => {
            sqlx::query(
                "INSERT INTO movie_user_like (movie_id, user_id, is_like) VALUES ($1, $2, $3)",
            )
            .bind(movie_id)
            .bind(user_id)
            .bind(value)
            .execute(&mut *conn)
            .await?;
        }
        LikeAction::Delete => {
            sqlx::query("DELETE FROM movie_user_like WHERE movie_id = $1 AND user_id = $2")
                .bind(movie_id)
                .bind(user_id)
                .execute(&mut *conn)
                .await?;
        }
        LikeAction::Update(value) => {
            sqlx::query(
                "UPDATE movie_user_like SET is_like = $3 WHERE movie_id = $1 AND user_id = $2",
            )
            .bind(movie_id)
            .bind(user_id)
            .bind(value)
            .execute(&mut *conn)
            .await?;
        }
    }

    Ok(action)
}

/// 当前用户对一批电影的点赞状态，没有记录的电影不出现在结果里
pub async fn like_statuses(
    pool: &PgPool,
    user_id: i64,
    movie_ids: &[i64],
) -> AppResult<HashMap<i64, bool>> {
    let records = sqlx::query_as::<_, LikeRecord>(
        "SELECT movie_id, is_like FROM movie_user_like WHERE user_id = $1 AND movie_id = ANY($2)",
    )
    .bind(user_id)
    .bind(movie_ids)
    .fetch_all(pool)
    .await?;

    Ok(records.into_iter().map(|r| (r.movie_id, r.is_like)).collect())
}
