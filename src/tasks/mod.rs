// 定时任务
// 清理临时目录中没人认领的上传文件，定期重算点赞数

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use sqlx::PgPool;
use tokio::fs;
use tracing::{error, info, warn};

use crate::{AppState, error::AppResult, storage::file_name_timestamp};

/// 一次清理的结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// 文件名不是 `{uuid}_{毫秒时间戳}` 或者已经超过保留时长的都算孤儿文件
pub fn is_orphan(file_name: &str, now_millis: i64, max_age: Duration) -> bool {
    let Some(timestamp) = file_name_timestamp(file_name) else {
        return true;
    };
    let id = file_name.split('_').next().unwrap_or_default();
    if uuid::Uuid::parse_str(id).is_err() {
        return true;
    }

    now_millis - timestamp > max_age.as_millis() as i64
}

/// 删除目录下的孤儿文件，单个文件删除失败不影响其他文件
pub async fn erase_orphaned_files(
    dir: &Path,
    max_age: Duration,
    now_millis: i64,
) -> AppResult<SweepReport> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SweepReport::default()),
        Err(e) => return Err(e.into()),
    };

    let mut scanned = 0;
    let mut targets: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        scanned += 1;
        if is_orphan(&entry.file_name().to_string_lossy(), now_millis, max_age) {
            targets.push(entry.path());
        }
    }

    let results = join_all(targets.iter().map(|path| async move {
        let result = fs::remove_file(path).await;
        if let Err(e) = &result {
            warn!(error = %e, file = %path.display(), "failed to delete orphaned file");
        }
        result
    }))
    .await;

    let failed = results.iter().filter(|r| r.is_err()).count();
    Ok(SweepReport {
        scanned,
        deleted: results.len() - failed,
        failed,
    })
}

/// 按点赞记录重算所有电影的点赞、点踩数，重复执行结果不变
pub async fn recalculate_like_counts(pool: &PgPool) -> AppResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE movie m
        SET like_count = (
                SELECT COUNT(*) FROM movie_user_like l
                WHERE l.movie_id = m.id AND l.is_like
            ),
            dislike_count = (
                SELECT COUNT(*) FROM movie_user_like l
                WHERE l.movie_id = m.id AND NOT l.is_like
            )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// 启动所有定时任务
pub fn spawn_tasks(state: &AppState) {
    let temp_dir = state.storage.temp_dir().to_path_buf();
    let max_age = state.config.orphan_file_max_age();
    let sweep_every = state.config.orphan_sweep_interval();

    tokio::spawn(async move {
        info!(interval_secs = sweep_every.as_secs(), "orphan file sweeper started");
        let mut interval = tokio::time::interval(sweep_every);
        loop {
            interval.tick().await;
            match erase_orphaned_files(&temp_dir, max_age, Utc::now().timestamp_millis()).await {
                Ok(report) => info!(
                    scanned = report.scanned,
                    deleted = report.deleted,
                    failed = report.failed,
                    "orphan file sweep finished"
                ),
                Err(e) => error!(error = %e, "orphan file sweep failed"),
            }
        }
    });

    let pool = state.pool.clone();
    let recount_every = state.config.like_count_interval();

    tokio::spawn(async move {
        info!(interval_secs = recount_every.as_secs(), "like count worker started");
        let mut interval = tokio::time::interval(recount_every);
        loop {
            interval.tick().await;
            match recalculate_like_counts(&pool).await {
                Ok(rows) => info!(rows, "like counts recalculated"),
                Err(e) => error!(error = %e, "like count recalculation failed"),
            }
        }
    });
}
