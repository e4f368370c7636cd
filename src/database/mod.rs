// 数据库模块
// 连接池、迁移以及事务辅助函数

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool, Postgres, Transaction};

use crate::error::AppError;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// 创建连接池
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'movieflix_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

/// 回滚事务并原样返回导致回滚的错误
pub async fn rollback(tx: Transaction<'_, Postgres>, err: AppError) -> AppError {
    if let Err(e) = tx.rollback().await {
        tracing::error!(error = %e, "failed to roll back transaction");
    }
    err
}
