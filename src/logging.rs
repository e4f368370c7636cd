// 日志初始化：终端输出一份，日志目录下的 logs.log 再写一份

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_NAME: &str = "logs.log";

/// 打开 `<dir>/logs.log`，目录不存在时自动创建，不按时间切分
pub fn log_file(dir: impl AsRef<Path>) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("logs")
        .filename_suffix("log")
        .build(dir)
}

/// 返回的 guard 需要一直持有，丢弃后文件写入线程会退出
pub fn init(log_dir: &str) -> Result<WorkerGuard, InitError> {
    let (file_writer, guard) = tracing_appender::non_blocking(log_file(log_dir)?);

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    Ok(guard)
}
