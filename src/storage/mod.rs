//! 电影文件存储
//!
//! 上传的文件先写入临时目录，文件名为 `{uuid}_{毫秒时间戳}.{扩展名}`；
//! 创建电影时再移动到正式目录。未被认领的临时文件由定时任务清理。

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tokio::fs;

use crate::error::{AppError, AppResult};

/// 原始文件名没有扩展名时使用的默认扩展名
const DEFAULT_EXTENSION: &str = "mp4";

/// 生成唯一文件名，保留原始扩展名
pub fn generate_file_name(original_name: &str, now_millis: i64) -> String {
    let split: Vec<&str> = original_name.split('.').collect();
    let extension = if split.len() > 1 {
        split[split.len() - 1]
    } else {
        DEFAULT_EXTENSION
    };

    format!("{}_{}.{}", uuid::Uuid::new_v4(), now_millis, extension)
}

/// 从生成的文件名中取出时间戳；不是 `{uuid}_{millis}` 形式时返回 None
pub fn file_name_timestamp(file_name: &str) -> Option<i64> {
    let stem = Path::new(file_name).file_stem()?.to_str()?;
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() != 2 {
        return None;
    }
    parts[1].parse::<i64>().ok()
}

/// 只接受单层文件名，防止目录穿越
fn plain_file_name(file_name: &str) -> AppResult<&str> {
    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(file_name),
        _ => Err(AppError::BadRequest("无效的文件名".into())),
    }
}

/// 上传限制
#[derive(Debug, Clone)]
pub struct UploadRule {
    pub max_bytes: usize,
    pub mime_type: &'static str,
}

impl UploadRule {
    pub fn check(&self, content_type: Option<&str>, size: usize) -> AppResult<()> {
        if size > self.max_bytes {
            return Err(AppError::BadRequest(format!(
                "只能上传 {} 字节以内的文件",
                self.max_bytes
            )));
        }
        if content_type != Some(self.mime_type) {
            return Err(AppError::BadRequest(format!(
                "只能上传 {} 文件",
                self.mime_type
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AssetStorage {
    temp_dir: PathBuf,
    movie_dir: PathBuf,
}

impl AssetStorage {
    pub fn new(temp_dir: impl Into<PathBuf>, movie_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            movie_dir: movie_dir.into(),
        }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn movie_dir(&self) -> &Path {
        &self.movie_dir
    }

    /// 写入临时目录，返回生成的文件名
    pub async fn save_temp(&self, original_name: &str, data: &[u8]) -> AppResult<String> {
        fs::create_dir_all(&self.temp_dir).await?;

        let file_name = generate_file_name(original_name, chrono::Utc::now().timestamp_millis());
        fs::write(self.temp_dir.join(&file_name), data).await?;

        tracing::debug!(file = %file_name, bytes = data.len(), "stored upload in temp dir");
        Ok(file_name)
    }

    /// 把临时文件移动到电影目录，返回相对路径 `movie/<file>`
    pub async fn promote(&self, file_name: &str) -> AppResult<PathBuf> {
        let file_name = plain_file_name(file_name)?;
        fs::create_dir_all(&self.movie_dir).await?;

        match fs::rename(self.temp_dir.join(file_name), self.movie_dir.join(file_name)).await {
            Ok(()) => Ok(self.movie_dir.join(file_name)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(AppError::BadRequest(format!(
                "上传的文件不存在: {}",
                file_name
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// 撤销 promote，事务回滚时使用
    pub async fn demote(&self, file_name: &str) -> AppResult<()> {
        let file_name = plain_file_name(file_name)?;
        fs::rename(self.movie_dir.join(file_name), self.temp_dir.join(file_name)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("movieflix-storage-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn generated_names_keep_extension() {
        let name = generate_file_name("trailer.final.mov", 1_700_000_000_000);
        assert!(name.ends_with("_1700000000000.mov"));
        assert_eq!(file_name_timestamp(&name), Some(1_700_000_000_000));

        let name = generate_file_name("noext", 5);
        assert!(name.ends_with("_5.mp4"));
    }

    #[test]
    fn timestamp_requires_two_parts() {
        assert_eq!(file_name_timestamp("random.mp4"), None);
        assert_eq!(file_name_timestamp("a_b_c.mp4"), None);
        assert_eq!(file_name_timestamp("abc_notanumber.mp4"), None);
    }

    #[test]
    fn upload_rule_checks_size_and_mime() {
        let rule = UploadRule {
            max_bytes: 10,
            mime_type: "video/mp4",
        };
        assert!(rule.check(Some("video/mp4"), 10).is_ok());
        assert!(rule.check(Some("video/mp4"), 11).is_err());
        assert!(rule.check(Some("image/png"), 1).is_err());
        assert!(rule.check(None, 1).is_err());
    }

    #[test]
    fn rejects_traversal() {
        assert!(plain_file_name("../etc/passwd").is_err());
        assert!(plain_file_name("a/b.mp4").is_err());
        assert!(plain_file_name("/abs.mp4").is_err());
        assert!(plain_file_name("ok.mp4").is_ok());
    }

    #[tokio::test]
    async fn save_then_promote() {
        let root = scratch_dir();
        let storage = AssetStorage::new(root.join("temp"), root.join("movie"));

        let name = storage.save_temp("clip.mp4", b"data").await.unwrap();
        assert!(storage.temp_dir().join(&name).exists());

        let path = storage.promote(&name).await.unwrap();
        assert!(path.exists());
        assert!(!storage.temp_dir().join(&name).exists());

        storage.demote(&name).await.unwrap();
        assert!(storage.temp_dir().join(&name).exists());

        let missing = storage.promote("nope_1.mp4").await;
        assert!(matches!(missing, Err(AppError::BadRequest(_))));

        let _ = std::fs::remove_dir_all(root);
    }
}
