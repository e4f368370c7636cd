use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
};
use serde::Serialize;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    storage::UploadRule,
    utils::success_to_api_response,
};

/// 上传表单中的文件字段名
const VIDEO_FIELD: &str = "video";
const VIDEO_MIME_TYPE: &str = "video/mp4";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_name: String,
}

/// 上传电影文件到临时目录，返回生成的文件名
#[axum::debug_handler]
pub async fn upload_video(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let rule = UploadRule {
        max_bytes: state.config.upload_max_bytes,
        mime_type: VIDEO_MIME_TYPE,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("上传内容解析失败: {}", e)))?
    {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("读取上传文件失败: {}", e)))?;

        rule.check(content_type.as_deref(), data.len())?;

        let file_name = state.storage.save_temp(&original_name, &data).await?;
        tracing::info!(user = user.id(), file = %file_name, bytes = data.len(), "video uploaded");
        return Ok(success_to_api_response(UploadResponse { file_name }));
    }

    Err(AppError::BadRequest(format!("缺少 {} 字段", VIDEO_FIELD)))
}
