//! Image API Handlers

use axum::{
    Json,
    extract::{
        Multipart, Path, Query, State,
        multipart::{Field, MultipartError},
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
};
use http::StatusCode;
use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};
use shared::models::{Image, ImageListParams, ImagePage, ImageUpdate, ReorderRequest};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::services::gallery::parse_file_size;
use crate::services::{FilePart, UploadForm};

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::with_message(ErrorCode::FileTooLarge, err.body_text())
    } else {
        AppError::invalid_request(err.body_text())
    }
}

async fn read_file_part(field: Field<'_>) -> AppResult<FilePart> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);
    let bytes = field.bytes().await.map_err(multipart_error)?;
    Ok(FilePart {
        file_name,
        content_type,
        bytes: bytes.to_vec(),
    })
}

async fn read_text(field: Field<'_>) -> AppResult<String> {
    field.text().await.map_err(multipart_error)
}

/// 兼容 `titles` 与 `titles[]` 两种写法
fn field_name(field: &Field<'_>) -> String {
    field
        .name()
        .unwrap_or_default()
        .trim_end_matches("[]")
        .to_string()
}

fn image_id(path: Result<Path<Uuid>, PathRejection>) -> AppResult<Uuid> {
    path.map(|Path(id)| id)
        .map_err(|e| AppError::invalid_request(e.body_text()))
}

/// GET /api/images - 分页查询当前用户的图片
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    params: Result<Query<ImageListParams>, QueryRejection>,
) -> AppResult<ApiResponse<ImagePage>> {
    let Query(params) = params.map_err(|e| AppError::validation(e.body_text()))?;
    let query = params.into_query(user.user_id);
    let page = state.gallery().list(&query).await?;
    Ok(ApiResponse::success(page))
}

/// POST /api/images - 批量上传
///
/// multipart 字段: `files`, `titles`, `originalFileNames`, `mimeTypes`, `fileSizes`
pub async fn upload(
    State(state): State<ServerState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<Vec<Image>>> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field_name(&field).as_str() {
            "files" => form.files.push(read_file_part(field).await?),
            "titles" => form.titles.push(read_text(field).await?),
            "originalFileNames" => form.original_file_names.push(read_text(field).await?),
            "mimeTypes" => form.mime_types.push(read_text(field).await?),
            "fileSizes" => form.file_sizes.push(read_text(field).await?),
            other => tracing::debug!(field = %other, "Ignoring unknown multipart field"),
        }
    }

    let files = form.into_files()?;
    let images = state.gallery().bulk_upload(&user.user_id, files).await?;
    Ok(ApiResponse::success_with_message("Images uploaded", images))
}

/// PATCH /api/images/reorder - 拖拽排序
pub async fn reorder(
    State(state): State<ServerState>,
    user: CurrentUser,
    payload: Result<Json<ReorderRequest>, JsonRejection>,
) -> AppResult<ApiResponse<Image>> {
    let Json(request) = payload.map_err(|e| AppError::validation(e.body_text()))?;
    let image = state.gallery().reorder(&user.user_id, request).await?;
    Ok(ApiResponse::success_with_message("Image reordered", image))
}

/// PATCH /api/images/:id - 编辑标题等字段，可附带新文件 (`file`)
pub async fn edit(
    State(state): State<ServerState>,
    user: CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<Image>> {
    let id = image_id(path)?;
    let mut update = ImageUpdate::default();
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field_name(&field).as_str() {
            "file" => file = Some(read_file_part(field).await?),
            "title" => update.title = Some(read_text(field).await?),
            "originalFileName" => update.original_file_name = Some(read_text(field).await?),
            "mimeType" => update.mime_type = Some(read_text(field).await?),
            "fileSize" => update.file_size = Some(parse_file_size(&read_text(field).await?)?),
            other => tracing::debug!(field = %other, "Ignoring unknown multipart field"),
        }
    }

    let image = state
        .gallery()
        .edit(&user.user_id, id, update, file)
        .await?;
    Ok(ApiResponse::success_with_message("Image updated", image))
}

/// DELETE /api/images/:id - 删除图片
pub async fn delete(
    State(state): State<ServerState>,
    user: CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<ApiResponse<Image>> {
    let id = image_id(path)?;
    let image = state.gallery().delete(&user.user_id, id).await?;
    Ok(ApiResponse::success_with_message("Image deleted", image))
}
