//! 图片文件访问
//!
//! `GET /api/files/{owner}/{file}` 公开访问，路径穿越由存储层拒绝。

use axum::{
    Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
};
use http::header;
use shared::error::AppResult;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/files/{owner}/{file}", get(serve_file))
}

/// GET /api/files/:owner/:file - 读取已上传的图片
async fn serve_file(
    State(state): State<ServerState>,
    Path((owner, file)): Path<(String, String)>,
) -> AppResult<Response> {
    let stored = state.gallery().read_file(&owner, &file).await?;
    Ok((
        [
            (header::CONTENT_TYPE, stored.content_type),
            // 文件名即内容哈希
            (
                header::CACHE_CONTROL,
                "public, max-age=31536000, immutable".to_string(),
            ),
        ],
        stored.bytes,
    )
        .into_response())
}
