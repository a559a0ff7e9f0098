//! Image API 模块
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/images | GET | 分页查询 (search, skip, limit, sortBy, sortOrder) |
//! | /api/images | POST | 批量上传 (multipart) |
//! | /api/images/reorder | PATCH | 拖拽排序 |
//! | /api/images/{id} | PATCH | 编辑 (multipart，可替换文件) |
//! | /api/images/{id} | DELETE | 删除 |

mod handler;

use axum::{
    Router,
    routing::{get, patch},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/images", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::upload))
        // 必须在 /{id} 之前
        .route("/reorder", patch(handler::reorder))
        .route("/{id}", patch(handler::edit).delete(handler::delete))
}
