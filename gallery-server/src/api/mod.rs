//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`images`] - 图库接口 (需认证)
//! - [`files`] - 图片文件访问 (公开)

pub mod files;
pub mod health;
pub mod images;

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_auth;
use crate::core::ServerState;

/// Build the Axum router (without state)
pub fn build_app() -> Router<ServerState> {
    Router::<ServerState>::new()
        .merge(health::router())
        .merge(images::router())
        .merge(files::router())
}

/// 挂载认证、请求体限制、超时、日志等中间件
pub fn build_router(state: ServerState) -> Router {
    let config = &state.config;
    let timeout = Duration::from_millis(config.request_timeout_ms);
    let body_limit = config.max_request_bytes;
    let permissive_cors = config.is_development();

    // require_auth 内部会跳过公共路由
    let app = build_app()
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            http::StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(TraceLayer::new_for_http());

    if permissive_cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}
