//! Gallery Server - 按用户隔离的图片库服务
//!
//! # 架构概述
//!
//! - **排序引擎** (`ordering`): 分数排序键，拖拽移动只改写一行
//! - **数据库** (`db`): PostgreSQL / 内存存储
//! - **文件存储** (`storage`): 本地内容寻址图片文件
//! - **认证** (`auth`): JWT Bearer 认证
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! gallery-server/src/
//! ├── core/          # 配置、状态、错误、HTTP 服务
//! ├── auth/          # JWT 认证
//! ├── ordering/      # 排序键计算、按用户串行化
//! ├── services/      # 图库业务流程
//! ├── storage/       # 图片校验与文件存储
//! ├── api/           # HTTP 路由和处理器
//! ├── utils/         # 日志
//! └── db/            # 数据库层
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod ordering;
pub mod services;
pub mod storage;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use ordering::OrderedCollectionManager;
pub use services::GalleryService;

// Re-export unified error types from shared
pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::warn!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// 加载 `.env`、读取配置并初始化日志
pub fn setup_environment() -> anyhow::Result<Config> {
    dotenv::dotenv().ok();

    let config = Config::from_env()?;
    init_logger_with_file(
        &config.log_level,
        config.log_json,
        config.log_dir.as_deref(),
    )?;

    if config.uses_development_secret() {
        tracing::warn!("JWT_SECRET not set, using development secret");
    }

    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
   ______      ____
  / ____/___ _/ / /__  _______  __
 / / __/ __ `/ / / _ \/ ___/ / / /
/ /_/ / /_/ / / /  __/ /  / /_/ /
\____/\__,_/_/_/\___/_/   \__, /
                         /____/
    "#
    );
}
