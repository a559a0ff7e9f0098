//! Database Module
//!
//! 图片记录持久层：
//! - [`ImageStore`] - 图库 CRUD + [`OrderStore`] 排序键读写
//! - [`PgImageStore`] - PostgreSQL 实现 (sqlx, 启动时执行迁移)
//! - [`MemoryImageStore`] - 内存实现 (测试与本地开发)

pub mod memory;
pub mod postgres;

pub use memory::MemoryImageStore;
pub use postgres::PgImageStore;

use async_trait::async_trait;
use shared::error::AppError;
use shared::models::{Image, ImagePage, ImageQuery, ImageUpdate, NewImage};
use thiserror::Error;
use uuid::Uuid;

use crate::ordering::OrderStore;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound(err.to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Duplicate(db.message().to_string())
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for RepoError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        RepoError::Database(format!("Failed to apply migrations: {err}"))
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::not_found(msg),
            RepoError::Duplicate(msg) => AppError::with_message(
                shared::error::ErrorCode::AlreadyExists,
                msg,
            ),
            RepoError::Database(msg) => AppError::database(msg),
            RepoError::Validation(msg) => AppError::validation(msg),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// 图片仓储
///
/// 所有操作都以 owner 为边界：别人的记录等同于不存在。
#[async_trait]
pub trait ImageStore: OrderStore {
    /// 按输入顺序插入并返回新记录
    async fn insert_many(&self, images: Vec<NewImage>) -> RepoResult<Vec<Image>>;

    async fn find_by_id(&self, owner_id: &str, id: Uuid) -> RepoResult<Option<Image>>;

    /// 标题搜索 + 排序 + 分页
    async fn find_page(&self, query: &ImageQuery) -> RepoResult<ImagePage>;

    /// 更新描述字段，不触碰排序键
    async fn update_metadata(
        &self,
        owner_id: &str,
        id: Uuid,
        update: ImageUpdate,
    ) -> RepoResult<Option<Image>>;

    /// 删除并返回被删除的记录
    async fn delete(&self, owner_id: &str, id: Uuid) -> RepoResult<Option<Image>>;

    /// 是否仍有记录引用该文件 (相同内容共用一个文件)
    async fn storage_key_in_use(&self, owner_id: &str, storage_key: &str) -> RepoResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    #[test]
    fn test_repo_error_to_app_error() {
        let err: AppError = RepoError::NotFound("image".into()).into();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err: AppError = RepoError::Duplicate("id".into()).into();
        assert_eq!(err.code, ErrorCode::AlreadyExists);

        let err: AppError = RepoError::Database("timeout".into()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);

        let err: AppError = RepoError::Validation("bad".into()).into();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn test_sqlx_row_not_found() {
        let err: RepoError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, RepoError::NotFound(_)));
    }
}
