//! 排序引擎错误

use shared::error::AppError;
use thiserror::Error;
use uuid::Uuid;

use crate::db::RepoError;

#[derive(Debug, Error)]
pub enum OrderingError {
    /// 既没有 previous 也没有 next
    #[error("either previousOrder or nextOrder must be provided")]
    InvalidReorderContext,

    /// 条目不存在或不属于该 owner
    #[error("item not found: {0}")]
    ItemNotFound(Uuid),

    /// 重编号后仍然无法得到不冲突的键
    #[error("order key space exhausted between neighbours")]
    KeySpaceExhausted,

    #[error(transparent)]
    Store(#[from] RepoError),
}

impl From<OrderingError> for AppError {
    fn from(err: OrderingError) -> Self {
        match err {
            OrderingError::InvalidReorderContext => AppError::invalid_reorder_context(),
            OrderingError::ItemNotFound(id) => AppError::image_not_found(id.to_string()),
            OrderingError::KeySpaceExhausted => AppError::order_key_exhausted(),
            OrderingError::Store(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    #[test]
    fn test_ordering_error_mapping() {
        let err: AppError = OrderingError::InvalidReorderContext.into();
        assert_eq!(err.code, ErrorCode::InvalidReorderContext);

        let id = Uuid::new_v4();
        let err: AppError = OrderingError::ItemNotFound(id).into();
        assert_eq!(err.code, ErrorCode::ImageNotFound);
        assert_eq!(
            err.details.unwrap().get("imageId").unwrap(),
            &serde_json::Value::String(id.to_string())
        );

        let err: AppError = OrderingError::KeySpaceExhausted.into();
        assert_eq!(err.code, ErrorCode::OrderKeyExhausted);

        let err: AppError = OrderingError::Store(RepoError::Database("down".into())).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
