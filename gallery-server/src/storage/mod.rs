//! 文件存储
//!
//! - [`ImageStorage`] - 图片文件存取接口
//! - [`LocalImageStorage`] - 本地磁盘实现 (按内容哈希命名)
//! - [`validate_image`] - 上传前校验 (大小、扩展名、可解码)

pub mod local;

pub use local::LocalImageStorage;

use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};
use std::path::Path;
use thiserror::Error;

/// 默认最大文件大小 (5MB)
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// 支持的图片格式
pub const SUPPORTED_FORMATS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("Unsupported file format '{0}'")]
    UnsupportedFormat(String),

    #[error("Invalid image file: {0}")]
    InvalidImage(String),

    #[error("Empty file provided")]
    Empty,

    #[error("No filename provided")]
    MissingName,

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let code = match &err {
            StorageError::TooLarge { .. } => ErrorCode::FileTooLarge,
            StorageError::UnsupportedFormat(_) => ErrorCode::UnsupportedFileFormat,
            StorageError::InvalidImage(_) => ErrorCode::InvalidImageFile,
            StorageError::Empty => ErrorCode::EmptyFile,
            StorageError::MissingName => ErrorCode::NoFilename,
            StorageError::InvalidKey(_) => ErrorCode::InvalidRequest,
            StorageError::Io(_) => ErrorCode::FileStorageFailed,
        };
        let app = AppError::with_message(code, err.to_string());
        match err {
            StorageError::TooLarge { max, .. } => app.with_detail("maxBytes", max),
            _ => app,
        }
    }
}

/// 已写入的文件
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    /// `{owner}/{file}`
    pub key: String,
    /// 对外访问地址
    pub url: String,
    pub size: usize,
    /// 由扩展名推断
    pub content_type: String,
}

/// 读取到的文件内容
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// 校验并写入，返回存储键和访问地址
    async fn put(
        &self,
        owner_id: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredObject, StorageError>;

    /// 删除文件；文件不存在视为成功
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Option<StoredFile>, StorageError>;
}

/// 校验图片，返回小写扩展名
pub fn validate_image(original_name: &str, data: &[u8], max_size: usize) -> Result<String, StorageError> {
    if original_name.trim().is_empty() {
        return Err(StorageError::MissingName);
    }
    if data.is_empty() {
        return Err(StorageError::Empty);
    }
    if data.len() > max_size {
        return Err(StorageError::TooLarge {
            size: data.len(),
            max: max_size,
        });
    }

    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .ok_or_else(|| StorageError::UnsupportedFormat(original_name.to_string()))?;
    if !SUPPORTED_FORMATS.contains(&ext.as_str()) {
        return Err(StorageError::UnsupportedFormat(ext));
    }

    // Verify it's actually an image by trying to load it
    image::load_from_memory(data).map_err(|e| StorageError::InvalidImage(e.to_string()))?;

    Ok(ext)
}
