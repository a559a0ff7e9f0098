//! Local disk image storage
//!
//! 文件按 `{root}/{owner}/{sha256}.{ext}` 存放，相同内容只写一次。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{ImageStorage, MAX_FILE_SIZE, StorageError, StoredFile, StoredObject, validate_image};

/// 对外访问前缀
pub const FILES_URL_PREFIX: &str = "/api/files";

#[derive(Debug, Clone)]
pub struct LocalImageStorage {
    root: PathBuf,
    max_file_size: usize,
}

impl LocalImageStorage {
    /// `root` 通常为 `{work_dir}/images`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_max_size(root, MAX_FILE_SIZE)
    }

    pub fn with_max_size(root: impl Into<PathBuf>, max_file_size: usize) -> Self {
        Self {
            root: root.into(),
            max_file_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// 解析 `{owner}/{file}`，拒绝路径穿越
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let (owner, file) = key
            .split_once('/')
            .ok_or_else(|| StorageError::InvalidKey(key.to_string()))?;
        if !is_safe_segment(owner) || !is_safe_segment(file) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(owner).join(file))
    }
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && !segment.contains("..")
        && !segment.contains(['/', '\\', '\0'])
}

/// Calculate SHA256 hash of data
fn calculate_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn content_type_of(path: &str) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[async_trait]
impl ImageStorage for LocalImageStorage {
    async fn put(
        &self,
        owner_id: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredObject, StorageError> {
        if !is_safe_segment(owner_id) {
            return Err(StorageError::InvalidKey(owner_id.to_string()));
        }
        let ext = validate_image(original_name, bytes, self.max_file_size)?;

        let file_name = format!("{}.{}", calculate_hash(bytes), ext);
        let key = format!("{owner_id}/{file_name}");
        let path = self.resolve(&key)?;

        if tokio::fs::try_exists(&path).await? {
            tracing::debug!(key = %key, "Image content already stored, reusing");
        } else {
            if let Some(dir) = path.parent() {
                tokio::fs::create_dir_all(dir).await?;
            }
            tokio::fs::write(&path, bytes).await?;
            tracing::info!(key = %key, size = bytes.len(), "Image stored");
        }

        Ok(StoredObject {
            url: format!("{FILES_URL_PREFIX}/{key}"),
            content_type: content_type_of(&file_name),
            size: bytes.len(),
            key,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(key = %key, "Image file deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<StoredFile>, StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(StoredFile {
                bytes,
                content_type: content_type_of(key),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::{other_png_bytes, png_bytes};

    #[tokio::test]
    async fn test_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalImageStorage::new(dir.path().join("images"));
        let png = png_bytes();

        let stored = storage.put("user-1", "cat.png", &png).await.unwrap();
        assert!(stored.key.starts_with("user-1/"));
        assert!(stored.key.ends_with(".png"));
        assert_eq!(stored.url, format!("/api/files/{}", stored.key));
        assert_eq!(stored.content_type, "image/png");
        assert_eq!(stored.size, png.len());

        let file = storage.get(&stored.key).await.unwrap().unwrap();
        assert_eq!(file.bytes, png);
        assert_eq!(file.content_type, "image/png");

        storage.delete(&stored.key).await.unwrap();
        assert!(storage.get(&stored.key).await.unwrap().is_none());
        // 再删一次也不报错
        storage.delete(&stored.key).await.unwrap();
    }

    #[tokio::test]
    async fn test_same_content_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalImageStorage::new(dir.path());

        let a = storage.put("u", "a.png", &png_bytes()).await.unwrap();
        let b = storage.put("u", "b.png", &png_bytes()).await.unwrap();
        let c = storage.put("u", "c.png", &other_png_bytes()).await.unwrap();

        assert_eq!(a.key, b.key);
        assert_ne!(a.key, c.key);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalImageStorage::new(dir.path());

        for key in ["../etc/passwd", "u/../../x", "u/a\\b.png", "nofile", "u/", "/x.png"] {
            assert!(
                matches!(storage.get(key).await, Err(StorageError::InvalidKey(_))),
                "key {key} should be rejected"
            );
        }
        assert!(matches!(
            storage.put("..", "a.png", &png_bytes()).await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_put_validates_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalImageStorage::with_max_size(dir.path(), 8);

        let result = storage.put("u", "a.png", &png_bytes()).await;
        assert!(matches!(result, Err(StorageError::TooLarge { .. })));
        assert!(!dir.path().join("u").exists());
    }
}
