//! Gallery Service - 图库用例
//!
//! 串联 [`ImageStore`]、[`ImageStorage`] 与排序引擎：
//! 上传时先写文件再追加记录，删除时先删记录再删文件。
//!
//! 文件按内容哈希在同一 owner 内共享，因此 "写文件 -> 写记录" 与
//! "删记录 -> 检查引用 -> 删文件" 都在同一把 owner 锁内完成。

use std::sync::Arc;

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Image, ImagePage, ImageQuery, ImageUpdate, NewImage, ReorderRequest};
use uuid::Uuid;

use crate::db::ImageStore;
use crate::ordering::OrderedCollectionManager;
use crate::storage::{ImageStorage, StoredFile};

/// multipart 中的一个文件字段
#[derive(Debug, Clone, Default)]
pub struct FilePart {
    /// 客户端提供的文件名 (用于判断扩展名)
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// 一个待上传的图片及其描述字段
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub title: String,
    pub original_file_name: String,
    pub mime_type: String,
    pub file_size: i64,
    pub file: FilePart,
}

/// 批量上传表单
///
/// `files` 与其余四个数组按下标一一对应，长度必须相同。
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub files: Vec<FilePart>,
    pub titles: Vec<String>,
    pub original_file_names: Vec<String>,
    pub mime_types: Vec<String>,
    pub file_sizes: Vec<String>,
}

impl UploadForm {
    /// 校验数组长度并组装为 [`UploadFile`] 列表
    pub fn into_files(self) -> AppResult<Vec<UploadFile>> {
        let expected = self.files.len();
        if expected == 0 {
            return Err(AppError::new(ErrorCode::NoFileProvided));
        }
        for (field, actual) in [
            ("titles", self.titles.len()),
            ("originalFileNames", self.original_file_names.len()),
            ("mimeTypes", self.mime_types.len()),
            ("fileSizes", self.file_sizes.len()),
        ] {
            if actual != expected {
                return Err(AppError::invalid_file_array(field, expected, actual));
            }
        }

        let sizes = self
            .file_sizes
            .iter()
            .enumerate()
            .map(|(i, raw)| parse_file_size(raw).map_err(|e| e.with_detail("index", i)))
            .collect::<AppResult<Vec<i64>>>()?;

        Ok(self
            .files
            .into_iter()
            .zip(self.titles)
            .zip(self.original_file_names)
            .zip(self.mime_types)
            .zip(sizes)
            .map(
                |((((file, title), original_file_name), mime_type), file_size)| UploadFile {
                    title,
                    original_file_name,
                    mime_type,
                    file_size,
                    file,
                },
            )
            .collect())
    }
}

/// 解析表单中的文件大小
pub fn parse_file_size(raw: &str) -> AppResult<i64> {
    match raw.trim().parse::<i64>() {
        Ok(size) if size >= 0 => Ok(size),
        _ => Err(AppError::with_message(
            ErrorCode::InvalidFormat,
            format!("Invalid file size '{raw}'"),
        )),
    }
}

fn require_title(title: &str) -> AppResult<()> {
    if title.trim().is_empty() {
        return Err(AppError::new(ErrorCode::RequiredField).with_detail("field", "title"));
    }
    Ok(())
}

/// 图库服务
pub struct GalleryService {
    store: Arc<dyn ImageStore>,
    storage: Arc<dyn ImageStorage>,
    ordering: OrderedCollectionManager<dyn ImageStore>,
}

impl GalleryService {
    pub fn new(store: Arc<dyn ImageStore>, storage: Arc<dyn ImageStorage>) -> Self {
        let ordering = OrderedCollectionManager::new(store.clone());
        Self::with_ordering(store, storage, ordering)
    }

    pub fn with_ordering(
        store: Arc<dyn ImageStore>,
        storage: Arc<dyn ImageStorage>,
        ordering: OrderedCollectionManager<dyn ImageStore>,
    ) -> Self {
        Self {
            store,
            storage,
            ordering,
        }
    }

    pub fn store(&self) -> &Arc<dyn ImageStore> {
        &self.store
    }

    /// 批量上传
    ///
    /// 新图片按输入顺序排在当前最大键之后。任一文件校验失败则整批失败，
    /// 本次已写入的文件会被清理。
    pub async fn bulk_upload(&self, owner_id: &str, files: Vec<UploadFile>) -> AppResult<Vec<Image>> {
        if files.is_empty() {
            return Err(AppError::new(ErrorCode::NoFileProvided));
        }
        for (i, file) in files.iter().enumerate() {
            require_title(&file.title).map_err(|e| e.with_detail("index", i))?;
        }

        // owner 锁从分配键一直持有到记录写入，与删除时的文件清理串行
        let batch = self.ordering.append_bulk(owner_id, files).await?;

        let mut rows = Vec::with_capacity(batch.len());
        let mut written = Vec::with_capacity(batch.len());
        for (file, key) in batch.entries() {
            let name = upload_name(&file.file, &file.original_file_name);
            let stored = match self.storage.put(owner_id, name, &file.file.bytes).await {
                Ok(stored) => stored,
                Err(e) => {
                    self.release_files(owner_id, &written).await;
                    return Err(e.into());
                }
            };
            written.push(stored.key.clone());
            rows.push(NewImage {
                owner_id: owner_id.to_string(),
                title: file.title.trim().to_string(),
                url: stored.url,
                storage_key: stored.key,
                original_file_name: file.original_file_name.clone(),
                mime_type: file.mime_type.clone(),
                file_size: file.file_size,
                order_key: *key,
            });
        }

        let created = match self.store.insert_many(rows).await {
            Ok(created) => created,
            Err(e) => {
                self.release_files(owner_id, &written).await;
                return Err(e.into());
            }
        };
        drop(batch);

        tracing::info!(owner_id = %owner_id, count = created.len(), "Images uploaded");
        Ok(created)
    }

    /// 分页查询
    pub async fn list(&self, query: &ImageQuery) -> AppResult<ImagePage> {
        Ok(self.store.find_page(query).await?)
    }

    pub async fn get(&self, owner_id: &str, id: Uuid) -> AppResult<Image> {
        self.store
            .find_by_id(owner_id, id)
            .await?
            .ok_or_else(|| AppError::image_not_found(id.to_string()))
    }

    /// 编辑描述字段，可同时替换文件；排序键保持不变
    pub async fn edit(
        &self,
        owner_id: &str,
        id: Uuid,
        mut update: ImageUpdate,
        file: Option<FilePart>,
    ) -> AppResult<Image> {
        if let Some(title) = update.title.take() {
            require_title(&title)?;
            update.title = Some(title.trim().to_string());
        }

        let _guard = self.ordering.lock_owner(owner_id).await;
        let existing = self.get(owner_id, id).await?;

        let replacement = match file {
            Some(part) => {
                let fallback = update
                    .original_file_name
                    .clone()
                    .unwrap_or_else(|| existing.original_file_name.clone());
                let stored = self
                    .storage
                    .put(owner_id, upload_name(&part, &fallback), &part.bytes)
                    .await?;

                if update.original_file_name.is_none() && !part.file_name.is_empty() {
                    update.original_file_name = Some(part.file_name.clone());
                }
                if update.mime_type.is_none() {
                    update.mime_type = Some(
                        part.content_type
                            .clone()
                            .unwrap_or_else(|| stored.content_type.clone()),
                    );
                }
                if update.file_size.is_none() {
                    update.file_size = Some(stored.size as i64);
                }
                update.url = Some(stored.url.clone());
                update.storage_key = Some(stored.key.clone());
                Some(stored)
            }
            None => None,
        };

        if update.is_empty() {
            return Ok(existing);
        }

        let updated = match self.store.update_metadata(owner_id, id, update).await {
            Ok(Some(image)) => image,
            Ok(None) => {
                if let Some(stored) = &replacement {
                    self.release_file(owner_id, &stored.key).await;
                }
                return Err(AppError::image_not_found(id.to_string()));
            }
            Err(e) => {
                if let Some(stored) = &replacement {
                    self.release_file(owner_id, &stored.key).await;
                }
                return Err(e.into());
            }
        };

        if updated.storage_key != existing.storage_key {
            self.release_file(owner_id, &existing.storage_key).await;
        }

        tracing::info!(
            owner_id = %owner_id,
            image_id = %id,
            file_replaced = replacement.is_some(),
            "Image updated"
        );
        Ok(updated)
    }

    /// 删除记录，再删除不再被引用的文件
    pub async fn delete(&self, owner_id: &str, id: Uuid) -> AppResult<Image> {
        let _guard = self.ordering.lock_owner(owner_id).await;
        let removed = self
            .store
            .delete(owner_id, id)
            .await?
            .ok_or_else(|| AppError::image_not_found(id.to_string()))?;

        self.release_file(owner_id, &removed.storage_key).await;
        tracing::info!(owner_id = %owner_id, image_id = %id, "Image deleted");
        Ok(removed)
    }

    /// 拖拽排序
    pub async fn reorder(&self, owner_id: &str, request: ReorderRequest) -> AppResult<Image> {
        let item = self
            .ordering
            .apply_move(
                request.image_id,
                owner_id,
                request.previous_order,
                request.next_order,
            )
            .await?;
        self.get(owner_id, item.id).await
    }

    /// 读取已存储的文件
    pub async fn read_file(&self, owner_id: &str, file_name: &str) -> AppResult<StoredFile> {
        let key = format!("{owner_id}/{file_name}");
        self.storage
            .get(&key)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {key}")))
    }

    async fn release_files(&self, owner_id: &str, keys: &[String]) {
        for key in keys {
            self.release_file(owner_id, key).await;
        }
    }

    /// 没有记录引用时删除文件；失败只记日志
    async fn release_file(&self, owner_id: &str, key: &str) {
        match self.store.storage_key_in_use(owner_id, key).await {
            Ok(true) => {}
            Ok(false) => {
                if let Err(e) = self.storage.delete(key).await {
                    tracing::warn!(key = %key, error = %e, "Failed to delete image file");
                }
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to check image file references");
            }
        }
    }
}

fn upload_name<'a>(part: &'a FilePart, fallback: &'a str) -> &'a str {
    if part.file_name.trim().is_empty() {
        fallback
    } else {
        &part.file_name
    }
}
