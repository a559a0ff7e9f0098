//! In-memory image store
//!
//! 与 PostgreSQL 实现语义一致，用于测试和 `STORE_BACKEND=memory`。

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use shared::models::{Image, ImagePage, ImageQuery, ImageUpdate, NewImage, SortBy, SortOrder};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ImageStore, RepoResult};
use crate::ordering::{Direction, OrderKey, OrderStore, OrderedItem};

#[derive(Debug, Default)]
pub struct MemoryImageStore {
    images: RwLock<HashMap<Uuid, Image>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.images.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.images.read().await.is_empty()
    }
}

/// 键升序，键相同按 id
fn by_key(a: &Image, b: &Image) -> Ordering {
    a.order_key
        .total_cmp(&b.order_key)
        .then_with(|| a.id.cmp(&b.id))
}

fn to_item(image: &Image) -> OrderedItem {
    OrderedItem {
        id: image.id,
        owner_id: image.owner_id.clone(),
        order_key: image.order_key,
    }
}

#[async_trait]
impl OrderStore for MemoryImageStore {
    async fn find_nearest_order(
        &self,
        owner_id: &str,
        target: OrderKey,
        direction: Direction,
    ) -> RepoResult<Option<OrderKey>> {
        let images = self.images.read().await;
        let keys = images
            .values()
            .filter(|img| img.owner_id == owner_id)
            .map(|img| img.order_key);

        let nearest = match direction {
            Direction::Ascending => keys.filter(|k| *k > target).min_by(f64::total_cmp),
            Direction::Descending => keys.filter(|k| *k < target).max_by(f64::total_cmp),
        };
        Ok(nearest)
    }

    async fn find_window(
        &self,
        owner_id: &str,
        lower: Option<OrderKey>,
        upper: Option<OrderKey>,
        limit: usize,
    ) -> RepoResult<Vec<OrderedItem>> {
        let images = self.images.read().await;
        let mut in_range: Vec<&Image> = images
            .values()
            .filter(|img| img.owner_id == owner_id)
            .filter(|img| lower.is_none_or(|l| img.order_key >= l))
            .filter(|img| upper.is_none_or(|u| img.order_key <= u))
            .collect();
        in_range.sort_by(|a, b| by_key(a, b));

        let window = if lower.is_none() && upper.is_some() {
            let skip = in_range.len().saturating_sub(limit);
            &in_range[skip..]
        } else {
            &in_range[..limit.min(in_range.len())]
        };
        Ok(window.iter().map(|img| to_item(img)).collect())
    }

    async fn rewrite_keys(&self, owner_id: &str, updates: &[(Uuid, OrderKey)]) -> RepoResult<()> {
        let mut images = self.images.write().await;
        let now = Utc::now();
        for (id, key) in updates {
            if let Some(img) = images.get_mut(id)
                && img.owner_id == owner_id
            {
                img.order_key = *key;
                img.updated_at = now;
            }
        }
        Ok(())
    }

    async fn update_item_key(
        &self,
        owner_id: &str,
        item_id: Uuid,
        key: OrderKey,
    ) -> RepoResult<Option<OrderedItem>> {
        let mut images = self.images.write().await;
        let Some(img) = images
            .get_mut(&item_id)
            .filter(|img| img.owner_id == owner_id)
        else {
            return Ok(None);
        };
        img.order_key = key;
        img.updated_at = Utc::now();
        Ok(Some(to_item(img)))
    }

    async fn find_max_order(&self, owner_id: &str) -> RepoResult<OrderKey> {
        let images = self.images.read().await;
        Ok(images
            .values()
            .filter(|img| img.owner_id == owner_id)
            .map(|img| img.order_key)
            .max_by(f64::total_cmp)
            .unwrap_or(0.0))
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn insert_many(&self, images: Vec<NewImage>) -> RepoResult<Vec<Image>> {
        let mut stored = self.images.write().await;
        let now = Utc::now();

        let created: Vec<Image> = images
            .into_iter()
            .map(|new| Image {
                id: Uuid::new_v4(),
                owner_id: new.owner_id,
                title: new.title,
                url: new.url,
                storage_key: new.storage_key,
                original_file_name: new.original_file_name,
                mime_type: new.mime_type,
                file_size: new.file_size,
                order_key: new.order_key,
                created_at: now,
                updated_at: now,
            })
            .collect();

        for image in &created {
            stored.insert(image.id, image.clone());
        }
        Ok(created)
    }

    async fn find_by_id(&self, owner_id: &str, id: Uuid) -> RepoResult<Option<Image>> {
        let images = self.images.read().await;
        Ok(images
            .get(&id)
            .filter(|img| img.owner_id == owner_id)
            .cloned())
    }

    async fn find_page(&self, query: &ImageQuery) -> RepoResult<ImagePage> {
        let images = self.images.read().await;
        let needle = query.search.as_ref().map(|s| s.to_lowercase());

        let mut matched: Vec<&Image> = images
            .values()
            .filter(|img| img.owner_id == query.owner_id)
            .filter(|img| {
                needle
                    .as_ref()
                    .is_none_or(|n| img.title.to_lowercase().contains(n))
            })
            .collect();

        matched.sort_by(|a, b| {
            let primary = match query.sort_by {
                SortBy::Order => a.order_key.total_cmp(&b.order_key),
                SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
                SortBy::Title => a.title.cmp(&b.title),
            };
            let ordering = primary.then_with(|| a.id.cmp(&b.id));
            match query.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = matched.len() as i64;
        let page = matched
            .into_iter()
            .skip(query.skip.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .cloned()
            .collect();

        Ok(ImagePage {
            images: page,
            total,
        })
    }

    async fn update_metadata(
        &self,
        owner_id: &str,
        id: Uuid,
        update: ImageUpdate,
    ) -> RepoResult<Option<Image>> {
        let mut images = self.images.write().await;
        let Some(img) = images.get_mut(&id).filter(|img| img.owner_id == owner_id) else {
            return Ok(None);
        };

        if let Some(title) = update.title {
            img.title = title;
        }
        if let Some(name) = update.original_file_name {
            img.original_file_name = name;
        }
        if let Some(mime) = update.mime_type {
            img.mime_type = mime;
        }
        if let Some(size) = update.file_size {
            img.file_size = size;
        }
        if let Some(url) = update.url {
            img.url = url;
        }
        if let Some(key) = update.storage_key {
            img.storage_key = key;
        }
        img.updated_at = Utc::now();

        Ok(Some(img.clone()))
    }

    async fn delete(&self, owner_id: &str, id: Uuid) -> RepoResult<Option<Image>> {
        let mut images = self.images.write().await;
        if images.get(&id).is_some_and(|img| img.owner_id == owner_id) {
            Ok(images.remove(&id))
        } else {
            Ok(None)
        }
    }

    async fn storage_key_in_use(&self, owner_id: &str, storage_key: &str) -> RepoResult<bool> {
        let images = self.images.read().await;
        Ok(images
            .values()
            .any(|img| img.owner_id == owner_id && img.storage_key == storage_key))
    }
}
