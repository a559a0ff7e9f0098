//! Gallery Image Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default page size for gallery listings
pub const DEFAULT_PAGE_LIMIT: i64 = 8;

/// Image record
///
/// `order_key` is a fractional sort key; the owner's gallery is displayed by
/// sorting on it. It is serialized as `order` because that is the value the
/// client echoes back as `previousOrder` / `nextOrder` when reordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub url: String,
    /// Storage object key (not exposed to clients)
    #[serde(skip)]
    pub storage_key: String,
    pub original_file_name: String,
    pub mime_type: String,
    pub file_size: i64,
    #[serde(rename = "order")]
    pub order_key: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload; the key comes from the append batch
#[derive(Debug, Clone)]
pub struct NewImage {
    pub owner_id: String,
    pub title: String,
    pub url: String,
    pub storage_key: String,
    pub original_file_name: String,
    pub mime_type: String,
    pub file_size: i64,
    pub order_key: f64,
}

/// Update image payload
///
/// The order key is deliberately absent: it only changes through reorder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUpdate {
    pub title: Option<String>,
    pub original_file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
    #[serde(skip)]
    pub url: Option<String>,
    #[serde(skip)]
    pub storage_key: Option<String>,
}

impl ImageUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.original_file_name.is_none()
            && self.mime_type.is_none()
            && self.file_size.is_none()
            && self.url.is_none()
            && self.storage_key.is_none()
    }
}

/// Sortable columns for listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    Order,
    CreatedAt,
    Title,
}

impl SortBy {
    /// Column name in the images table
    pub fn column(&self) -> &'static str {
        match self {
            SortBy::Order => "order_key",
            SortBy::CreatedAt => "created_at",
            SortBy::Title => "title",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Query-string parameters of `GET /api/images`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageListParams {
    pub search: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
}

impl ImageListParams {
    /// Resolve defaults and bind the query to an owner
    pub fn into_query(self, owner_id: impl Into<String>) -> ImageQuery {
        ImageQuery {
            owner_id: owner_id.into(),
            search: self
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            skip: self.skip.unwrap_or(0).max(0),
            limit: self.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_PAGE_LIMIT),
            sort_by: self.sort_by.unwrap_or_default(),
            sort_order: self.sort_order.unwrap_or_default(),
        }
    }
}

/// Resolved listing query
#[derive(Debug, Clone, PartialEq)]
pub struct ImageQuery {
    pub owner_id: String,
    /// Case-insensitive title substring
    pub search: Option<String>,
    pub skip: i64,
    pub limit: i64,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

/// One page of images plus the total match count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePage {
    pub images: Vec<Image>,
    pub total: i64,
}

/// Body of `PATCH /api/images/reorder`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub image_id: Uuid,
    pub previous_order: Option<f64>,
    pub next_order: Option<f64>,
}
