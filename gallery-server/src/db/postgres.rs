//! PostgreSQL image store
//!
//! `(owner_id, order_key)` 索引支撑范围查询和最近邻查询，
//! 批量改写键用 `UNNEST` 在单个事务内完成。

use std::collections::HashMap;

use async_trait::async_trait;
use shared::models::{Image, ImagePage, ImageQuery, ImageUpdate, NewImage};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::{ImageStore, RepoResult};
use crate::ordering::{Direction, OrderKey, OrderStore, OrderedItem};

const IMAGE_COLUMNS: &str = "id, owner_id, title, url, storage_key, original_file_name, \
                             mime_type, file_size, order_key, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgImageStore {
    pool: PgPool,
}

impl PgImageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 建立连接池并执行迁移
    pub async fn connect(database_url: &str, max_connections: u32) -> RepoResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        tracing::info!("Database connection established (PostgreSQL)");

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// 转义 ILIKE 通配符
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn to_item((id, owner_id, order_key): (Uuid, String, f64)) -> OrderedItem {
    OrderedItem {
        id,
        owner_id,
        order_key,
    }
}

#[async_trait]
impl OrderStore for PgImageStore {
    async fn find_nearest_order(
        &self,
        owner_id: &str,
        target: OrderKey,
        direction: Direction,
    ) -> RepoResult<Option<OrderKey>> {
        let sql = match direction {
            Direction::Ascending => {
                "SELECT MIN(order_key) FROM images WHERE owner_id = $1 AND order_key > $2"
            }
            Direction::Descending => {
                "SELECT MAX(order_key) FROM images WHERE owner_id = $1 AND order_key < $2"
            }
        };
        let (key,): (Option<f64>,) = sqlx::query_as(sql)
            .bind(owner_id)
            .bind(target)
            .fetch_one(&self.pool)
            .await?;
        Ok(key)
    }

    async fn find_window(
        &self,
        owner_id: &str,
        lower: Option<OrderKey>,
        upper: Option<OrderKey>,
        limit: usize,
    ) -> RepoResult<Vec<OrderedItem>> {
        let limit = limit as i64;

        let rows: Vec<(Uuid, String, f64)> = if lower.is_none() && upper.is_some() {
            // 最靠近上界的 limit 个，再翻回升序
            sqlx::query_as(
                r#"
                SELECT id, owner_id, order_key FROM (
                    SELECT id, owner_id, order_key
                    FROM images
                    WHERE owner_id = $1 AND order_key <= $2
                    ORDER BY order_key DESC, id DESC
                    LIMIT $3
                ) w
                ORDER BY order_key ASC, id ASC
                "#,
            )
            .bind(owner_id)
            .bind(upper)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                r#"
                SELECT id, owner_id, order_key
                FROM images
                WHERE owner_id = $1
                  AND ($2::float8 IS NULL OR order_key >= $2)
                  AND ($3::float8 IS NULL OR order_key <= $3)
                ORDER BY order_key ASC, id ASC
                LIMIT $4
                "#,
            )
            .bind(owner_id)
            .bind(lower)
            .bind(upper)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(rows.into_iter().map(to_item).collect())
    }

    async fn rewrite_keys(&self, owner_id: &str, updates: &[(Uuid, OrderKey)]) -> RepoResult<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = updates.iter().map(|(id, _)| *id).collect();
        let keys: Vec<f64> = updates.iter().map(|(_, k)| *k).collect();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            UPDATE images AS i
            SET order_key = u.order_key, updated_at = now()
            FROM UNNEST($2::uuid[], $3::float8[]) AS u(id, order_key)
            WHERE i.id = u.id AND i.owner_id = $1
            "#,
        )
        .bind(owner_id)
        .bind(&ids)
        .bind(&keys)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_item_key(
        &self,
        owner_id: &str,
        item_id: Uuid,
        key: OrderKey,
    ) -> RepoResult<Option<OrderedItem>> {
        let row: Option<(Uuid, String, f64)> = sqlx::query_as(
            r#"
            UPDATE images SET order_key = $3, updated_at = now()
            WHERE id = $2 AND owner_id = $1
            RETURNING id, owner_id, order_key
            "#,
        )
        .bind(owner_id)
        .bind(item_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(to_item))
    }

    async fn find_max_order(&self, owner_id: &str) -> RepoResult<OrderKey> {
        let (max,): (Option<f64>,) =
            sqlx::query_as("SELECT MAX(order_key) FROM images WHERE owner_id = $1")
                .bind(owner_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(max.unwrap_or(0.0))
    }
}

#[async_trait]
impl ImageStore for PgImageStore {
    async fn insert_many(&self, images: Vec<NewImage>) -> RepoResult<Vec<Image>> {
        if images.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = images.iter().map(|_| Uuid::new_v4()).collect();
        let mut owners = Vec::with_capacity(images.len());
        let mut titles = Vec::with_capacity(images.len());
        let mut urls = Vec::with_capacity(images.len());
        let mut storage_keys = Vec::with_capacity(images.len());
        let mut file_names = Vec::with_capacity(images.len());
        let mut mime_types = Vec::with_capacity(images.len());
        let mut sizes = Vec::with_capacity(images.len());
        let mut keys = Vec::with_capacity(images.len());
        for img in images {
            owners.push(img.owner_id);
            titles.push(img.title);
            urls.push(img.url);
            storage_keys.push(img.storage_key);
            file_names.push(img.original_file_name);
            mime_types.push(img.mime_type);
            sizes.push(img.file_size);
            keys.push(img.order_key);
        }

        let sql = format!(
            r#"
            INSERT INTO images (
                id, owner_id, title, url, storage_key,
                original_file_name, mime_type, file_size, order_key
            )
            SELECT * FROM UNNEST(
                $1::uuid[], $2::text[], $3::text[], $4::text[], $5::text[],
                $6::text[], $7::text[], $8::bigint[], $9::float8[]
            )
            RETURNING {IMAGE_COLUMNS}
            "#
        );
        let rows: Vec<Image> = sqlx::query_as(&sql)
            .bind(&ids)
            .bind(&owners)
            .bind(&titles)
            .bind(&urls)
            .bind(&storage_keys)
            .bind(&file_names)
            .bind(&mime_types)
            .bind(&sizes)
            .bind(&keys)
            .fetch_all(&self.pool)
            .await?;

        // RETURNING 不保证顺序，按输入 id 还原
        let mut by_id: HashMap<Uuid, Image> = rows.into_iter().map(|r| (r.id, r)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn find_by_id(&self, owner_id: &str, id: Uuid) -> RepoResult<Option<Image>> {
        let sql = format!("SELECT {IMAGE_COLUMNS} FROM images WHERE id = $2 AND owner_id = $1");
        let image = sqlx::query_as::<_, Image>(&sql)
            .bind(owner_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(image)
    }

    async fn find_page(&self, query: &ImageQuery) -> RepoResult<ImagePage> {
        let pattern = query.search.as_deref().map(like_pattern);

        // 排序列和方向来自白名单枚举
        let direction = query.sort_order.as_sql();
        let sql = format!(
            r#"
            SELECT {IMAGE_COLUMNS}
            FROM images
            WHERE owner_id = $1 AND ($2::text IS NULL OR title ILIKE $2)
            ORDER BY {column} {direction}, id {direction}
            OFFSET $3 LIMIT $4
            "#,
            column = query.sort_by.column(),
        );

        let images = sqlx::query_as::<_, Image>(&sql)
            .bind(&query.owner_id)
            .bind(&pattern)
            .bind(query.skip)
            .bind(query.limit)
            .fetch_all(&self.pool)
            .await?;

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM images WHERE owner_id = $1 AND ($2::text IS NULL OR title ILIKE $2)",
        )
        .bind(&query.owner_id)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        Ok(ImagePage { images, total })
    }

    async fn update_metadata(
        &self,
        owner_id: &str,
        id: Uuid,
        update: ImageUpdate,
    ) -> RepoResult<Option<Image>> {
        let sql = format!(
            r#"
            UPDATE images SET
                title = COALESCE($3, title),
                original_file_name = COALESCE($4, original_file_name),
                mime_type = COALESCE($5, mime_type),
                file_size = COALESCE($6, file_size),
                url = COALESCE($7, url),
                storage_key = COALESCE($8, storage_key),
                updated_at = now()
            WHERE id = $2 AND owner_id = $1
            RETURNING {IMAGE_COLUMNS}
            "#
        );
        let image = sqlx::query_as::<_, Image>(&sql)
            .bind(owner_id)
            .bind(id)
            .bind(update.title)
            .bind(update.original_file_name)
            .bind(update.mime_type)
            .bind(update.file_size)
            .bind(update.url)
            .bind(update.storage_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(image)
    }

    async fn delete(&self, owner_id: &str, id: Uuid) -> RepoResult<Option<Image>> {
        let sql =
            format!("DELETE FROM images WHERE id = $2 AND owner_id = $1 RETURNING {IMAGE_COLUMNS}");
        let image = sqlx::query_as::<_, Image>(&sql)
            .bind(owner_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(image)
    }

    async fn storage_key_in_use(&self, owner_id: &str, storage_key: &str) -> RepoResult<bool> {
        let (in_use,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM images WHERE owner_id = $1 AND storage_key = $2)",
        )
        .bind(owner_id)
        .bind(storage_key)
        .fetch_one(&self.pool)
        .await?;
        Ok(in_use)
    }
}
