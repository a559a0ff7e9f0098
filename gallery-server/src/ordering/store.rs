//! Order Store 抽象
//!
//! 排序引擎只通过该 trait 读写 `(owner, id, key)`，由构造函数注入。

use async_trait::async_trait;
use uuid::Uuid;

use super::types::{Direction, OrderKey, OrderedItem};
use crate::db::RepoResult;

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// 指定方向上严格相邻的最近键
    async fn find_nearest_order(
        &self,
        owner_id: &str,
        target: OrderKey,
        direction: Direction,
    ) -> RepoResult<Option<OrderKey>>;

    /// 闭区间 `[lower, upper]` 内最多 `limit` 个条目，按键升序返回
    ///
    /// 只有 `upper` 时取最靠近 `upper` 的 `limit` 个；其余情况从 `lower`
    /// 一侧开始取。键相同的条目按 id 排序。
    async fn find_window(
        &self,
        owner_id: &str,
        lower: Option<OrderKey>,
        upper: Option<OrderKey>,
        limit: usize,
    ) -> RepoResult<Vec<OrderedItem>>;

    /// 批量改写键 (SQL 实现在单个事务内完成)
    async fn rewrite_keys(&self, owner_id: &str, updates: &[(Uuid, OrderKey)]) -> RepoResult<()>;

    /// 改写单个条目的键；条目不存在或不属于 owner 时返回 `None`
    async fn update_item_key(
        &self,
        owner_id: &str,
        item_id: Uuid,
        key: OrderKey,
    ) -> RepoResult<Option<OrderedItem>>;

    /// 当前最大键，集合为空时为 0
    async fn find_max_order(&self, owner_id: &str) -> RepoResult<OrderKey>;
}
