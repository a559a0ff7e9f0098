//! OrderedCollectionManager - 分数排序键决策
//!
//! # 键计算规则
//!
//! | 锚点 | 结果 |
//! |------|------|
//! | previous + next | 两者中点 |
//! | 仅 next | 与 next 之上最近键的中点；没有则 `next + 100` |
//! | 仅 previous | 与 previous 之下最近键的中点；没有则 `previous - 100` |
//! | 都没有 | `InvalidReorderContext` |
//!
//! 若结果与锚点 (或查到的邻居) 相等，说明浮点间隙已耗尽：取受影响区间内
//! 最多 10 个条目，从窗口最小的旧键开始按 100 的间隔重编号，且不越过
//! 窗口之上第一个未改写的键，再按同样规则重算一次。窗口外条目的键和
//! 相对顺序不变。放不下或重算仍冲突则返回 `KeySpaceExhausted`。

use std::sync::Arc;

use uuid::Uuid;

use super::error::OrderingError;
use super::locks::{OwnerGuard, OwnerLocks};
use super::store::OrderStore;
use super::types::{
    APPEND_STEP, Anchors, Direction, EDGE_STEP, OrderKey, OrderedItem, Placement, RenumberPolicy,
    midpoint,
};

/// 候选键及其必须严格落入的开区间
#[derive(Debug, Clone, Copy)]
struct Candidate {
    key: OrderKey,
    low: Option<OrderKey>,
    high: Option<OrderKey>,
}

impl Candidate {
    fn is_clear(&self) -> bool {
        self.key.is_finite()
            && self.low.is_none_or(|l| self.key > l)
            && self.high.is_none_or(|h| self.key < h)
    }
}

/// 批量追加分配结果
///
/// 持有 owner 锁直到被 drop，调用方应在持有期间完成新行写入，
/// 避免并发追加读到相同的最大键。
#[derive(Debug)]
pub struct AppendBatch<T> {
    entries: Vec<(T, OrderKey)>,
    _guard: OwnerGuard,
}

impl<T> AppendBatch<T> {
    /// 按输入顺序排列的 `(条目, 新键)`
    pub fn entries(&self) -> &[(T, OrderKey)] {
        &self.entries
    }

    pub fn keys(&self) -> Vec<OrderKey> {
        self.entries.iter().map(|(_, k)| *k).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 有序集合管理器
///
/// 通过构造函数注入 [`OrderStore`]，自身不缓存任何键。
pub struct OrderedCollectionManager<S: ?Sized> {
    store: Arc<S>,
    policy: RenumberPolicy,
    locks: OwnerLocks,
}

impl<S: OrderStore + ?Sized> OrderedCollectionManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_policy(store, RenumberPolicy::default())
    }

    pub fn with_policy(store: Arc<S>, policy: RenumberPolicy) -> Self {
        Self {
            store,
            policy,
            locks: OwnerLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn policy(&self) -> &RenumberPolicy {
        &self.policy
    }

    /// 计算插入键
    ///
    /// 无冲突时只读；发生碰撞修复时会改写窗口内条目的键。
    pub async fn compute_insertion_key(
        &self,
        owner_id: &str,
        previous: Option<OrderKey>,
        next: Option<OrderKey>,
    ) -> Result<OrderKey, OrderingError> {
        let _guard = self.locks.lock(owner_id).await;
        self.compute_locked(owner_id, Anchors::new(previous, next))
            .await
    }

    /// 计算新键并写入 `item_id`
    ///
    /// 计算与写入在同一把 owner 锁内完成。最终写入失败时不会回滚
    /// 已经发生的窗口重编号，调用方应重新拉取权威顺序。
    pub async fn apply_move(
        &self,
        item_id: Uuid,
        owner_id: &str,
        previous: Option<OrderKey>,
        next: Option<OrderKey>,
    ) -> Result<OrderedItem, OrderingError> {
        let _guard = self.locks.lock(owner_id).await;
        let key = self
            .compute_locked(owner_id, Anchors::new(previous, next))
            .await?;

        let item = self
            .store
            .update_item_key(owner_id, item_id, key)
            .await?
            .ok_or(OrderingError::ItemNotFound(item_id))?;

        tracing::info!(
            owner_id = %owner_id,
            item_id = %item_id,
            order_key = key,
            "Item moved"
        );
        Ok(item)
    }

    /// 为新条目按输入顺序分配 `max + (i + 1) * 1000`
    pub async fn append_bulk<T>(
        &self,
        owner_id: &str,
        items: Vec<T>,
    ) -> Result<AppendBatch<T>, OrderingError> {
        let guard = self.locks.lock(owner_id).await;
        let max = self.store.find_max_order(owner_id).await?;

        let entries: Vec<(T, OrderKey)> = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| (item, max + (i + 1) as OrderKey * APPEND_STEP))
            .collect();

        tracing::debug!(
            owner_id = %owner_id,
            max_order = max,
            count = entries.len(),
            "Allocated append keys"
        );
        Ok(AppendBatch {
            entries,
            _guard: guard,
        })
    }

    /// 独占该 owner 的写入序列
    ///
    /// 供需要与追加、移动串行的调用方使用 (例如删除记录后清理共享文件)。
    /// 持有期间不能再调用本管理器的加锁方法。
    pub async fn lock_owner(&self, owner_id: &str) -> OwnerGuard {
        self.locks.lock(owner_id).await
    }

    /// 调用方必须已持有 owner 锁
    async fn compute_locked(
        &self,
        owner_id: &str,
        anchors: Anchors,
    ) -> Result<OrderKey, OrderingError> {
        let placement = anchors.placement()?;

        let candidate = self.candidate(owner_id, placement).await?;
        if candidate.is_clear() {
            tracing::debug!(
                owner_id = %owner_id,
                previous = ?anchors.previous,
                next = ?anchors.next,
                order_key = candidate.key,
                "Computed insertion key"
            );
            return Ok(candidate.key);
        }

        tracing::warn!(
            owner_id = %owner_id,
            previous = ?anchors.previous,
            next = ?anchors.next,
            collided = candidate.key,
            "Order key collision, renumbering window"
        );

        let repaired = self.renumber_window(owner_id, placement).await?;
        let candidate = self.candidate(owner_id, repaired).await?;
        if !candidate.is_clear() {
            tracing::error!(
                owner_id = %owner_id,
                placement = ?repaired,
                "Order key still collides after renumbering"
            );
            return Err(OrderingError::KeySpaceExhausted);
        }

        tracing::debug!(
            owner_id = %owner_id,
            order_key = candidate.key,
            "Computed insertion key after renumbering"
        );
        Ok(candidate.key)
    }

    async fn candidate(
        &self,
        owner_id: &str,
        placement: Placement,
    ) -> Result<Candidate, OrderingError> {
        let candidate = match placement {
            Placement::Between { low, high } => Candidate {
                key: midpoint(low, high),
                low: Some(low),
                high: Some(high),
            },
            Placement::NextOnly { next } => {
                let above = self
                    .store
                    .find_nearest_order(owner_id, next, Direction::Ascending)
                    .await?;
                Candidate {
                    key: above.map_or(next + EDGE_STEP, |a| midpoint(next, a)),
                    low: Some(next),
                    high: above,
                }
            }
            Placement::PreviousOnly { previous } => {
                let below = self
                    .store
                    .find_nearest_order(owner_id, previous, Direction::Descending)
                    .await?;
                Candidate {
                    key: below.map_or(previous - EDGE_STEP, |b| midpoint(b, previous)),
                    low: below,
                    high: Some(previous),
                }
            }
        };
        Ok(candidate)
    }

    /// 重编号受影响窗口并返回重新定位后的锚点
    async fn renumber_window(
        &self,
        owner_id: &str,
        placement: Placement,
    ) -> Result<Placement, OrderingError> {
        let (lower, upper) = placement.window_bounds();
        let window = self
            .store
            .find_window(owner_id, lower, upper, self.policy.window)
            .await?;

        let (Some(first), Some(last)) = (window.first(), window.last()) else {
            return Ok(placement);
        };

        let ceiling = self
            .store
            .find_nearest_order(owner_id, last.order_key, Direction::Ascending)
            .await?;
        let Some(keys) = self
            .policy
            .renumbered_keys(first.order_key, window.len(), ceiling)
        else {
            tracing::error!(
                owner_id = %owner_id,
                start = first.order_key,
                ceiling = ?ceiling,
                count = window.len(),
                "No room to renumber order window"
            );
            return Err(OrderingError::KeySpaceExhausted);
        };

        let renumbered: Vec<(Uuid, OrderKey)> =
            window.iter().map(|item| item.id).zip(keys).collect();

        self.store.rewrite_keys(owner_id, &renumbered).await?;

        tracing::warn!(
            owner_id = %owner_id,
            renumbered = renumbered.len(),
            "Renumbered order window"
        );
        Ok(placement.relocate(&window, &renumbered))
    }
}
