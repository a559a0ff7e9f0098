//! 分数排序引擎
//!
//! 为每个 owner 的有序集合 (图库) 计算插入键、执行移动和批量追加。
//!
//! - [`OrderedCollectionManager`] - 键计算、碰撞修复、移动、追加
//! - [`OrderStore`] - 持久层接口 (构造注入)
//! - [`OwnerLocks`] - per-owner 串行化

pub mod error;
pub mod locks;
pub mod manager;
pub mod store;
pub mod types;

pub use error::OrderingError;
pub use locks::{OwnerGuard, OwnerLocks};
pub use manager::{AppendBatch, OrderedCollectionManager};
pub use store::OrderStore;
pub use types::{
    APPEND_STEP, Anchors, Direction, EDGE_STEP, OrderKey, OrderedItem, Placement, RenumberPolicy,
};
