//! Per-owner 异步锁
//!
//! 同一 owner 的 "读键 -> 写键" 序列串行执行，不同 owner 之间互不阻塞。

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// 持有期间独占该 owner 的排序写入
pub type OwnerGuard = OwnedMutexGuard<()>;

#[derive(Debug, Default)]
pub struct OwnerLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取 owner 锁
    pub async fn lock(&self, owner_id: &str) -> OwnerGuard {
        // DashMap 的分片锁不能跨 await 持有
        let mutex = self
            .locks
            .entry(owner_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// 已登记的 owner 数
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
