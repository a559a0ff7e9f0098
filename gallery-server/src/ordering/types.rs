//! 排序键基础类型

use uuid::Uuid;

use super::error::OrderingError;

/// 分数排序键
///
/// 同一 owner 下按升序排列即为展示顺序。
pub type OrderKey = f64;

/// 批量追加时相邻新项的间隔
pub const APPEND_STEP: OrderKey = 1000.0;

/// 单侧锚点且该侧无邻居时的偏移量
pub const EDGE_STEP: OrderKey = 100.0;

/// 最近邻查询方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// 严格大于目标键的最小键
    Ascending,
    /// 严格小于目标键的最大键
    Descending,
}

/// 排序引擎看到的条目投影
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedItem {
    pub id: Uuid,
    pub owner_id: String,
    pub order_key: OrderKey,
}

/// 碰撞修复时的重编号策略
///
/// 窗口内条目从窗口最小的旧键开始，按原有升序依次改写为
/// `start`, `start + spacing`, ...，且全部低于窗口之上第一个未改写的键。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenumberPolicy {
    pub spacing: OrderKey,
    /// 单次修复最多改写的条目数
    pub window: usize,
}

impl Default for RenumberPolicy {
    fn default() -> Self {
        Self {
            spacing: 100.0,
            window: 10,
        }
    }
}

impl RenumberPolicy {
    /// 为 `count` 个条目生成从 `start` 开始的严格递增新键
    ///
    /// 新键必须全部小于 `ceiling`。`spacing` 放不下时压缩为
    /// `(ceiling - start) / count`，仍无法严格递增则返回 `None`。
    pub fn renumbered_keys(
        &self,
        start: OrderKey,
        count: usize,
        ceiling: Option<OrderKey>,
    ) -> Option<Vec<OrderKey>> {
        if count == 0 {
            return Some(Vec::new());
        }

        let span = (count - 1) as OrderKey * self.spacing;
        let spacing = match ceiling {
            Some(c) if start + span >= c => (c - start) / count as OrderKey,
            _ => self.spacing,
        };

        let keys: Vec<OrderKey> = (0..count)
            .map(|i| start + i as OrderKey * spacing)
            .collect();

        let increasing = keys.windows(2).all(|w| w[0] < w[1]);
        let below = match (ceiling, keys.last()) {
            (Some(c), Some(last)) => *last < c,
            _ => true,
        };
        (increasing && below && keys.iter().all(|k| k.is_finite())).then_some(keys)
    }
}

/// 客户端给出的邻居键
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Anchors {
    pub previous: Option<OrderKey>,
    pub next: Option<OrderKey>,
}

impl Anchors {
    pub fn new(previous: Option<OrderKey>, next: Option<OrderKey>) -> Self {
        Self { previous, next }
    }

    /// 按锚点组合分类
    ///
    /// 两个锚点都缺失，或任一锚点不是有限数时返回
    /// [`OrderingError::InvalidReorderContext`]。
    pub fn placement(&self) -> Result<Placement, OrderingError> {
        let finite = |k: Option<OrderKey>| k.is_none_or(f64::is_finite);
        if !finite(self.previous) || !finite(self.next) {
            return Err(OrderingError::InvalidReorderContext);
        }

        match (self.previous, self.next) {
            (Some(a), Some(b)) => Ok(Placement::Between {
                low: a.min(b),
                high: a.max(b),
            }),
            (None, Some(next)) => Ok(Placement::NextOnly { next }),
            (Some(previous), None) => Ok(Placement::PreviousOnly { previous }),
            (None, None) => Err(OrderingError::InvalidReorderContext),
        }
    }
}

/// 插入位置
///
/// `Between` 的上下界已归一化 (`low <= high`)，客户端按降序展示时
/// `previous` 可能大于 `next`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Between { low: OrderKey, high: OrderKey },
    NextOnly { next: OrderKey },
    PreviousOnly { previous: OrderKey },
}

impl Placement {
    /// 碰撞修复窗口的闭区间边界 `(lower, upper)`
    pub fn window_bounds(&self) -> (Option<OrderKey>, Option<OrderKey>) {
        match *self {
            Placement::Between { low, high } => (Some(low), Some(high)),
            Placement::NextOnly { next } => (Some(next), None),
            Placement::PreviousOnly { previous } => (None, Some(previous)),
        }
    }

    /// 用重编号后的窗口重新定位锚点
    ///
    /// 下锚点取窗口中第一个旧键相等的条目，上锚点取最后一个，
    /// 以便在重复键的情况下拉开最大间隙。找不到时保留原值。
    pub fn relocate(&self, window: &[OrderedItem], renumbered: &[(Uuid, OrderKey)]) -> Placement {
        let first = |key: OrderKey| {
            window
                .iter()
                .position(|item| item.order_key == key)
                .and_then(|i| renumbered.get(i))
                .map(|(_, k)| *k)
                .unwrap_or(key)
        };
        let last = |key: OrderKey| {
            window
                .iter()
                .rposition(|item| item.order_key == key)
                .and_then(|i| renumbered.get(i))
                .map(|(_, k)| *k)
                .unwrap_or(key)
        };

        match *self {
            Placement::Between { low, high } => Placement::Between {
                low: first(low),
                high: last(high),
            },
            Placement::NextOnly { next } => Placement::NextOnly { next: first(next) },
            Placement::PreviousOnly { previous } => Placement::PreviousOnly {
                previous: last(previous),
            },
        }
    }
}

/// 两键中点
#[inline]
pub fn midpoint(a: OrderKey, b: OrderKey) -> OrderKey {
    (a + b) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_classification() {
        assert_eq!(
            Anchors::new(Some(1000.0), Some(2000.0)).placement().unwrap(),
            Placement::Between {
                low: 1000.0,
                high: 2000.0
            }
        );
        // 降序展示时 previous > next
        assert_eq!(
            Anchors::new(Some(3000.0), Some(2000.0)).placement().unwrap(),
            Placement::Between {
                low: 2000.0,
                high: 3000.0
            }
        );
        assert_eq!(
            Anchors::new(None, Some(5.0)).placement().unwrap(),
            Placement::NextOnly { next: 5.0 }
        );
        assert_eq!(
            Anchors::new(Some(5.0), None).placement().unwrap(),
            Placement::PreviousOnly { previous: 5.0 }
        );
    }

    #[test]
    fn test_placement_rejects_missing_or_non_finite() {
        assert!(matches!(
            Anchors::default().placement(),
            Err(OrderingError::InvalidReorderContext)
        ));
        assert!(matches!(
            Anchors::new(Some(f64::NAN), Some(1.0)).placement(),
            Err(OrderingError::InvalidReorderContext)
        ));
        assert!(matches!(
            Anchors::new(None, Some(f64::INFINITY)).placement(),
            Err(OrderingError::InvalidReorderContext)
        ));
    }

    #[test]
    fn test_renumbered_keys_start_at_window_start() {
        let policy = RenumberPolicy::default();
        assert_eq!(
            policy.renumbered_keys(1000.0, 2, Some(5000.0)),
            Some(vec![1000.0, 1100.0])
        );
        assert_eq!(
            policy.renumbered_keys(3993.0, 3, None),
            Some(vec![3993.0, 4093.0, 4193.0])
        );
        assert_eq!(policy.renumbered_keys(7.0, 0, Some(8.0)), Some(vec![]));
    }

    #[test]
    fn test_renumbered_keys_compress_below_ceiling() {
        let policy = RenumberPolicy::default();
        // 100 的间隔放不下 4 个条目
        let keys = policy.renumbered_keys(1000.0, 4, Some(1200.0)).unwrap();
        assert_eq!(keys, vec![1000.0, 1050.0, 1100.0, 1150.0]);
        assert!(keys.iter().all(|k| *k < 1200.0));
    }

    #[test]
    fn test_renumbered_keys_without_room_is_none() {
        let policy = RenumberPolicy::default();
        let start = 1000.0_f64;
        let ceiling = f64::from_bits(start.to_bits() + 1);
        assert_eq!(policy.renumbered_keys(start, 3, Some(ceiling)), None);

        let flat = RenumberPolicy {
            spacing: 0.0,
            window: 10,
        };
        assert_eq!(flat.renumbered_keys(1000.0, 2, None), None);
        // 单个条目不需要间隔
        assert_eq!(flat.renumbered_keys(1000.0, 1, None), Some(vec![1000.0]));
    }

    #[test]
    fn test_relocate_prefers_widest_gap_on_duplicates() {
        let item = |key| OrderedItem {
            id: Uuid::new_v4(),
            owner_id: "u".into(),
            order_key: key,
        };
        let window = vec![item(7.0), item(7.0), item(7.0)];
        let renumbered: Vec<_> = window
            .iter()
            .enumerate()
            .map(|(i, it)| (it.id, 1000.0 + i as f64 * 100.0))
            .collect();

        let placement = Placement::Between {
            low: 7.0,
            high: 7.0,
        };
        assert_eq!(
            placement.relocate(&window, &renumbered),
            Placement::Between {
                low: 1000.0,
                high: 1200.0
            }
        );
        assert_eq!(
            Placement::PreviousOnly { previous: 7.0 }.relocate(&window, &renumbered),
            Placement::PreviousOnly { previous: 1200.0 }
        );
        // 锚点不在窗口中时保持原值
        assert_eq!(
            Placement::NextOnly { next: 9.0 }.relocate(&window, &renumbered),
            Placement::NextOnly { next: 9.0 }
        );
    }
}
