//! 值对象：SLA / 优先级分配，以及写回房间的默认常量

use serde::{Deserialize, Serialize};

/// 系统默认的 SLA 等待时间（分钟），移除 SLA 后写回房间
pub const DEFAULT_ESTIMATED_WAITING_TIME_QUEUE: i64 = 9_999_999;

/// "未指定" 优先级的权重，移除优先级后写回房间
pub const NOT_SPECIFIED_PRIORITY_WEIGHT: i64 = 99;

/// 分配给房间的 SLA（只需要 ID 与截止分钟数）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaAssignment {
    pub id: String,
    pub due_time_in_minutes: i64,
}

impl SlaAssignment {
    pub fn new(id: impl Into<String>, due_time_in_minutes: i64) -> Self {
        Self {
            id: id.into(),
            due_time_in_minutes,
        }
    }
}

/// 分配给房间的优先级
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityAssignment {
    pub id: String,
    /// 排序权重，值越小越靠前
    pub sort_item: i64,
}

impl PriorityAssignment {
    pub fn new(id: impl Into<String>, sort_item: i64) -> Self {
        Self {
            id: id.into(),
            sort_item,
        }
    }
}

/// 排序/过滤字段的默认值。
///
/// 移除 SLA 或优先级时写回这些值，下游永远不会在比较字段上看到空值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDefaults {
    pub estimated_waiting_time_queue: i64,
    pub not_specified_priority_weight: i64,
}

impl Default for RoomDefaults {
    fn default() -> Self {
        Self {
            estimated_waiting_time_queue: DEFAULT_ESTIMATED_WAITING_TIME_QUEUE,
            not_specified_priority_weight: NOT_SPECIFIED_PRIORITY_WEIGHT,
        }
    }
}
