//! 报表聚合结果

use serde::{Deserialize, Serialize};

/// 单个分组的统计值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// 分组键缺失时为空（例如来源既无 alias 也无 type）
    #[serde(default)]
    pub label: Option<String>,
    pub value: i64,
}

/// `{ total, data: [{ label, value }] }`
///
/// 聚合没有匹配到任何房间时返回默认值（total 为 0，data 为空）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportResult {
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub data: Vec<ReportEntry>,
}

impl ReportResult {
    /// 按标签取值
    pub fn value_of(&self, label: &str) -> Option<i64> {
        self.data
            .iter()
            .find(|entry| entry.label.as_deref() == Some(label))
            .map(|entry| entry.value)
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0 && self.data.is_empty()
    }
}
