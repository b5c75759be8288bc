//! 全渠道（livechat）房间文档定义
//!
//! 只声明查询扩展关心的字段，其余字段在读取时忽略。
//! 所有可选字段在序列化时省略，而不是写成 null，
//! 因为查询条件依赖 `$exists` 判断字段是否存在。

use bson::DateTime as BsonDateTime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// livechat 房间在 `t` 字段上的类型标记
pub const LIVECHAT_ROOM_TYPE: &str = "l";

/// 接待该会话的客服
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServedBy {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// 会话来源（widget、app、api ...）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSource {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OmnichannelState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_visitor_abandonment_at: Option<BsonDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMetrics {
    /// 会话时长（秒），只有关闭后才会写入
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_duration: Option<f64>,
}

/// livechat 房间实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivechatRoom {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "t")]
    pub room_type: String,
    pub ts: BsonDateTime,
    #[serde(default)]
    pub open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_hold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sla_id: Option<String>,
    /// SLA 截止时间（分钟）的冗余拷贝，便于排序过滤
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_waiting_time_queue: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_weight: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
    /// 与房间部门关联过的单元链
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_ancestors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub omnichannel: Option<OmnichannelState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_transcript_requested: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_transcript_file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub served_by: Option<ServedBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<RoomSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<RoomMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiting_response: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<BsonDateTime>,
}

impl LivechatRoom {
    /// 新建一个打开状态的 livechat 房间（用于测试数据和运维工具）
    pub fn open(id: impl Into<String>, ts: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            room_type: LIVECHAT_ROOM_TYPE.to_string(),
            ts: BsonDateTime::from_chrono(ts),
            open: true,
            on_hold: None,
            sla_id: None,
            estimated_waiting_time_queue: None,
            priority_id: None,
            priority_weight: None,
            department_id: None,
            department_ancestors: None,
            omnichannel: None,
            pdf_transcript_requested: None,
            pdf_transcript_file_id: None,
            tags: None,
            served_by: None,
            source: None,
            metrics: None,
            waiting_response: None,
            closed_at: None,
        }
    }

    pub fn is_on_hold(&self) -> bool {
        self.on_hold.unwrap_or(false)
    }

    pub fn predicted_visitor_abandonment_at(&self) -> Option<DateTime<Utc>> {
        self.omnichannel
            .as_ref()
            .and_then(|state| state.predicted_visitor_abandonment_at)
            .map(|at| at.to_chrono())
    }
}
