//! 房间集合的通用访问接口
//!
//! 查询扩展只依赖这组原语：查找、更新、计数、聚合。
//! 具体实现（MongoDB）放在 infrastructure 层。

use crate::entities::LivechatRoom;
use crate::errors::RepositoryResult;
use async_trait::async_trait;
use bson::Document;

/// 更新结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
}

impl UpdateOutcome {
    pub fn new(matched_count: u64, modified_count: u64) -> Self {
        Self {
            matched_count,
            modified_count,
        }
    }
}

/// 旧版 `update` 入口的目标范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateTarget {
    One,
    Many,
}

/// 查找参数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindRoomsOptions {
    pub sort: Option<Document>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
    pub projection: Option<Document>,
}

impl FindRoomsOptions {
    pub fn sorted_by(sort: Document) -> Self {
        Self {
            sort: Some(sort),
            ..Self::default()
        }
    }
}

/// 聚合读取偏好
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadPreferenceMode {
    Primary,
    /// 报表默认从从节点读取，减轻主节点压力
    #[default]
    SecondaryPreferred,
}

/// 聚合参数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateOptions {
    /// 索引名称提示，例如 `source_1_ts_1`
    pub hint: Option<String>,
    pub read_preference: ReadPreferenceMode,
}

impl AggregateOptions {
    pub fn new(read_preference: ReadPreferenceMode) -> Self {
        Self {
            hint: None,
            read_preference,
        }
    }

    pub fn with_hint(mut self, index_name: impl Into<String>) -> Self {
        self.hint = Some(index_name.into());
        self
    }
}

/// 房间集合访问接口
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// 按过滤条件查找房间
    async fn find(
        &self,
        filter: Document,
        options: FindRoomsOptions,
    ) -> RepositoryResult<Vec<LivechatRoom>>;

    /// 更新第一个匹配的房间
    async fn update_one(&self, filter: Document, update: Document)
        -> RepositoryResult<UpdateOutcome>;

    /// 更新所有匹配的房间
    async fn update_many(
        &self,
        filter: Document,
        update: Document,
    ) -> RepositoryResult<UpdateOutcome>;

    /// 统计匹配的房间数量
    async fn count_documents(&self, filter: Document) -> RepositoryResult<u64>;

    /// 执行聚合管道，返回全部结果文档
    async fn aggregate(
        &self,
        pipeline: Vec<Document>,
        options: AggregateOptions,
    ) -> RepositoryResult<Vec<Document>>;
}
