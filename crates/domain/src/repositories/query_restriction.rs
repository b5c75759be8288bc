//! 按组织单元收窄查询范围的接口

use crate::errors::RepositoryResult;
use async_trait::async_trait;
use bson::Document;
use serde::{Deserialize, Serialize};

/// 调用方可见的单元及其下属部门
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitScope {
    pub units: Vec<String>,
    pub departments: Vec<String>,
}

impl UnitScope {
    pub fn new(units: Vec<String>, departments: Vec<String>) -> Self {
        Self { units, departments }
    }
}

/// 过滤条件变换：把任意过滤条件收窄到调用方允许访问的房间
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait QueryRestrictor: Send + Sync {
    async fn restrict(&self, filter: Document) -> RepositoryResult<Document>;
}

/// 解析当前调用方的单元范围。
///
/// 返回 `None` 表示调用方不受单元限制（例如管理员）。
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UnitScopeProvider: Send + Sync {
    async fn current_scope(&self) -> RepositoryResult<Option<UnitScope>>;
}
