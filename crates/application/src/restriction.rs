//! 按组织单元收窄房间查询
//!
//! 受单元限制的调用方只能修改满足以下任一条件的房间：
//! 祖先链包含其单元，或所属部门在其单元下。

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use domain::{QueryRestrictor, RepositoryResult, UnitScope, UnitScopeProvider};

/// 不做任何限制
#[derive(Debug, Clone, Copy, Default)]
pub struct NoQueryRestriction;

#[async_trait]
impl QueryRestrictor for NoQueryRestriction {
    async fn restrict(&self, filter: Document) -> RepositoryResult<Document> {
        Ok(filter)
    }
}

/// 固定的单元范围（运维工具、测试）
#[derive(Debug, Clone, Default)]
pub struct StaticUnitScope {
    scope: Option<UnitScope>,
}

impl StaticUnitScope {
    pub fn new(scope: Option<UnitScope>) -> Self {
        Self { scope }
    }

    pub fn unrestricted() -> Self {
        Self { scope: None }
    }
}

#[async_trait]
impl UnitScopeProvider for StaticUnitScope {
    async fn current_scope(&self) -> RepositoryResult<Option<UnitScope>> {
        Ok(self.scope.clone())
    }
}

pub struct UnitQueryRestrictor<P> {
    provider: P,
}

impl<P: UnitScopeProvider> UnitQueryRestrictor<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: UnitScopeProvider> QueryRestrictor for UnitQueryRestrictor<P> {
    async fn restrict(&self, filter: Document) -> RepositoryResult<Document> {
        match self.provider.current_scope().await? {
            Some(scope) => Ok(apply_unit_scope(filter, scope)),
            None => Ok(filter),
        }
    }
}

/// 单元条件放在 `$and` 的最前面，原有的 `$and` 表达式保留在其后
pub fn apply_unit_scope(mut filter: Document, scope: UnitScope) -> Document {
    let condition = doc! {
        "$or": [
            { "departmentAncestors": { "$in": scope.units } },
            { "departmentId": { "$in": scope.departments } },
        ]
    };

    let mut expressions = vec![Bson::Document(condition)];
    match filter.remove("$and") {
        Some(Bson::Array(existing)) => expressions.extend(existing),
        Some(other) => expressions.push(other),
        None => {}
    }
    filter.insert("$and", expressions);
    filter
}
