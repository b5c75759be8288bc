//! 应用层实现。
//!
//! 在房间集合之上提供企业版查询扩展：计数、状态切换、SLA/优先级、
//! 访客流失、部门与单元关联以及报表聚合，并负责把写操作收窄到
//! 调用方可见的组织单元。

pub mod restriction;
pub mod services;

pub use restriction::{apply_unit_scope, NoQueryRestriction, StaticUnitScope, UnitQueryRestrictor};
pub use services::{
    default_queries_span, LivechatRoomQueries, LivechatRoomQueriesDependencies,
    AGENTS_REPORT_INDEX, DEPARTMENT_REPORT_INDEX, SOURCE_REPORT_INDEX, TAGS_REPORT_INDEX,
};
