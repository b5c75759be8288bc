//! 全渠道客服房间领域模型
//!
//! 包含 livechat 房间文档、报表结果、SLA/优先级值对象，
//! 以及房间集合访问与查询收窄的抽象接口。

pub mod entities;
pub mod errors;
pub mod repositories;
pub mod value_objects;

// 重新导出常用类型
pub use entities::*;
pub use errors::*;
pub use repositories::*;
pub use value_objects::*;
