//! 基础设施层实现。
//!
//! 提供 MongoDB 房间集合适配器与报表索引管理，实现领域层定义的 [`domain::RoomStore`]。

pub mod builder;
pub mod mongo;

pub use builder::{Infrastructure, InfrastructureError};
pub use mongo::{connect, ensure_report_indexes, report_index_keys, MongoRoomStore};
