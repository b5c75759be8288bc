//! Repository接口定义
//!
//! 定义数据访问层的抽象接口，内层定义接口，外层实现接口。

pub mod query_restriction;
pub mod room_store;

pub use query_restriction::{QueryRestrictor, UnitScope, UnitScopeProvider};
pub use room_store::{
    AggregateOptions, FindRoomsOptions, ReadPreferenceMode, RoomStore, UpdateOutcome,
    UpdateTarget,
};

#[cfg(any(test, feature = "testing"))]
pub use query_restriction::{MockQueryRestrictor, MockUnitScopeProvider};
#[cfg(any(test, feature = "testing"))]
pub use room_store::MockRoomStore;
