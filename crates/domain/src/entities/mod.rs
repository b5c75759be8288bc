//! 领域实体

pub mod livechat_room;
pub mod report;

pub use livechat_room::{
    LivechatRoom, OmnichannelState, RoomMetrics, RoomSource, ServedBy, LIVECHAT_ROOM_TYPE,
};
pub use report::{ReportEntry, ReportResult};
