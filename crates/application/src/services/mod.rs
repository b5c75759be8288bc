mod livechat_room_queries;

pub use livechat_room_queries::{
    default_queries_span, LivechatRoomQueries, LivechatRoomQueriesDependencies,
    AGENTS_REPORT_INDEX, DEPARTMENT_REPORT_INDEX, SOURCE_REPORT_INDEX, TAGS_REPORT_INDEX,
};
