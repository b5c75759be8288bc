use std::sync::Arc;

use application::{
    LivechatRoomQueries, LivechatRoomQueriesDependencies, NoQueryRestriction, StaticUnitScope,
    UnitQueryRestrictor,
};
use bson::{doc, DateTime as BsonDateTime};
use chrono::{DateTime, Duration, TimeZone, Utc};
use domain::{
    FindRoomsOptions, LivechatRoom, OmnichannelState, QueryRestrictor, ReadPreferenceMode,
    RoomDefaults, RoomMetrics, RoomSource, ServedBy, SlaAssignment, UnitScope,
    DEFAULT_ESTIMATED_WAITING_TIME_QUEUE, NOT_SPECIFIED_PRIORITY_WEIGHT,
};
use infrastructure::{ensure_report_indexes, MongoRoomStore};
use mongodb::{Client, Database};
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::mongo::Mongo;
use uuid::Uuid;

struct Harness {
    _node: ContainerAsync<Mongo>,
    database: Database,
    store: Arc<MongoRoomStore>,
}

async fn start() -> Harness {
    let node = Mongo::default().start().await.expect("start mongo");
    let port = node.get_host_port_ipv4(27017u16).await.expect("port");
    let client = Client::with_uri_str(format!("mongodb://127.0.0.1:{port}"))
        .await
        .expect("client");
    let database = client.database(&format!("livechat_{}", Uuid::new_v4().simple()));

    let store = Arc::new(MongoRoomStore::from_database(&database, "rocketchat_room"));
    ensure_report_indexes(store.collection())
        .await
        .expect("report indexes");

    Harness {
        _node: node,
        database,
        store,
    }
}

fn queries_with(store: Arc<MongoRoomStore>, restrictor: Arc<dyn QueryRestrictor>) -> LivechatRoomQueries {
    LivechatRoomQueries::new(LivechatRoomQueriesDependencies {
        store,
        restrictor,
        defaults: RoomDefaults::default(),
        read_preference: ReadPreferenceMode::SecondaryPreferred,
        span: tracing::Span::none(),
    })
}

fn queries(store: Arc<MongoRoomStore>) -> LivechatRoomQueries {
    queries_with(store, Arc::new(NoQueryRestriction))
}

fn base_ts() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

fn window() -> (DateTime<Utc>, DateTime<Utc>) {
    (base_ts() - Duration::days(1), base_ts() + Duration::days(1))
}

fn agent(id: &str) -> Option<ServedBy> {
    Some(ServedBy {
        id: id.to_string(),
        username: None,
    })
}

async fn insert(harness: &Harness, rooms: Vec<LivechatRoom>) {
    harness
        .store
        .collection()
        .insert_many(rooms)
        .await
        .expect("insert rooms");
}

async fn fetch(harness: &Harness, id: &str) -> LivechatRoom {
    harness
        .store
        .collection()
        .find_one(doc! { "_id": id })
        .await
        .expect("find room")
        .expect("room exists")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires local docker daemon"]
async fn sla_lifecycle_and_bulk_removal() {
    let harness = start().await;
    let mut closed = LivechatRoom::open("closed", base_ts());
    closed.open = false;
    closed.sla_id = Some("sla1".into());
    insert(
        &harness,
        vec![
            LivechatRoom::open("r1", base_ts()),
            LivechatRoom::open("r2", base_ts()),
            LivechatRoom::open("r3", base_ts()),
            closed,
        ],
    )
    .await;
    let queries = queries(harness.store.clone());
    let sla = SlaAssignment::new("sla1", 30);

    for id in ["r1", "r2"] {
        let outcome = queries.set_sla_for_room_by_id(id, &sla).await.expect("set sla");
        assert_eq!(outcome.modified_count, 1);
    }
    let r1 = fetch(&harness, "r1").await;
    assert_eq!(r1.sla_id.as_deref(), Some("sla1"));
    assert_eq!(r1.estimated_waiting_time_queue, Some(30));

    let open_rooms = queries
        .find_open_by_sla_id("sla1", FindRoomsOptions::sorted_by(doc! { "_id": 1 }), None)
        .await
        .expect("find by sla");
    let ids: Vec<&str> = open_rooms.iter().map(|room| room.id.as_str()).collect();
    assert_eq!(ids, ["r1", "r2"]);
    assert_eq!(queries.count_rooms_with_sla().await.expect("count"), 3);

    let outcome = queries
        .bulk_remove_sla_from_rooms_by_id("sla1")
        .await
        .expect("bulk remove");
    assert_eq!(outcome.modified_count, 2);
    let r2 = fetch(&harness, "r2").await;
    assert!(r2.sla_id.is_none());
    assert_eq!(
        r2.estimated_waiting_time_queue,
        Some(DEFAULT_ESTIMATED_WAITING_TIME_QUEUE)
    );
    assert_eq!(fetch(&harness, "closed").await.sla_id.as_deref(), Some("sla1"));

    queries.set_sla_for_room_by_id("r3", &sla).await.expect("set sla");
    queries.remove_sla_from_room_by_id("r3").await.expect("remove sla");
    let r3 = fetch(&harness, "r3").await;
    assert!(r3.sla_id.is_none());
    assert_eq!(
        r3.estimated_waiting_time_queue,
        Some(DEFAULT_ESTIMATED_WAITING_TIME_QUEUE)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires local docker daemon"]
async fn priority_and_on_hold_toggles() {
    let harness = start().await;
    insert(&harness, vec![LivechatRoom::open("r1", base_ts())]).await;
    let queries = queries(harness.store.clone());

    queries
        .set_priority_by_room_id("r1", &domain::PriorityAssignment::new("urgent", 1))
        .await
        .expect("set priority");
    assert_eq!(queries.count_prioritized_rooms().await.expect("count"), 1);
    queries.unset_priority_by_room_id("r1").await.expect("unset priority");
    let room = fetch(&harness, "r1").await;
    assert!(room.priority_id.is_none());
    assert_eq!(room.priority_weight, Some(NOT_SPECIFIED_PRIORITY_WEIGHT));
    assert_eq!(queries.count_prioritized_rooms().await.expect("count"), 0);

    queries.set_on_hold_by_room_id("r1").await.expect("hold");
    queries
        .set_predicted_visitor_abandonment_by_room_id("r1", base_ts() + Duration::hours(1))
        .await
        .expect("predict");
    assert!(fetch(&harness, "r1").await.is_on_hold());

    queries
        .unset_on_hold_and_predicted_visitor_abandonment_by_room_id("r1")
        .await
        .expect("release");
    let room = fetch(&harness, "r1").await;
    assert!(room.on_hold.is_none());
    assert!(room.predicted_visitor_abandonment_at().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires local docker daemon"]
async fn abandoned_rooms_and_bulk_unset() {
    let harness = start().await;
    let due = base_ts();
    let mut abandoned = LivechatRoom::open("abandoned", base_ts());
    abandoned.omnichannel = Some(OmnichannelState {
        predicted_visitor_abandonment_at: Some(BsonDateTime::from_chrono(due - Duration::minutes(5))),
    });
    let mut answered = abandoned.clone();
    answered.id = "answered".into();
    answered.waiting_response = Some(true);
    let mut closed = abandoned.clone();
    closed.id = "closed".into();
    closed.closed_at = Some(BsonDateTime::from_chrono(due));
    let mut future = abandoned.clone();
    future.id = "future".into();
    future.omnichannel = Some(OmnichannelState {
        predicted_visitor_abandonment_at: Some(BsonDateTime::from_chrono(due + Duration::hours(2))),
    });
    insert(&harness, vec![abandoned, answered, closed, future]).await;
    let queries = queries(harness.store.clone());

    let rooms = queries
        .find_abandoned_open_rooms(due, None)
        .await
        .expect("find abandoned");
    let ids: Vec<&str> = rooms.iter().map(|room| room.id.as_str()).collect();
    assert_eq!(ids, ["abandoned"]);

    queries
        .unset_all_predicted_visitor_abandonment()
        .await
        .expect("unset all");
    for id in ["abandoned", "answered", "closed", "future"] {
        assert!(fetch(&harness, id).await.predicted_visitor_abandonment_at().is_none());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires local docker daemon"]
async fn unit_association_converges_to_department_set() {
    let harness = start().await;
    let mut d1 = LivechatRoom::open("d1-room", base_ts());
    d1.department_id = Some("D1".into());
    let mut d2 = LivechatRoom::open("d2-room", base_ts());
    d2.department_id = Some("D2".into());
    insert(&harness, vec![d1, d2]).await;
    let queries = queries(harness.store.clone());
    let ancestors = |room: LivechatRoom| room.department_ancestors.unwrap_or_default();

    queries
        .associate_rooms_with_department_to_unit(&["D1".to_string(), "D2".to_string()], "U1")
        .await
        .expect("associate");
    assert_eq!(ancestors(fetch(&harness, "d1-room").await), ["U1"]);
    assert_eq!(ancestors(fetch(&harness, "d2-room").await), ["U1"]);

    queries
        .associate_rooms_with_department_to_unit(&["D1".to_string()], "U1")
        .await
        .expect("narrow");
    assert_eq!(ancestors(fetch(&harness, "d1-room").await), ["U1"]);
    assert!(fetch(&harness, "d2-room").await.department_ancestors.is_none());

    queries
        .associate_rooms_with_department_to_unit(&[], "U1")
        .await
        .expect("clear");
    assert!(fetch(&harness, "d1-room").await.department_ancestors.is_none());

    queries
        .update_department_ancestors_by_id("d2-room", Some(vec!["U2".into()]))
        .await
        .expect("set ancestors");
    queries
        .remove_unit_association_from_rooms("U2")
        .await
        .expect("remove unit");
    assert!(fetch(&harness, "d2-room").await.department_ancestors.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires local docker daemon"]
async fn unit_scope_limits_restricted_updates_only() {
    let harness = start().await;
    let mut inside = LivechatRoom::open("inside", base_ts());
    inside.department_id = Some("D1".into());
    let mut outside = LivechatRoom::open("outside", base_ts());
    outside.department_id = Some("D9".into());
    insert(&harness, vec![inside, outside]).await;

    let scope = UnitScope::new(vec!["U1".into()], vec!["D1".into()]);
    let restrictor = UnitQueryRestrictor::new(StaticUnitScope::new(Some(scope)));
    let queries = queries_with(harness.store.clone(), Arc::new(restrictor));

    let outcome = queries.set_on_hold_by_room_id("inside").await.expect("inside");
    assert_eq!(outcome.matched_count, 1);
    let outcome = queries.set_on_hold_by_room_id("outside").await.expect("outside");
    assert_eq!(outcome.matched_count, 0);
    assert!(!fetch(&harness, "outside").await.is_on_hold());

    let outcome = queries
        .update_one_unrestricted(doc! { "_id": "outside" }, doc! { "$set": { "onHold": true } })
        .await
        .expect("unrestricted");
    assert_eq!(outcome.modified_count, 1);
    assert!(fetch(&harness, "outside").await.is_on_hold());
}

fn status_fixtures() -> Vec<LivechatRoom> {
    let mut open_a = LivechatRoom::open("open-a", base_ts());
    open_a.served_by = agent("agent-1");
    let mut open_b = LivechatRoom::open("open-b", base_ts());
    open_b.served_by = agent("agent-2");
    open_b.on_hold = Some(false);
    let mut closed = LivechatRoom::open("closed", base_ts());
    closed.open = false;
    closed.served_by = agent("agent-1");
    closed.metrics = Some(RoomMetrics {
        chat_duration: Some(120.0),
    });
    let queued = LivechatRoom::open("queued", base_ts());
    let mut held = LivechatRoom::open("held", base_ts());
    held.served_by = agent("agent-2");
    held.on_hold = Some(true);
    vec![open_a, open_b, closed, queued, held]
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires local docker daemon"]
async fn status_report_buckets_are_stable() {
    let harness = start().await;
    let mut outside_window = LivechatRoom::open("old", base_ts() - Duration::days(30));
    outside_window.served_by = agent("agent-1");
    let mut rooms = status_fixtures();
    rooms.push(outside_window);
    insert(&harness, rooms).await;
    let queries = queries(harness.store.clone());
    let (start, end) = window();

    let first = queries
        .get_conversations_by_status(start, end, None)
        .await
        .expect("status report");
    assert_eq!(first.total, 5);
    assert_eq!(first.value_of("Open"), Some(2));
    assert_eq!(first.value_of("Closed"), Some(1));
    assert_eq!(first.value_of("Queued"), Some(1));
    assert_eq!(first.value_of("On_Hold"), Some(1));
    assert_eq!(first.data[0].label.as_deref(), Some("Open"));

    let second = queries
        .get_conversations_by_status(start, end, None)
        .await
        .expect("status report");
    assert_eq!(first.total, second.total);
    for entry in &first.data {
        let label = entry.label.as_deref().expect("status label");
        assert_eq!(second.value_of(label), Some(entry.value));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires local docker daemon"]
async fn dimension_reports_and_missing_counters() {
    let harness = start().await;
    let mut rooms = status_fixtures();
    rooms[0].source = Some(RoomSource {
        source_type: "widget".into(),
        alias: None,
    });
    rooms[1].source = Some(RoomSource {
        source_type: "app".into(),
        alias: Some("whatsapp".into()),
    });
    rooms[2].source = Some(RoomSource {
        source_type: "widget".into(),
        alias: None,
    });
    rooms[0].department_id = Some("D1".into());
    rooms[1].department_id = Some("D1".into());
    rooms[2].department_id = Some("D-deleted".into());
    rooms[0].tags = Some(vec!["billing".into(), "vip".into()]);
    rooms[1].tags = Some(vec!["billing".into()]);
    rooms[2].tags = Some(Vec::new());
    insert(&harness, rooms).await;
    harness
        .database
        .collection::<bson::Document>("rocketchat_livechat_department")
        .insert_one(doc! { "_id": "D1", "name": "Sales" })
        .await
        .expect("insert department");
    harness
        .database
        .collection::<bson::Document>("users")
        .insert_one(doc! { "_id": "agent-1", "name": "Alice" })
        .await
        .expect("insert agent");

    let queries = queries(harness.store.clone());
    let (start, end) = window();

    let by_source = queries
        .get_conversations_by_source(start, end, None)
        .await
        .expect("source report");
    assert_eq!(by_source.total, 3);
    assert_eq!(by_source.value_of("widget"), Some(2));
    assert_eq!(by_source.value_of("whatsapp"), Some(1));

    let by_department = queries
        .get_conversations_by_department(start, end, None, None)
        .await
        .expect("department report");
    assert_eq!(by_department.total, 2);
    assert_eq!(by_department.value_of("Sales"), Some(2));
    assert_eq!(
        queries
            .get_total_conversations_without_department_between_dates(start, end, None)
            .await
            .expect("without department"),
        2
    );

    let by_tags = queries
        .get_conversations_by_tags(start, end, Some(doc! { "total": -1 }), None)
        .await
        .expect("tags report");
    assert_eq!(by_tags.data[0].label.as_deref(), Some("billing"));
    assert_eq!(by_tags.value_of("billing"), Some(2));
    assert_eq!(by_tags.value_of("vip"), Some(1));
    assert_eq!(
        queries
            .get_conversations_without_tags_between_date(start, end, None)
            .await
            .expect("without tags"),
        3
    );

    let by_agents = queries
        .get_conversations_by_agents(start, end, None, None)
        .await
        .expect("agents report");
    assert_eq!(by_agents.total, 4);
    assert_eq!(by_agents.value_of("Alice"), Some(2));
    assert_eq!(by_agents.value_of("agent-2"), Some(2));
    assert_eq!(
        queries
            .get_total_conversations_without_agents_between_date(start, end, None)
            .await
            .expect("without agents"),
        1
    );

    let empty = queries
        .get_conversations_by_source(end, end + Duration::days(1), None)
        .await
        .expect("empty window");
    assert!(empty.is_empty());
}
