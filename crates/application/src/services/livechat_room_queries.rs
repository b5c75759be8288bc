//! 全渠道房间查询扩展（企业版）
//!
//! 把领域操作（设置 SLA、标记访客流失、按部门聚合会话……）翻译成
//! MongoDB 的过滤、更新与聚合文档，再交给通用的 [`RoomStore`] 执行。
//! 所有写操作在执行前都会经过 [`QueryRestrictor`]，把过滤条件收窄到
//! 调用方所属组织单元可见的房间。
//!
//! 这里不做重试、超时或局部恢复，存储层的错误原样返回给调用方。

use std::sync::Arc;

use bson::{doc, DateTime as BsonDateTime, Document};
use chrono::{DateTime, Utc};
use domain::{
    AggregateOptions, FindRoomsOptions, LivechatRoom, PriorityAssignment, QueryRestrictor,
    ReadPreferenceMode, ReportResult, RepositoryResult, RoomDefaults, RoomStore, SlaAssignment,
    UpdateOutcome, UpdateTarget, LIVECHAT_ROOM_TYPE,
};
use tracing::{debug, Span};

/// 报表聚合使用的索引名称
pub const SOURCE_REPORT_INDEX: &str = "source_1_ts_1";
pub const DEPARTMENT_REPORT_INDEX: &str = "departmentId_1_ts_1";
pub const TAGS_REPORT_INDEX: &str = "tags.0_1_ts_1";
pub const AGENTS_REPORT_INDEX: &str = "servedBy_1_ts_1";

const DEPARTMENT_COLLECTION: &str = "rocketchat_livechat_department";
const USERS_COLLECTION: &str = "users";

pub struct LivechatRoomQueriesDependencies {
    pub store: Arc<dyn RoomStore>,
    pub restrictor: Arc<dyn QueryRestrictor>,
    pub defaults: RoomDefaults,
    pub read_preference: ReadPreferenceMode,
    /// 查询日志挂在这个 span 下
    pub span: Span,
}

/// 默认的查询日志 span
pub fn default_queries_span() -> Span {
    tracing::debug_span!("livechat_queries")
}

pub struct LivechatRoomQueries {
    deps: LivechatRoomQueriesDependencies,
}

impl LivechatRoomQueries {
    pub fn new(deps: LivechatRoomQueriesDependencies) -> Self {
        Self { deps }
    }

    pub async fn count_prioritized_rooms(&self) -> RepositoryResult<u64> {
        self.deps
            .store
            .count_documents(doc! { "priorityId": { "$exists": true } })
            .await
    }

    pub async fn count_rooms_with_sla(&self) -> RepositoryResult<u64> {
        self.deps
            .store
            .count_documents(doc! { "slaId": { "$exists": true } })
            .await
    }

    pub async fn count_rooms_with_pdf_transcript_requested(&self) -> RepositoryResult<u64> {
        self.deps
            .store
            .count_documents(doc! { "pdfTranscriptRequested": true })
            .await
    }

    pub async fn count_rooms_with_transcript_sent(&self) -> RepositoryResult<u64> {
        self.deps
            .store
            .count_documents(doc! { "pdfTranscriptFileId": { "$exists": true } })
            .await
    }

    pub async fn set_on_hold_by_room_id(&self, room_id: &str) -> RepositoryResult<UpdateOutcome> {
        self.update_one(by_id(room_id), doc! { "$set": { "onHold": true } })
            .await
    }

    pub async fn unset_on_hold_by_room_id(&self, room_id: &str) -> RepositoryResult<UpdateOutcome> {
        self.update_one(by_id(room_id), doc! { "$unset": { "onHold": 1 } })
            .await
    }

    pub async fn unset_on_hold_and_predicted_visitor_abandonment_by_room_id(
        &self,
        room_id: &str,
    ) -> RepositoryResult<UpdateOutcome> {
        self.update_one(
            by_id(room_id),
            doc! {
                "$unset": {
                    "omnichannel.predictedVisitorAbandonmentAt": 1,
                    "onHold": 1,
                }
            },
        )
        .await
    }

    /// 设置 SLA，同时把截止分钟数拷贝到 `estimatedWaitingTimeQueue`
    pub async fn set_sla_for_room_by_id(
        &self,
        room_id: &str,
        sla: &SlaAssignment,
    ) -> RepositoryResult<UpdateOutcome> {
        self.update_one(
            by_id(room_id),
            doc! {
                "$set": {
                    "slaId": sla.id.as_str(),
                    "estimatedWaitingTimeQueue": sla.due_time_in_minutes,
                }
            },
        )
        .await
    }

    /// 移除 SLA，等待时间恢复为系统默认值
    pub async fn remove_sla_from_room_by_id(
        &self,
        room_id: &str,
    ) -> RepositoryResult<UpdateOutcome> {
        self.update_one(by_id(room_id), self.remove_sla_update())
            .await
    }

    /// 所有引用该 SLA 的打开房间都恢复默认等待时间
    pub async fn bulk_remove_sla_from_rooms_by_id(
        &self,
        sla_id: &str,
    ) -> RepositoryResult<UpdateOutcome> {
        self.update_many(
            doc! {
                "open": true,
                "t": LIVECHAT_ROOM_TYPE,
                "slaId": sla_id,
            },
            self.remove_sla_update(),
        )
        .await
    }

    pub async fn find_open_by_sla_id(
        &self,
        sla_id: &str,
        options: FindRoomsOptions,
        extra_query: Option<Document>,
    ) -> RepositoryResult<Vec<LivechatRoom>> {
        let query = merge_extra(
            doc! {
                "t": LIVECHAT_ROOM_TYPE,
                "open": true,
                "slaId": sla_id,
            },
            extra_query,
        );

        self.deps.store.find(query, options).await
    }

    pub async fn set_priority_by_room_id(
        &self,
        room_id: &str,
        priority: &PriorityAssignment,
    ) -> RepositoryResult<UpdateOutcome> {
        self.update_one(
            by_id(room_id),
            doc! {
                "$set": {
                    "priorityId": priority.id.as_str(),
                    "priorityWeight": priority.sort_item,
                }
            },
        )
        .await
    }

    /// 移除优先级，权重恢复为“未指定”
    pub async fn unset_priority_by_room_id(
        &self,
        room_id: &str,
    ) -> RepositoryResult<UpdateOutcome> {
        self.update_one(
            by_id(room_id),
            doc! {
                "$unset": { "priorityId": 1 },
                "$set": { "priorityWeight": self.deps.defaults.not_specified_priority_weight },
            },
        )
        .await
    }

    pub async fn set_predicted_visitor_abandonment_by_room_id(
        &self,
        room_id: &str,
        will_be_abandoned_at: DateTime<Utc>,
    ) -> RepositoryResult<UpdateOutcome> {
        self.update_one(
            by_id(room_id),
            doc! {
                "$set": {
                    "omnichannel.predictedVisitorAbandonmentAt": BsonDateTime::from_chrono(will_be_abandoned_at),
                }
            },
        )
        .await
    }

    pub async fn unset_predicted_visitor_abandonment_by_room_id(
        &self,
        room_id: &str,
    ) -> RepositoryResult<UpdateOutcome> {
        self.update_one(
            by_id(room_id),
            doc! { "$unset": { "omnichannel.predictedVisitorAbandonmentAt": 1 } },
        )
        .await
    }

    /// 预测流失时间已过、仍然打开、未关闭且访客尚未得到回复的房间
    pub async fn find_abandoned_open_rooms(
        &self,
        at: DateTime<Utc>,
        extra_query: Option<Document>,
    ) -> RepositoryResult<Vec<LivechatRoom>> {
        let query = merge_extra(
            doc! {
                "omnichannel.predictedVisitorAbandonmentAt": { "$lte": BsonDateTime::from_chrono(at) },
                "waitingResponse": { "$exists": false },
                "closedAt": { "$exists": false },
                "open": true,
            },
            extra_query,
        );

        self.deps
            .store
            .find(query, FindRoomsOptions::default())
            .await
    }

    pub async fn unset_all_predicted_visitor_abandonment(&self) -> RepositoryResult<()> {
        self.update_many(
            doc! {
                "open": true,
                "t": LIVECHAT_ROOM_TYPE,
                "omnichannel.predictedVisitorAbandonmentAt": { "$exists": true },
            },
            doc! { "$unset": { "omnichannel.predictedVisitorAbandonmentAt": 1 } },
        )
        .await
        .map(|_| ())
    }

    /// 让恰好属于 `departments` 的房间在祖先链中带上 `unit_id`。
    ///
    /// 分两步执行且不在同一事务内：先关联，再解除不在部门集合里的旧房间。
    /// 两步之间中断时重新执行同一调用即可收敛。
    pub async fn associate_rooms_with_department_to_unit(
        &self,
        departments: &[String],
        unit_id: &str,
    ) -> RepositoryResult<()> {
        let query = doc! {
            "$and": [
                { "departmentId": { "$in": departments.to_vec() } },
                {
                    "$or": [
                        { "departmentAncestors": { "$exists": false } },
                        {
                            "$and": [
                                { "departmentAncestors": { "$exists": true } },
                                { "departmentAncestors": { "$ne": unit_id } },
                            ]
                        },
                    ]
                },
            ]
        };
        let update = doc! { "$set": { "departmentAncestors": [unit_id] } };
        debug!(
            parent: &self.deps.span,
            query = %query,
            update = %update,
            "LivechatRoomQueries.associate_rooms_with_department_to_unit - association step"
        );
        let association = self.update_many(query, update).await?;
        debug!(
            parent: &self.deps.span,
            matched = association.matched_count,
            modified = association.modified_count,
            "LivechatRoomQueries.associate_rooms_with_department_to_unit - association step"
        );

        let query = doc! {
            "departmentAncestors": unit_id,
            "departmentId": { "$nin": departments.to_vec() },
        };
        let update = doc! { "$unset": { "departmentAncestors": 1 } };
        debug!(
            parent: &self.deps.span,
            query = %query,
            update = %update,
            "LivechatRoomQueries.associate_rooms_with_department_to_unit - disassociation step"
        );
        let disassociation = self.update_many(query, update).await?;
        debug!(
            parent: &self.deps.span,
            matched = disassociation.matched_count,
            modified = disassociation.modified_count,
            "LivechatRoomQueries.associate_rooms_with_department_to_unit - disassociation step"
        );

        Ok(())
    }

    pub async fn remove_unit_association_from_rooms(&self, unit_id: &str) -> RepositoryResult<()> {
        let query = doc! { "departmentAncestors": unit_id };
        let update = doc! { "$unset": { "departmentAncestors": 1 } };
        debug!(
            parent: &self.deps.span,
            query = %query,
            update = %update,
            "LivechatRoomQueries.remove_unit_association_from_rooms"
        );
        let result = self.update_many(query, update).await?;
        debug!(
            parent: &self.deps.span,
            matched = result.matched_count,
            modified = result.modified_count,
            "LivechatRoomQueries.remove_unit_association_from_rooms"
        );

        Ok(())
    }

    /// `None` 会移除整个祖先链
    pub async fn update_department_ancestors_by_id(
        &self,
        room_id: &str,
        department_ancestors: Option<Vec<String>>,
    ) -> RepositoryResult<UpdateOutcome> {
        let update = match department_ancestors {
            Some(ancestors) => doc! { "$set": { "departmentAncestors": ancestors } },
            None => doc! { "$unset": { "departmentAncestors": 1 } },
        };

        self.update_one(by_id(room_id), update).await
    }

    #[deprecated(note = "use update_one or update_many instead")]
    pub async fn update(
        &self,
        filter: Document,
        update: Document,
        target: UpdateTarget,
    ) -> RepositoryResult<UpdateOutcome> {
        let restricted = self.deps.restrictor.restrict(filter).await?;
        debug!(parent: &self.deps.span, query = %restricted, "LivechatRoomQueries.update");

        match target {
            UpdateTarget::One => self.deps.store.update_one(restricted, update).await,
            UpdateTarget::Many => self.deps.store.update_many(restricted, update).await,
        }
    }

    pub async fn update_one(
        &self,
        filter: Document,
        update: Document,
    ) -> RepositoryResult<UpdateOutcome> {
        let restricted = self.deps.restrictor.restrict(filter).await?;
        debug!(parent: &self.deps.span, query = %restricted, "LivechatRoomQueries.update_one");

        self.deps.store.update_one(restricted, update).await
    }

    /// 跳过单元限制，仅供可信的内部服务使用。
    ///
    /// 单元限制需要完整的调用方上下文，并非所有服务都能提供。
    pub async fn update_one_unrestricted(
        &self,
        filter: Document,
        update: Document,
    ) -> RepositoryResult<UpdateOutcome> {
        self.deps.store.update_one(filter, update).await
    }

    pub async fn update_many(
        &self,
        filter: Document,
        update: Document,
    ) -> RepositoryResult<UpdateOutcome> {
        let restricted = self.deps.restrictor.restrict(filter).await?;
        debug!(parent: &self.deps.span, query = %restricted, "LivechatRoomQueries.update_many");

        self.deps.store.update_many(restricted, update).await
    }

    pub async fn get_conversations_by_source(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        extra_query: Option<Document>,
    ) -> RepositoryResult<ReportResult> {
        let matcher = merge_extra(
            doc! {
                "source": { "$exists": true },
                "t": LIVECHAT_ROOM_TYPE,
                "ts": time_window(start, end),
            },
            extra_query,
        );
        let pipeline = vec![
            doc! { "$match": matcher },
            doc! { "$group": { "_id": "$source", "value": { "$sum": 1 } } },
            doc! { "$sort": { "value": -1 } },
            doc! {
                "$group": {
                    "_id": null,
                    "total": { "$sum": "$value" },
                    "data": {
                        "$push": {
                            "label": { "$ifNull": ["$_id.alias", "$_id.type"] },
                            "value": "$value",
                        }
                    },
                }
            },
            doc! { "$project": { "_id": 0 } },
        ];

        self.run_report(pipeline, Some(SOURCE_REPORT_INDEX)).await
    }

    /// 按状态分桶：Open（已接待且未挂起）、Closed、Queued（未接待）、On_Hold
    pub async fn get_conversations_by_status(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        extra_query: Option<Document>,
    ) -> RepositoryResult<ReportResult> {
        let matcher = merge_extra(
            doc! {
                "t": LIVECHAT_ROOM_TYPE,
                "ts": time_window(start, end),
            },
            extra_query,
        );
        let pipeline = vec![
            doc! { "$match": matcher },
            doc! {
                "$group": {
                    "_id": null,
                    "total": { "$sum": 1 },
                    "open": {
                        "$sum": {
                            "$cond": [
                                {
                                    "$and": [
                                        { "$eq": ["$open", true] },
                                        { "$or": [{ "$not": ["$onHold"] }, { "$eq": ["$onHold", false] }] },
                                        { "$ifNull": ["$servedBy", false] },
                                    ]
                                },
                                1,
                                0,
                            ]
                        }
                    },
                    "closed": {
                        "$sum": {
                            "$cond": [{ "$ifNull": ["$metrics.chatDuration", false] }, 1, 0]
                        }
                    },
                    "queued": {
                        "$sum": {
                            "$cond": [
                                {
                                    "$and": [
                                        { "$eq": ["$open", true] },
                                        { "$eq": [{ "$ifNull": ["$servedBy", null] }, null] },
                                    ]
                                },
                                1,
                                0,
                            ]
                        }
                    },
                    "onhold": {
                        "$sum": { "$cond": [{ "$eq": ["$onHold", true] }, 1, 0] }
                    },
                }
            },
            doc! {
                "$project": {
                    "total": 1,
                    "data": [
                        { "label": "Open", "value": "$open" },
                        { "label": "Closed", "value": "$closed" },
                        { "label": "Queued", "value": "$queued" },
                        { "label": "On_Hold", "value": "$onhold" },
                    ],
                }
            },
            doc! { "$unwind": "$data" },
            doc! { "$sort": { "data.value": -1 } },
            doc! {
                "$group": {
                    "_id": "$_id",
                    "total": { "$first": "$total" },
                    "data": { "$push": "$data" },
                }
            },
            doc! { "$project": { "_id": 0 } },
        ];

        self.run_report(pipeline, None).await
    }

    /// 按部门名称分组，部门已删除（查不到名称）的房间不计入
    pub async fn get_conversations_by_department(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        sort: Option<Document>,
        extra_query: Option<Document>,
    ) -> RepositoryResult<ReportResult> {
        let matcher = merge_extra(
            doc! {
                "t": LIVECHAT_ROOM_TYPE,
                "departmentId": { "$exists": true },
                "ts": time_window(start, end),
            },
            extra_query,
        );
        let pipeline = vec![
            doc! { "$match": matcher },
            doc! { "$group": { "_id": "$departmentId", "total": { "$sum": 1 } } },
            doc! {
                "$lookup": {
                    "from": DEPARTMENT_COLLECTION,
                    "localField": "_id",
                    "foreignField": "_id",
                    "as": "department",
                }
            },
            doc! {
                "$group": {
                    "_id": { "$arrayElemAt": ["$department.name", 0] },
                    "total": { "$sum": "$total" },
                }
            },
            doc! { "$match": { "_id": { "$ne": null } } },
            doc! { "$sort": report_sort(sort, doc! { "total": 1 }) },
            doc! {
                "$group": {
                    "_id": null,
                    "total": { "$sum": "$total" },
                    "data": { "$push": { "label": "$_id", "value": "$total" } },
                }
            },
            doc! { "$project": { "_id": 0 } },
        ];

        self.run_report(pipeline, Some(DEPARTMENT_REPORT_INDEX)).await
    }

    pub async fn get_total_conversations_without_department_between_dates(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        extra_query: Option<Document>,
    ) -> RepositoryResult<u64> {
        let query = merge_extra(
            doc! {
                "t": LIVECHAT_ROOM_TYPE,
                "departmentId": { "$exists": false },
                "ts": time_window(start, end),
            },
            extra_query,
        );

        self.deps.store.count_documents(query).await
    }

    pub async fn get_conversations_by_tags(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        sort: Option<Document>,
        extra_query: Option<Document>,
    ) -> RepositoryResult<ReportResult> {
        let matcher = merge_extra(
            doc! {
                "t": LIVECHAT_ROOM_TYPE,
                "ts": time_window(start, end),
                "tags": { "$exists": true, "$ne": [] },
            },
            extra_query,
        );
        let pipeline = vec![
            doc! { "$match": matcher },
            doc! { "$group": { "_id": "$tags", "total": { "$sum": 1 } } },
            doc! { "$unwind": "$_id" },
            doc! { "$group": { "_id": "$_id", "total": { "$sum": "$total" } } },
            doc! { "$sort": report_sort(sort, doc! { "total": 1 }) },
            doc! {
                "$group": {
                    "_id": null,
                    "total": { "$sum": "$total" },
                    "data": { "$push": { "label": "$_id", "value": "$total" } },
                }
            },
            doc! { "$project": { "_id": 0 } },
        ];

        self.run_report(pipeline, Some(TAGS_REPORT_INDEX)).await
    }

    pub async fn get_conversations_without_tags_between_date(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        extra_query: Option<Document>,
    ) -> RepositoryResult<u64> {
        let query = merge_extra(
            doc! {
                "t": LIVECHAT_ROOM_TYPE,
                "ts": time_window(start, end),
                "$or": [
                    { "tags": { "$exists": false } },
                    { "tags": { "$eq": [] } },
                ],
            },
            extra_query,
        );

        self.deps.store.count_documents(query).await
    }

    /// 按接待客服分组，标签优先使用客服姓名，查不到时退回客服 ID
    pub async fn get_conversations_by_agents(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        sort: Option<Document>,
        extra_query: Option<Document>,
    ) -> RepositoryResult<ReportResult> {
        let matcher = merge_extra(
            doc! {
                "t": LIVECHAT_ROOM_TYPE,
                "ts": time_window(start, end),
                "servedBy": { "$exists": true },
            },
            extra_query,
        );
        let pipeline = vec![
            doc! { "$match": matcher },
            doc! { "$group": { "_id": "$servedBy._id", "total": { "$sum": 1 } } },
            doc! {
                "$lookup": {
                    "from": USERS_COLLECTION,
                    "localField": "_id",
                    "foreignField": "_id",
                    "as": "agent",
                }
            },
            doc! { "$set": { "agent": { "$first": "$agent" } } },
            doc! { "$addFields": { "name": { "$ifNull": ["$agent.name", "$_id"] } } },
            doc! { "$sort": report_sort(sort, doc! { "name": 1 }) },
            doc! {
                "$group": {
                    "_id": null,
                    "total": { "$sum": "$total" },
                    "data": { "$push": { "label": "$name", "value": "$total" } },
                }
            },
            doc! { "$project": { "_id": 0 } },
        ];

        self.run_report(pipeline, Some(AGENTS_REPORT_INDEX)).await
    }

    pub async fn get_total_conversations_without_agents_between_date(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        extra_query: Option<Document>,
    ) -> RepositoryResult<u64> {
        let query = merge_extra(
            doc! {
                "t": LIVECHAT_ROOM_TYPE,
                "ts": time_window(start, end),
                "servedBy": { "$exists": false },
            },
            extra_query,
        );

        self.deps.store.count_documents(query).await
    }

    async fn run_report(
        &self,
        pipeline: Vec<Document>,
        hint: Option<&str>,
    ) -> RepositoryResult<ReportResult> {
        let mut options = AggregateOptions::new(self.deps.read_preference);
        if let Some(index_name) = hint {
            options = options.with_hint(index_name);
        }

        let documents = self.deps.store.aggregate(pipeline, options).await?;
        match documents.into_iter().next() {
            Some(document) => Ok(bson::from_document(document)?),
            None => Ok(ReportResult::default()),
        }
    }

    fn remove_sla_update(&self) -> Document {
        doc! {
            "$unset": { "slaId": 1 },
            "$set": { "estimatedWaitingTimeQueue": self.deps.defaults.estimated_waiting_time_queue },
        }
    }
}

fn by_id(room_id: &str) -> Document {
    doc! { "_id": room_id }
}

/// `[start, end)`
fn time_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Document {
    doc! {
        "$gte": BsonDateTime::from_chrono(start),
        "$lt": BsonDateTime::from_chrono(end),
    }
}

/// 调用方的附加条件最后合并，同名键以调用方为准
fn merge_extra(mut base: Document, extra_query: Option<Document>) -> Document {
    if let Some(extra) = extra_query {
        for (key, value) in extra {
            base.insert(key, value);
        }
    }
    base
}

/// 空排序文档在聚合里非法，按未指定处理
fn report_sort(sort: Option<Document>, fallback: Document) -> Document {
    sort.filter(|sort| !sort.is_empty()).unwrap_or(fallback)
}
