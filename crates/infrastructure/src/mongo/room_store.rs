//! 基于 MongoDB 集合的 [`RoomStore`] 实现

use async_trait::async_trait;
use bson::Document;
use domain::{
    AggregateOptions, FindRoomsOptions, LivechatRoom, ReadPreferenceMode, RepositoryResult,
    RoomStore, UpdateOutcome,
};
use futures::TryStreamExt;
use mongodb::{
    options::{
        AggregateOptions as DriverAggregateOptions, FindOptions, Hint, ReadPreference,
        SelectionCriteria,
    },
    results::UpdateResult,
    Collection, Database,
};

use super::map_mongo_err;

#[derive(Clone)]
pub struct MongoRoomStore {
    collection: Collection<LivechatRoom>,
}

impl MongoRoomStore {
    pub fn new(collection: Collection<LivechatRoom>) -> Self {
        Self { collection }
    }

    pub fn from_database(database: &Database, collection_name: &str) -> Self {
        Self::new(database.collection(collection_name))
    }

    pub fn collection(&self) -> &Collection<LivechatRoom> {
        &self.collection
    }
}

fn find_options(options: FindRoomsOptions) -> FindOptions {
    let mut driver = FindOptions::default();
    driver.sort = options.sort.filter(|sort| !sort.is_empty());
    driver.limit = options.limit;
    driver.skip = options.skip;
    driver.projection = options.projection;
    driver
}

fn aggregate_options(options: AggregateOptions) -> DriverAggregateOptions {
    let read_preference = match options.read_preference {
        ReadPreferenceMode::Primary => ReadPreference::Primary,
        ReadPreferenceMode::SecondaryPreferred => ReadPreference::SecondaryPreferred {
            options: Default::default(),
        },
    };

    let mut driver = DriverAggregateOptions::default();
    driver.hint = options.hint.map(Hint::Name);
    driver.selection_criteria = Some(SelectionCriteria::ReadPreference(read_preference));
    driver
}

fn outcome(result: UpdateResult) -> UpdateOutcome {
    UpdateOutcome::new(result.matched_count, result.modified_count)
}

#[async_trait]
impl RoomStore for MongoRoomStore {
    async fn find(
        &self,
        filter: Document,
        options: FindRoomsOptions,
    ) -> RepositoryResult<Vec<LivechatRoom>> {
        let cursor = self
            .collection
            .find(filter)
            .with_options(find_options(options))
            .await
            .map_err(map_mongo_err)?;

        cursor.try_collect().await.map_err(map_mongo_err)
    }

    async fn update_one(
        &self,
        filter: Document,
        update: Document,
    ) -> RepositoryResult<UpdateOutcome> {
        self.collection
            .update_one(filter, update)
            .await
            .map(outcome)
            .map_err(map_mongo_err)
    }

    async fn update_many(
        &self,
        filter: Document,
        update: Document,
    ) -> RepositoryResult<UpdateOutcome> {
        self.collection
            .update_many(filter, update)
            .await
            .map(outcome)
            .map_err(map_mongo_err)
    }

    async fn count_documents(&self, filter: Document) -> RepositoryResult<u64> {
        self.collection
            .count_documents(filter)
            .await
            .map_err(map_mongo_err)
    }

    async fn aggregate(
        &self,
        pipeline: Vec<Document>,
        options: AggregateOptions,
    ) -> RepositoryResult<Vec<Document>> {
        let cursor = self
            .collection
            .aggregate(pipeline)
            .with_options(aggregate_options(options))
            .await
            .map_err(map_mongo_err)?;

        cursor.try_collect().await.map_err(map_mongo_err)
    }
}
