use std::sync::Arc;

use config::MongoConfig;
use domain::RoomStore;
use mongodb::Database;
use thiserror::Error;

use crate::mongo::{connect, ensure_report_indexes, MongoRoomStore};

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

#[derive(Clone)]
pub struct Infrastructure {
    pub database: Database,
    pub room_store: Arc<MongoRoomStore>,
}

impl Infrastructure {
    pub async fn connect(config: &MongoConfig) -> Result<Self, InfrastructureError> {
        let database = connect(config).await?;
        let room_store = Arc::new(MongoRoomStore::from_database(
            &database,
            &config.rooms_collection,
        ));

        Ok(Self {
            database,
            room_store,
        })
    }

    pub async fn ensure_indexes(&self) -> Result<Vec<String>, InfrastructureError> {
        Ok(ensure_report_indexes(self.room_store.collection()).await?)
    }

    pub fn room_store_trait(&self) -> Arc<dyn RoomStore> {
        self.room_store.clone()
    }
}
