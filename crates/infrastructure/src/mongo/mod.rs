//! MongoDB 连接与错误映射

mod indexes;
mod room_store;

pub use indexes::{ensure_report_indexes, report_index_keys};
pub use room_store::MongoRoomStore;

use config::MongoConfig;
use domain::RepositoryError;
use mongodb::{error::ErrorKind, options::ClientOptions, Client, Database};
use tracing::info;

/// 按配置建立客户端并返回目标数据库
pub async fn connect(config: &MongoConfig) -> mongodb::error::Result<Database> {
    let mut options = ClientOptions::parse(&config.url).await?;
    if let Some(app_name) = &config.app_name {
        options.app_name = Some(app_name.clone());
    }
    if let Some(max_pool_size) = config.max_pool_size {
        options.max_pool_size = Some(max_pool_size);
    }

    let client = Client::with_options(options)?;
    info!("MongoDB 客户端已创建，数据库: {}", config.database);
    Ok(client.database(&config.database))
}

pub(crate) fn map_mongo_err(err: mongodb::error::Error) -> RepositoryError {
    match err.kind.as_ref() {
        ErrorKind::BsonDeserialization(inner) => RepositoryError::invalid_data(inner.to_string()),
        _ => RepositoryError::storage(err.to_string()),
    }
}
