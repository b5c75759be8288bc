//! 报表聚合依赖的索引
//!
//! 不显式命名，服务端按键生成的默认名称（如 `source_1_ts_1`）
//! 正好是报表查询 hint 使用的名称。

use bson::Document;
use domain::LivechatRoom;
use mongodb::{Collection, IndexModel};
use tracing::info;

/// 报表索引的键：`{<field>: 1, ts: 1}`
pub fn report_index_keys() -> Vec<Document> {
    ["source", "departmentId", "tags.0", "servedBy"]
        .into_iter()
        .map(|field| {
            let mut keys = Document::new();
            keys.insert(field, 1);
            keys.insert("ts", 1);
            keys
        })
        .collect()
}

pub async fn ensure_report_indexes(
    collection: &Collection<LivechatRoom>,
) -> mongodb::error::Result<Vec<String>> {
    let models = report_index_keys()
        .into_iter()
        .map(|keys| IndexModel::builder().keys(keys).build());

    let result = collection.create_indexes(models).await?;
    info!("报表索引已就绪: {:?}", result.index_names);
    Ok(result.index_names)
}
