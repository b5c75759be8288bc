//! 统一配置中心
//!
//! 加载顺序：内置默认值 -> 可选配置文件（`LIVECHAT_CONFIG_FILE` 或命令行指定）
//! -> 环境变量 `LIVECHAT_*`，嵌套字段用 `__` 分隔，例如 `LIVECHAT_MONGO__URL`。

use std::path::Path;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

pub const CONFIG_FILE_ENV: &str = "LIVECHAT_CONFIG_FILE";
const ENV_PREFIX: &str = "LIVECHAT_";

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub mongo: MongoConfig,
    #[serde(default)]
    #[validate(nested)]
    pub livechat: LivechatConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
    #[serde(default)]
    #[validate(nested)]
    pub logging: LoggingConfig,
}

/// MongoDB 连接配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MongoConfig {
    #[validate(url)]
    pub url: String,
    #[validate(length(min = 1))]
    pub database: String,
    /// 房间集合名称
    #[validate(length(min = 1))]
    pub rooms_collection: String,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 1000))]
    pub max_pool_size: Option<u32>,
}

/// 移除 SLA / 优先级时写回的默认值
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct LivechatConfig {
    #[validate(range(min = 1))]
    pub default_estimated_waiting_time_queue: i64,
    #[validate(range(min = 0))]
    pub not_specified_priority_weight: i64,
}

impl Default for LivechatConfig {
    fn default() -> Self {
        Self {
            default_estimated_waiting_time_queue: 9_999_999,
            not_specified_priority_weight: 99,
        }
    }
}

/// 报表聚合的读取节点
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportReadPreference {
    Primary,
    #[default]
    SecondaryPreferred,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReportingConfig {
    #[serde(default)]
    pub read_preference: ReportReadPreference,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoggingConfig {
    /// `RUST_LOG` 未设置时使用的过滤规则
    #[validate(length(min = 1))]
    pub filter: String,
    /// 输出 JSON 格式日志
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            json: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mongo: MongoConfig {
                url: "mongodb://127.0.0.1:27017".into(),
                database: "rocketchat".into(),
                rooms_collection: "rocketchat_room".into(),
                app_name: Some("livechat-rooms".into()),
                max_pool_size: Some(10),
            },
            livechat: LivechatConfig::default(),
            reporting: ReportingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("unsupported mongo url scheme: {0}")]
    InvalidMongoUrl(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

impl AppConfig {
    /// 按 `LIVECHAT_CONFIG_FILE` 查找配置文件后加载
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var(CONFIG_FILE_ENV).ok();
        Self::load_from(file.as_deref().map(Path::new))
    }

    pub fn load_from(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut fig = Figment::new().merge(Serialized::defaults(AppConfig::default()));
        if let Some(path) = file {
            fig = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yml") | Some("yaml") => fig.merge(Yaml::file(path)),
                Some("json") => fig.merge(Json::file(path)),
                _ => fig.merge(Toml::file(path)),
            };
        }
        fig = fig.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let cfg: AppConfig = fig.extract()?;
        cfg.check()?;
        Ok(cfg)
    }

    fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        let url = self.mongo.url.as_str();
        if !(url.starts_with("mongodb://") || url.starts_with("mongodb+srv://")) {
            return Err(ConfigError::InvalidMongoUrl(self.mongo.url.clone()));
        }
        Ok(())
    }

    /// 隐藏连接串中的凭据（用于日志）
    pub fn sanitized_mongo_url(&self) -> String {
        let url = &self.mongo.url;
        match (url.find("://"), url.rfind('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                format!("{}[REDACTED]{}", &url[..scheme_end + 3], &url[at..])
            }
            _ => url.clone(),
        }
    }
}
