//! 领域模型错误定义
//!
//! 房间查询层不做错误转换：存储层的失败原样向上传递，
//! 这里只负责把驱动错误装进统一的类型里。

use thiserror::Error;

/// 仓储错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    /// 数据库调用失败（连接中断、非法过滤条件等）
    #[error("storage error: {message}")]
    Storage { message: String },

    /// 文档无法映射为领域类型
    #[error("invalid data: {message}")]
    InvalidData { message: String },
}

impl RepositoryError {
    /// 创建存储错误
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// 创建数据错误
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }
}

impl From<bson::de::Error> for RepositoryError {
    fn from(err: bson::de::Error) -> Self {
        Self::invalid_data(err.to_string())
    }
}

/// 仓储结果类型
pub type RepositoryResult<T> = Result<T, RepositoryError>;
