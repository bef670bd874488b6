//! 统一错误处理
//!
//! 提供结构化错误类型和错误处理机制。
//!
//! 片段格式错误和替换未命中在各自组件内部恢复，不会以错误值的形式出现；
//! 这里只包含需要调用方感知的失败。

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// 引擎错误类型
#[derive(Error, Debug, Clone)]
pub enum ItemplateError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 新生成的令牌已存在于存储中
    #[error("令牌冲突: {token} 已存在")]
    TokenCollision { token: Uuid },

    /// 存储错误
    #[error("存储错误: {0}")]
    StorageError(String),

    /// IO错误
    #[error("IO错误: {0}")]
    IoError(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),
}

impl ItemplateError {
    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ItemplateError::ConfigError(_) => ErrorSeverity::Critical,
            ItemplateError::TokenCollision { .. } => ErrorSeverity::Error,
            ItemplateError::StorageError(_) => ErrorSeverity::Error,
            ItemplateError::IoError(_) => ErrorSeverity::Error,
            ItemplateError::SerializationError(_) => ErrorSeverity::Error,
            ItemplateError::ParseError(_) => ErrorSeverity::Warning,
            ItemplateError::InvalidInput(_) => ErrorSeverity::Info,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            ItemplateError::ConfigError(_) => ErrorCategory::Configuration,
            ItemplateError::TokenCollision { .. } => ErrorCategory::Token,
            ItemplateError::StorageError(_) => ErrorCategory::Storage,
            ItemplateError::IoError(_) => ErrorCategory::Storage,
            ItemplateError::SerializationError(_) => ErrorCategory::Serialization,
            ItemplateError::ParseError(_) => ErrorCategory::Parsing,
            ItemplateError::InvalidInput(_) => ErrorCategory::Input,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        let new_msg = format!("{} (上下文: {})", self, context);

        match &mut self {
            ItemplateError::ConfigError(ref mut msg) => *msg = new_msg,
            ItemplateError::StorageError(ref mut msg) => *msg = new_msg,
            ItemplateError::IoError(ref mut msg) => *msg = new_msg,
            ItemplateError::SerializationError(ref mut msg) => *msg = new_msg,
            ItemplateError::ParseError(ref mut msg) => *msg = new_msg,
            ItemplateError::InvalidInput(ref mut msg) => *msg = new_msg,
            // 令牌冲突保持原样，调用方依赖其中的令牌
            ItemplateError::TokenCollision { .. } => {}
        }

        self
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Configuration,
    Token,
    Storage,
    Serialization,
    Parsing,
    Input,
}

/// 标准错误转换
impl From<std::io::Error> for ItemplateError {
    fn from(error: std::io::Error) -> Self {
        ItemplateError::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for ItemplateError {
    fn from(error: serde_json::Error) -> Self {
        ItemplateError::SerializationError(format!("JSON序列化错误: {}", error))
    }
}

impl From<toml::de::Error> for ItemplateError {
    fn from(error: toml::de::Error) -> Self {
        ItemplateError::ParseError(format!("TOML解析错误: {}", error))
    }
}

impl From<crate::env::EnvError> for ItemplateError {
    fn from(error: crate::env::EnvError) -> Self {
        ItemplateError::ConfigError(error.to_string())
    }
}

macro_rules! storage_error_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for ItemplateError {
                fn from(error: $source) -> Self {
                    ItemplateError::StorageError(error.to_string())
                }
            }
        )+
    };
}

storage_error_from!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// 错误结果类型别名
pub type ItemplateResult<T> = Result<T, ItemplateError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误
    pub fn log_error(error: &ItemplateError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("{}", error),
            ErrorSeverity::Warning => tracing::warn!("{}", error),
            ErrorSeverity::Error => tracing::error!("{}", error),
            ErrorSeverity::Critical => tracing::error!("严重错误: {}", error),
        }
    }
}
