use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RucheckError {
    #[error("解析错误: {0}")]
    ParseError(String),

    #[error("无效的 URL: {0}")]
    InvalidUrl(String),

    #[error("配置错误: {0}")]
    Config(String),

    /// 网络层失败（连接拒绝、超时、DNS 等），不会自动重试
    #[error("传输错误: {0}")]
    Transport(String),

    /// failOnStatusCode 开启时收到非 2xx/3xx 状态码
    #[error("状态码 {status} 不在 2xx/3xx 范围内")]
    UnexpectedStatus { status: u16 },

    #[error("未找到 fixture: {0}")]
    FixtureNotFound(String),

    #[error("重复的 fixture 名称: {0}")]
    DuplicateFixture(String),

    #[error("未绑定的变量: {0}")]
    UnboundVariable(String),

    #[error("捕获路径不存在: {0}")]
    CapturePathMissing(String),

    #[error("无效的断言定义: {0}")]
    InvalidAssertionSpec(String),

    #[error("重复的场景名称: {0}")]
    DuplicateScenario(String),

    #[error("场景超时: 超过 {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("运行已取消")]
    Cancelled,

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON 解析错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML 解析错误: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("URL 解析错误: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for RucheckError {
    fn from(err: anyhow::Error) -> Self {
        RucheckError::Other(err.to_string())
    }
}

impl From<crate::assertion::AssertError> for RucheckError {
    fn from(err: crate::assertion::AssertError) -> Self {
        RucheckError::InvalidAssertionSpec(err.to_string())
    }
}

/// 报告中使用的错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    TransportError,
    FixtureNotFound,
    UnboundVariable,
    CapturePathMissing,
    InvalidAssertionSpec,
    Timeout,
    Cancelled,
    Internal,
}

impl RucheckError {
    /// 错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            RucheckError::Transport(_) => ErrorKind::TransportError,
            RucheckError::FixtureNotFound(_) => ErrorKind::FixtureNotFound,
            RucheckError::UnboundVariable(_) => ErrorKind::UnboundVariable,
            RucheckError::CapturePathMissing(_) => ErrorKind::CapturePathMissing,
            RucheckError::InvalidAssertionSpec(_) => ErrorKind::InvalidAssertionSpec,
            RucheckError::Timeout(_) => ErrorKind::Timeout,
            RucheckError::Cancelled => ErrorKind::Cancelled,
            _ => ErrorKind::Internal,
        }
    }
}

/// Result type for rucheck crate
pub type Result<T> = std::result::Result<T, RucheckError>;
