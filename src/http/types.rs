use std::fmt;
use std::str::FromStr;

use crate::{Result, RucheckError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl FromStr for Method {
    type Err = RucheckError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            _ => Err(RucheckError::ParseError(format!(
                "Invalid HTTP method: {}",
                s
            ))),
        }
    }
}

impl TryFrom<String> for Method {
    type Error = RucheckError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Method> for String {
    fn from(method: Method) -> Self {
        method.as_str().to_string()
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Patch => reqwest::Method::PATCH,
            Method::Head => reqwest::Method::HEAD,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }

    /// GET/HEAD/OPTIONS 不携带请求体
    pub fn allows_body(&self) -> bool {
        !matches!(self, Method::Get | Method::Head | Method::Options)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(u16);

impl Status {
    pub fn new(code: u16) -> Result<Self> {
        if (100..600).contains(&code) {
            Ok(Self(code))
        } else {
            Err(RucheckError::ParseError(format!(
                "Invalid HTTP status code: {}",
                code
            )))
        }
    }

    pub fn code(&self) -> u16 {
        self.0
    }

    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.0)
    }

    pub fn is_redirect(&self) -> bool {
        (300..=399).contains(&self.0)
    }

    /// failOnStatusCode 接受的范围: 2xx 与 3xx
    pub fn is_accepted(&self) -> bool {
        self.is_success() || self.is_redirect()
    }
}

/// 基础 URL 规范化
///
/// 处理简写格式:
/// 1. ":3000" -> "http://localhost:3000"
/// 2. "localhost:3000/api" -> "http://localhost:3000/api"
pub fn normalize_base_url(input: &str) -> Result<String> {
    const DEFAULT_HOST: &str = "localhost";
    const DEFAULT_SCHEME: &str = "http";

    let input = input.trim();
    if input.is_empty() {
        return Err(RucheckError::InvalidUrl("base URL is empty".to_string()));
    }

    let normalized = if input.starts_with(':') {
        format!("{}://{}{}", DEFAULT_SCHEME, DEFAULT_HOST, input)
    } else if !input.contains("://") {
        format!("{}://{}", DEFAULT_SCHEME, input)
    } else {
        input.to_string()
    };

    // 仅用于校验
    url::Url::parse(&normalized)?;
    Ok(normalized.trim_end_matches('/').to_string())
}

/// 将步骤 URL 拼接到基础 URL 之后
///
/// 绝对 URL 原样返回；相对路径按字符串拼接，保留基础 URL 的路径前缀
/// （`http://h/api/v3` + `/pet/1` -> `http://h/api/v3/pet/1`）。
pub fn join_url(base: Option<&str>, target: &str) -> Result<url::Url> {
    let target = target.trim();
    let full = if target.contains("://") {
        target.to_string()
    } else {
        let base = base.ok_or_else(|| {
            RucheckError::InvalidUrl(format!("relative URL '{}' requires a base URL", target))
        })?;
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            target.trim_start_matches('/')
        )
    };
    url::Url::parse(&full).map_err(|e| RucheckError::InvalidUrl(format!("{}: {}", full, e)))
}
