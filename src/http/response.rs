use crate::Result;
use crate::http::types::Status;
use reqwest::header::HeaderMap as Headers;
use serde_json::Value;
use std::time::Duration;

/// 响应体：能解析为 JSON 时保存解析结果，否则保留原始文本
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    pub fn parse(raw: String) -> Self {
        if raw.trim().is_empty() {
            return ResponseBody::Text(raw);
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(raw),
        }
    }

    /// 以 JSON 视角查看响应体，纯文本按字符串处理
    pub fn as_value(&self) -> Value {
        match self {
            ResponseBody::Json(value) => value.clone(),
            ResponseBody::Text(text) => Value::String(text.clone()),
        }
    }
}

/// 规范化后的响应记录
///
/// 只在断言与捕获期间存在，处理完即丢弃。
#[derive(Debug, Clone)]
pub struct Response {
    pub status: Status,
    pub headers: Headers,
    pub body: ResponseBody,
    pub duration: Duration,
}

impl Response {
    pub fn new(status: u16, headers: Headers, body: String, duration: Duration) -> Result<Self> {
        Ok(Self {
            status: Status::new(status)?,
            headers,
            body: ResponseBody::parse(body),
            duration,
        })
    }

    /// 大小写不敏感的 header 查找
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
