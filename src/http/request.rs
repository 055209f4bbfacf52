use reqwest::header::{CONTENT_TYPE, HeaderMap as Headers, HeaderName, HeaderValue};
use serde_json::Value;

use crate::http::types::Method;
use crate::{Result, RucheckError};

/// 已序列化的请求体
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
    Text(String),
}

impl RequestBody {
    /// 编码为线上传输的文本
    pub fn encode(&self) -> Result<String> {
        match self {
            RequestBody::Json(value) => Ok(serde_json::to_string(value)?),
            RequestBody::Form(pairs) => Ok(url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish()),
            RequestBody::Text(text) => Ok(text.clone()),
        }
    }
}

/// 模板解析完成、可直接发送的请求
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: url::Url,
    pub headers: Headers,
    pub body: Option<RequestBody>,
    pub query_params: Vec<(String, String)>,
}

impl Request {
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
            body: None,
            query_params: Vec::new(),
        }
    }

    fn insert_header(&mut self, key: &str, value: &str) -> Result<()> {
        let name: HeaderName = key
            .parse()
            .map_err(|_| RucheckError::ParseError(format!("Invalid header name: {}", key)))?;
        let value: HeaderValue = value.parse().map_err(|_| {
            RucheckError::ParseError(format!("Invalid value for header '{}'", key))
        })?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Result<Self> {
        self.insert_header(key, value)?;
        Ok(self)
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query_params.push((key.to_string(), value.to_string()));
        self
    }

    fn content_type(&self) -> Option<String> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_ascii_lowercase())
    }

    /// 根据 Content-Type 选择请求体的序列化方式
    ///
    /// - `application/x-www-form-urlencoded`: 对象按表单编码
    /// - `text/*`: 字符串原样发送
    /// - 其他或未指定: JSON，缺省时补上 `Content-Type: application/json`
    pub fn with_body(mut self, body: Value) -> Result<Self> {
        let content_type = self.content_type();

        let encoded = match content_type.as_deref() {
            Some(ct) if ct.contains("application/x-www-form-urlencoded") => {
                let Value::Object(map) = body else {
                    return Err(RucheckError::ParseError(
                        "form body must be a JSON object".to_string(),
                    ));
                };
                let pairs = map
                    .into_iter()
                    .map(|(k, v)| {
                        let v = match v {
                            Value::String(s) => s,
                            other => other.to_string(),
                        };
                        (k, v)
                    })
                    .collect();
                RequestBody::Form(pairs)
            }
            Some(ct) if ct.starts_with("text/") => match body {
                Value::String(s) => RequestBody::Text(s),
                other => RequestBody::Text(other.to_string()),
            },
            Some(_) => RequestBody::Json(body),
            None => {
                self.insert_header("Content-Type", "application/json")?;
                RequestBody::Json(body)
            }
        };

        self.body = Some(encoded);
        Ok(self)
    }
}
