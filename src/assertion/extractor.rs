use serde_json::Value;

use crate::assertion::types::ValuePath;
use crate::http::{Response, ResponseBody};

/// 从响应中提取值，路径不存在时返回 None
pub fn extract_value(response: &Response, path: &ValuePath) -> Option<Value> {
    match path {
        ValuePath::Status => Some(Value::from(response.status.code())),

        ValuePath::Header(name) => response.header(name).map(|v| Value::String(v.to_string())),

        ValuePath::Body(path) => match &response.body {
            ResponseBody::Json(json) => path.lookup(json).cloned(),
            // 纯文本 body 只能整体取值
            ResponseBody::Text(text) if path.is_root() => {
                Some(Value::String(text.clone()))
            }
            ResponseBody::Text(_) => None,
        },

        ValuePath::ResponseTime => Some(Value::from(response.duration.as_millis() as u64)),
    }
}
