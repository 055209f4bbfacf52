use std::fmt;

use serde_json::Value;

use crate::assertion::types::AssertError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// JSON 字段路径
///
/// 语法: 点号分隔的字段名，`[n]` 表示数组下标，纯数字段也按下标处理。
/// 空路径、`$` 表示根节点本身。
///
/// - `id`
/// - `category.name`
/// - `tags[0].name`
/// - `items.2`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self {
            raw: String::new(),
            segments: Vec::new(),
        }
    }

    pub fn parse(input: &str) -> Result<Self, AssertError> {
        let raw = input.trim();
        let body = raw.strip_prefix('$').unwrap_or(raw);
        let body = body.strip_prefix('.').unwrap_or(body);

        let mut segments = Vec::new();
        if body.is_empty() {
            return Ok(Self {
                raw: raw.to_string(),
                segments,
            });
        }

        for part in body.split('.') {
            if part.is_empty() {
                return Err(AssertError::InvalidPath(format!(
                    "empty segment in path '{}'",
                    raw
                )));
            }
            parse_part(part, raw, &mut segments)?;
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// 解析以响应体为根的路径，开头的 `body` 段会被去掉
    pub fn parse_body_rooted(input: &str) -> Result<Self, AssertError> {
        let mut path = Self::parse(input)?;
        if matches!(path.segments.first(), Some(Segment::Key(k)) if k == "body") {
            path.segments.remove(0);
        }
        Ok(path)
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn lookup<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut current = root;
        for segment in &self.segments {
            current = match (segment, current) {
                (Segment::Key(key), Value::Object(map)) => map.get(key)?,
                (Segment::Key(key), Value::Array(items)) => {
                    let index: usize = key.parse().ok()?;
                    items.get(index)?
                }
                (Segment::Index(index), Value::Array(items)) => items.get(*index)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

fn parse_part(part: &str, raw: &str, segments: &mut Vec<Segment>) -> Result<(), AssertError> {
    let invalid = || AssertError::InvalidPath(format!("malformed index in path '{}'", raw));

    let (name, mut rest) = match part.find('[') {
        Some(pos) => (&part[..pos], &part[pos..]),
        None => (part, ""),
    };
    if !name.is_empty() {
        segments.push(Segment::Key(name.to_string()));
    }

    while !rest.is_empty() {
        let inner = rest.strip_prefix('[').ok_or_else(invalid)?;
        let end = inner.find(']').ok_or_else(invalid)?;
        let index: usize = inner[..end].trim().parse().map_err(|_| invalid())?;
        segments.push(Segment::Index(index));
        rest = &inner[end + 1..];
    }
    Ok(())
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.raw.is_empty() {
            write!(f, "$")
        } else {
            write!(f, "{}", self.raw)
        }
    }
}

/// 深度比较，数字按数值比较（`7` 与 `7.0` 相等）
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x == y
            } else {
                match (x.as_f64(), y.as_f64()) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                }
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| json_eq(x, y)))
        }
        _ => a == b,
    }
}

/// JSON 值的类型名称
pub fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
