use serde_json::{Map, Value};

use crate::assertion::path::FieldPath;
use crate::assertion::types::{AssertError, Assertion, KeysMode, TypeName, ValuePath};

/// 字段路径的根
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathScope {
    /// 以响应为根：`status`、`headers.*` 有特殊含义，字段路径相对于 body
    Response,
    /// forEachElement 内部：字段路径相对于当前元素
    Element,
}

/// 编译断言定义
///
/// 定义可以是带 `kind` 字段的 JSON 对象，也可以是紧凑表达式字符串:
/// - `{"kind": "statusOneOf", "codes": [400, 404]}`
/// - `"body.status == \"available\""`
pub fn compile(definition: &Value) -> Result<Assertion, AssertError> {
    compile_in(definition, PathScope::Response)
}

fn compile_in(definition: &Value, scope: PathScope) -> Result<Assertion, AssertError> {
    let assertion = match definition {
        Value::String(expr) => parse_assertion_in(expr, scope)?,
        Value::Object(map) => compile_object(map, scope)?,
        other => {
            return Err(AssertError::InvalidSyntax(format!(
                "assertion must be a string or an object, got {}",
                other
            )));
        }
    };

    if scope == PathScope::Element && !assertion.is_field_assertion() {
        return Err(AssertError::InvalidSyntax(format!(
            "'{}' cannot be used inside forEachElement",
            assertion.kind()
        )));
    }
    Ok(assertion)
}

fn compile_object(map: &Map<String, Value>, scope: PathScope) -> Result<Assertion, AssertError> {
    let kind = map
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| AssertError::InvalidSyntax("assertion object needs a 'kind'".to_string()))?;

    let field = |name: &str| {
        map.get(name).ok_or_else(|| AssertError::MissingField {
            kind: kind.to_string(),
            field: name.to_string(),
        })
    };
    let str_field = |name: &str| -> Result<String, AssertError> {
        field(name)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AssertError::InvalidValue(format!("'{}' must be a string", name)))
    };
    let path_field = |name: &str| -> Result<FieldPath, AssertError> {
        match map.get(name) {
            Some(Value::String(path)) => field_path(path, scope),
            Some(other) => Err(AssertError::InvalidValue(format!(
                "'{}' must be a string, got {}",
                name, other
            ))),
            None => Ok(FieldPath::root()),
        }
    };

    match kind {
        "statusEquals" => Ok(Assertion::StatusEquals(status_code(field("code")?)?)),
        "statusNotEquals" => Ok(Assertion::StatusNotEquals(status_code(field("code")?)?)),
        "statusOneOf" => {
            let codes = field("codes")?
                .as_array()
                .ok_or_else(|| AssertError::InvalidValue("'codes' must be an array".to_string()))?
                .iter()
                .map(status_code)
                .collect::<Result<Vec<_>, _>>()?;
            if codes.is_empty() {
                return Err(AssertError::InvalidValue(
                    "'codes' must not be empty".to_string(),
                ));
            }
            Ok(Assertion::StatusOneOf(codes))
        }
        "bodyHasKeys" => {
            let keys = key_list(field("keys")?)?;
            let mode = match map.get("mode") {
                None => KeysMode::default(),
                Some(mode) => serde_json::from_value(mode.clone()).map_err(|_| {
                    AssertError::InvalidValue(format!(
                        "'mode' must be \"exact\" or \"atLeast\", got {}",
                        mode
                    ))
                })?,
            };
            Ok(Assertion::BodyHasKeys {
                path: path_field("path")?,
                keys,
                mode,
            })
        }
        "fieldEquals" => Ok(Assertion::FieldEquals {
            path: field_path(&str_field("path")?, scope)?,
            value: field("value")?.clone(),
        }),
        "fieldType" => {
            let name = str_field("type")?;
            let type_name = TypeName::parse(&name)
                .ok_or_else(|| AssertError::InvalidValue(format!("unknown type '{}'", name)))?;
            Ok(Assertion::FieldType {
                path: field_path(&str_field("path")?, scope)?,
                type_name,
            })
        }
        "fieldNotNull" => Ok(Assertion::FieldNotNull {
            path: field_path(&str_field("path")?, scope)?,
        }),
        "bodyIncludes" => Ok(Assertion::BodyIncludes {
            path: path_field("path")?,
            value: field("value")?.clone(),
        }),
        "forEachElement" => {
            let subs = field("assertions")?.as_array().ok_or_else(|| {
                AssertError::InvalidValue("'assertions' must be an array".to_string())
            })?;
            if subs.is_empty() {
                return Err(AssertError::InvalidValue(
                    "'assertions' must not be empty".to_string(),
                ));
            }
            let assertions = subs
                .iter()
                .map(|sub| compile_in(sub, PathScope::Element))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Assertion::ForEachElement {
                path: path_field("path")?,
                assertions,
            })
        }
        "headerContains" => Ok(Assertion::HeaderContains {
            name: str_field("name")?,
            substring: str_field("substring")?,
        }),
        other => Err(AssertError::UnknownKind(other.to_string())),
    }
}

fn field_path(input: &str, scope: PathScope) -> Result<FieldPath, AssertError> {
    match scope {
        PathScope::Response => FieldPath::parse_body_rooted(input),
        PathScope::Element => FieldPath::parse(input),
    }
}

fn status_code(value: &Value) -> Result<u16, AssertError> {
    value
        .as_u64()
        .filter(|code| (100..600).contains(code))
        .map(|code| code as u16)
        .ok_or_else(|| AssertError::InvalidValue(format!("invalid status code: {}", value)))
}

fn key_list(value: &Value) -> Result<Vec<String>, AssertError> {
    value
        .as_array()
        .ok_or_else(|| AssertError::InvalidValue("'keys' must be an array".to_string()))?
        .iter()
        .map(|key| {
            key.as_str()
                .map(str::to_string)
                .ok_or_else(|| AssertError::InvalidValue(format!("key must be a string: {}", key)))
        })
        .collect()
}

/// 解析紧凑断言表达式
///
/// 支持的格式：
/// - `status == 200` / `status != 200` / `status in [400, 404]`
/// - `headers.content-type contains "json"`
/// - `body.name == "doggie"`
/// - `body.id is integer`
/// - `body not null`
/// - `body has keys [id, petId]`（至少包含）
/// - `body has all keys [approved, placed, delivered]`（完全一致）
/// - `body includes {"username": "user1"}`
pub fn parse_assertion(input: &str) -> Result<Assertion, AssertError> {
    parse_assertion_in(input, PathScope::Response)
}

fn parse_assertion_in(input: &str, scope: PathScope) -> Result<Assertion, AssertError> {
    let input = input.trim();

    let (left, rest) = input.split_once(char::is_whitespace).ok_or_else(|| {
        AssertError::InvalidSyntax(format!("No operator found in assertion: {}", input))
    })?;
    let rest = rest.trim_start();

    if scope == PathScope::Response {
        if left == "status" {
            return parse_status_assertion(rest, input);
        }
        if let Some(name) = left
            .strip_prefix("headers.")
            .or_else(|| left.strip_prefix("header."))
        {
            let substring = rest.strip_prefix("contains").ok_or_else(|| {
                AssertError::InvalidSyntax(format!(
                    "header assertions only support 'contains': {}",
                    input
                ))
            })?;
            return Ok(Assertion::HeaderContains {
                name: name.to_string(),
                substring: unquote(substring.trim()).to_string(),
            });
        }
    }

    let path = field_path(left, scope)?;

    if let Some(value) = rest.strip_prefix("==") {
        return Ok(Assertion::FieldEquals {
            path,
            value: parse_json_value(value)?,
        });
    }
    if let Some(type_name) = rest.strip_prefix("is ") {
        let type_name = TypeName::parse(type_name).ok_or_else(|| {
            AssertError::InvalidValue(format!("unknown type '{}'", type_name.trim()))
        })?;
        return Ok(Assertion::FieldType { path, type_name });
    }
    if rest == "not null" {
        return Ok(Assertion::FieldNotNull { path });
    }
    if let Some(keys) = rest.strip_prefix("has all keys") {
        return Ok(Assertion::BodyHasKeys {
            path,
            keys: parse_key_list(keys)?,
            mode: KeysMode::Exact,
        });
    }
    if let Some(keys) = rest.strip_prefix("has keys") {
        return Ok(Assertion::BodyHasKeys {
            path,
            keys: parse_key_list(keys)?,
            mode: KeysMode::AtLeast,
        });
    }
    if let Some(value) = rest.strip_prefix("includes") {
        return Ok(Assertion::BodyIncludes {
            path,
            value: parse_json_value(value)?,
        });
    }

    Err(AssertError::InvalidSyntax(format!(
        "Unsupported assertion: {}",
        input
    )))
}

fn parse_status_assertion(rest: &str, input: &str) -> Result<Assertion, AssertError> {
    if let Some(code) = rest.strip_prefix("==") {
        return Ok(Assertion::StatusEquals(status_code(&parse_json_value(code)?)?));
    }
    if let Some(code) = rest.strip_prefix("!=") {
        return Ok(Assertion::StatusNotEquals(status_code(&parse_json_value(
            code,
        )?)?));
    }
    if let Some(codes) = rest.strip_prefix("in ") {
        let codes = parse_json_value(codes)?;
        let codes = codes
            .as_array()
            .ok_or_else(|| AssertError::InvalidValue(format!("expected a list: {}", codes)))?
            .iter()
            .map(status_code)
            .collect::<Result<Vec<_>, _>>()?;
        if codes.is_empty() {
            return Err(AssertError::InvalidValue("status list is empty".to_string()));
        }
        return Ok(Assertion::StatusOneOf(codes));
    }
    Err(AssertError::InvalidSyntax(format!(
        "status assertions support '==', '!=' and 'in': {}",
        input
    )))
}

/// 解析取值位置（变量捕获来源）
///
/// - `status`
/// - `headers.X-Token` / `header.X-Token`
/// - `body` / `body.user.id`
/// - `response.time`
pub fn parse_value_path(input: &str) -> Result<ValuePath, AssertError> {
    let input = input.trim();

    if input == "status" {
        return Ok(ValuePath::Status);
    }

    if input == "response.time" {
        return Ok(ValuePath::ResponseTime);
    }

    if let Some(rest) = input
        .strip_prefix("headers.")
        .or_else(|| input.strip_prefix("header."))
    {
        if rest.is_empty() {
            return Err(AssertError::InvalidPath("header name is empty".to_string()));
        }
        return Ok(ValuePath::Header(rest.to_string()));
    }

    if input == "body" || input.starts_with("body.") || input.starts_with("body[") {
        return Ok(ValuePath::Body(FieldPath::parse_body_rooted(input)?));
    }

    Err(AssertError::InvalidPath(format!(
        "{}. Must start with 'status', 'headers.', 'body' or 'response.time'",
        input
    )))
}

/// 解析断言值（右值），单引号字符串按字符串处理
fn parse_json_value(input: &str) -> Result<Value, AssertError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AssertError::InvalidSyntax(
            "Right side of assertion is empty".to_string(),
        ));
    }

    if input.len() >= 2 && input.starts_with('\'') && input.ends_with('\'') {
        return Ok(Value::String(input[1..input.len() - 1].to_string()));
    }

    serde_json::from_str(input)
        .map_err(|_| AssertError::InvalidValue(format!("not a JSON value: {}", input)))
}

fn parse_key_list(input: &str) -> Result<Vec<String>, AssertError> {
    let input = input.trim();
    if let Ok(value) = serde_json::from_str::<Value>(input) {
        return key_list(&value);
    }

    let inner = input
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| AssertError::InvalidSyntax(format!("expected [key, ...]: {}", input)))?;
    Ok(inner
        .split(',')
        .map(|key| unquote(key.trim()).to_string())
        .filter(|key| !key.is_empty())
        .collect())
}

fn unquote(s: &str) -> &str {
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}
