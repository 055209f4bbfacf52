use serde_json::{Value, json};

use crate::assertion::path::{FieldPath, json_eq, type_of};
use crate::assertion::types::{Assertion, AssertionResult, KeysMode, describe};
use crate::http::Response;

/// 对一组断言求值
///
/// 每个断言产生一个结果，forEachElement 每个元素产生一个结果。
/// 断言失败不会返回错误。
pub fn evaluate(assertions: &[Assertion], response: &Response) -> Vec<AssertionResult> {
    let body = response.body.as_value();
    assertions
        .iter()
        .flat_map(|assertion| evaluate_assertion(assertion, response, &body))
        .collect()
}

/// 对单个断言求值，`body` 为响应体的 JSON 视图
pub fn evaluate_assertion(
    assertion: &Assertion,
    response: &Response,
    body: &Value,
) -> Vec<AssertionResult> {
    let description = assertion.to_string();
    let status = response.status.code();

    match assertion {
        Assertion::StatusEquals(expected) => vec![check(
            description,
            status == *expected,
            json!(status),
            json!(expected),
            || format!("Expected status {}, got {}", expected, status),
        )],

        Assertion::StatusOneOf(codes) => vec![check(
            description,
            codes.contains(&status),
            json!(status),
            json!(codes),
            || format!("Expected status to be one of {:?}, got {}", codes, status),
        )],

        Assertion::StatusNotEquals(unexpected) => vec![check(
            description,
            status != *unexpected,
            json!(status),
            json!({ "not": unexpected }),
            || format!("Expected status other than {}", unexpected),
        )],

        Assertion::HeaderContains { name, substring } => {
            let actual = response.header(name);
            vec![check(
                description,
                actual.is_some_and(|v| v.contains(substring.as_str())),
                actual.map_or(Value::Null, |v| json!(v)),
                json!(substring),
                || match actual {
                    Some(v) => format!("Header '{}' = '{}' does not contain '{}'", name, v, substring),
                    None => format!("Header '{}' not found", name),
                },
            )]
        }

        Assertion::ForEachElement { path, assertions } => {
            for_each_element(&description, path, assertions, body)
        }

        field_assertion => vec![evaluate_field(field_assertion, description, body)],
    }
}

/// 对 JSON 文档求值（响应体或 forEachElement 中的元素）
fn evaluate_field(assertion: &Assertion, description: String, root: &Value) -> AssertionResult {
    match assertion {
        Assertion::FieldEquals { path, value } => {
            let actual = path.lookup(root);
            check(
                description,
                actual.is_some_and(|a| json_eq(a, value)),
                actual.cloned().unwrap_or(Value::Null),
                value.clone(),
                || format!("Expected {} to equal {}, got {}", path, value, describe(actual)),
            )
        }

        Assertion::FieldType { path, type_name } => {
            let actual = path.lookup(root);
            check(
                description,
                actual.is_some_and(|a| type_name.matches(a)),
                json!(actual.map_or("missing", type_of)),
                json!(type_name.as_str()),
                || format!("Expected {} to be {}, got {}", path, type_name, describe(actual)),
            )
        }

        Assertion::FieldNotNull { path } => {
            let actual = path.lookup(root);
            check(
                description,
                actual.is_some_and(|a| !a.is_null()),
                actual.cloned().unwrap_or(Value::Null),
                json!("not null"),
                || format!("Expected {} to be present and not null", path),
            )
        }

        Assertion::BodyHasKeys { path, keys, mode } => {
            let actual = path.lookup(root);
            match actual {
                Some(Value::Object(map)) => {
                    let actual_keys: Vec<&String> = map.keys().collect();
                    let missing: Vec<&String> =
                        keys.iter().filter(|k| !map.contains_key(*k)).collect();
                    let extra: Vec<&&String> = actual_keys
                        .iter()
                        .filter(|k| !keys.contains(**k))
                        .collect();
                    let passed = missing.is_empty() && (*mode == KeysMode::AtLeast || extra.is_empty());
                    check(
                        description,
                        passed,
                        json!(actual_keys),
                        json!(keys),
                        || format!("Keys mismatch at {}: missing {:?}, unexpected {:?}", path, missing, extra),
                    )
                }
                other => AssertionResult::failure(
                    description,
                    other.cloned().unwrap_or(Value::Null),
                    json!(keys),
                    format!("Expected {} to be an object, got {}", path, describe(other)),
                ),
            }
        }

        Assertion::BodyIncludes { path, value } => {
            let actual = path.lookup(root);
            check(
                description,
                actual.is_some_and(|a| includes(a, value)),
                actual.cloned().unwrap_or(Value::Null),
                value.clone(),
                || format!("Expected {} to include {}", path, value),
            )
        }

        Assertion::ForEachElement { path, assertions } => {
            // 嵌套的 forEachElement 折叠为一个结果：取第一个失败
            let results = for_each_element(&description, path, assertions, root);
            match results.into_iter().find(|r| !r.passed) {
                Some(failed) => AssertionResult {
                    description,
                    element_index: None,
                    ..failed
                },
                None => AssertionResult::success(description, Value::Null, Value::Null),
            }
        }

        // 状态码与 header 断言在编译期就被排除在元素作用域之外
        other => AssertionResult::failure(
            description,
            Value::Null,
            Value::Null,
            format!("'{}' needs a response and cannot be applied here", other.kind()),
        ),
    }
}

fn for_each_element(
    description: &str,
    path: &FieldPath,
    assertions: &[Assertion],
    root: &Value,
) -> Vec<AssertionResult> {
    let elements: Vec<&Value> = match path.lookup(root) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(map)) => map.values().collect(),
        other => {
            return vec![AssertionResult::failure(
                description.to_string(),
                other.cloned().unwrap_or(Value::Null),
                json!("array"),
                format!("Expected {} to be an array, got {}", path, describe(other)),
            )];
        }
    };

    if elements.is_empty() {
        return vec![AssertionResult {
            message: Some(format!("{} has no elements", path)),
            ..AssertionResult::success(description.to_string(), json!([]), Value::Null)
        }];
    }

    elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| {
            let first_failure = assertions.iter().find_map(|sub| {
                let result = evaluate_field(sub, sub.to_string(), element);
                (!result.passed).then_some(result)
            });

            let result = match first_failure {
                Some(failed) => AssertionResult {
                    description: format!("{}[{}]: {}", description, index, failed.description),
                    message: failed
                        .message
                        .map(|m| format!("element {}: {}", index, m)),
                    ..failed
                },
                None => AssertionResult::success(
                    format!("{}[{}]", description, index),
                    element.clone(),
                    Value::Null,
                ),
            };
            result.at_element(index)
        })
        .collect()
}

/// 包含关系
///
/// - 对象: `expected` 的每个键值都出现在 `actual` 中
/// - 数组: `expected` 为数组时每个元素都能在 `actual` 中找到，否则 `actual` 包含该元素
/// - 字符串: 子串
fn includes(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => expected
            .iter()
            .all(|(k, v)| actual.get(k).is_some_and(|a| json_eq(a, v))),
        (Value::Array(items), Value::Array(wanted)) => wanted
            .iter()
            .all(|w| items.iter().any(|item| json_eq(item, w))),
        (Value::Array(items), wanted) => items.iter().any(|item| json_eq(item, wanted)),
        (Value::String(s), Value::String(sub)) => s.contains(sub.as_str()),
        _ => false,
    }
}

fn check(
    description: String,
    passed: bool,
    actual: Value,
    expected: Value,
    message: impl FnOnce() -> String,
) -> AssertionResult {
    if passed {
        AssertionResult::success(description, actual, expected)
    } else {
        AssertionResult::failure(description, actual, expected, message())
    }
}
