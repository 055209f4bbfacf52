use crate::variable::types::VariableScope;
use crate::{Result, RucheckError};
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static VAR_REGEX: OnceLock<Regex> = OnceLock::new();
    VAR_REGEX.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex is valid")
    })
}

/// 变量替换器
pub struct VariableResolver;

impl VariableResolver {
    /// 替换文本中的所有 `${name}` 占位符
    ///
    /// 字符串值原样插入，其他 JSON 值插入其 JSON 文本。
    pub fn resolve(template: &str, scope: &VariableScope) -> Result<String> {
        let mut unbound = None;
        let resolved = placeholder_regex().replace_all(template, |caps: &Captures| {
            match scope.get(&caps[1]) {
                Some(value) => to_text(value),
                None => {
                    unbound.get_or_insert_with(|| caps[1].to_string());
                    String::new()
                }
            }
        });

        match unbound {
            Some(name) => Err(RucheckError::UnboundVariable(name)),
            None => Ok(resolved.into_owned()),
        }
    }

    /// 替换 JSON 模板中的占位符
    ///
    /// 恰好是单个占位符的字符串（如 `"${id}"`）替换为变量值本身，保留其类型。
    pub fn resolve_value(template: &Value, scope: &VariableScope) -> Result<Value> {
        match template {
            Value::String(s) => {
                if let Some(name) = whole_placeholder(s) {
                    return scope
                        .get(name)
                        .cloned()
                        .ok_or_else(|| RucheckError::UnboundVariable(name.to_string()));
                }
                Ok(Value::String(Self::resolve(s, scope)?))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| Self::resolve_value(item, scope))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut resolved = serde_json::Map::with_capacity(map.len());
                for (key, value) in map {
                    resolved.insert(key.clone(), Self::resolve_value(value, scope)?);
                }
                Ok(Value::Object(resolved))
            }
            other => Ok(other.clone()),
        }
    }

    /// 列出模板中引用的变量名（按出现顺序）
    pub fn placeholders(template: &str) -> Vec<String> {
        placeholder_regex()
            .captures_iter(template)
            .map(|caps| caps[1].to_string())
            .collect()
    }

    /// 列出 JSON 模板中引用的变量名
    pub fn value_placeholders(template: &Value) -> Vec<String> {
        match template {
            Value::String(s) => Self::placeholders(s),
            Value::Array(items) => items.iter().flat_map(Self::value_placeholders).collect(),
            Value::Object(map) => map.values().flat_map(Self::value_placeholders).collect(),
            _ => Vec::new(),
        }
    }

    /// 解析并替换系统环境变量 ${VAR}，未设置的保持原样
    pub fn resolve_env_vars(text: &str) -> String {
        static ENV_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = ENV_REGEX
            .get_or_init(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env regex is valid"));

        re.replace_all(text, |caps: &Captures| {
            let env_name = &caps[1];
            std::env::var(env_name).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string()
    }
}

fn whole_placeholder(s: &str) -> Option<&str> {
    let caps = placeholder_regex().captures(s)?;
    let whole = caps.get(0)?;
    if whole.start() == 0 && whole.end() == s.len() {
        caps.get(1).map(|m| m.as_str())
    } else {
        None
    }
}

fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
