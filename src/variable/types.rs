use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// 单次场景运行的变量作用域
///
/// 场景开始时重置为种子变量，之后只由捕获写入；不同场景之间不共享。
#[derive(Debug, Clone, Default)]
pub struct VariableScope {
    variables: HashMap<String, Value>,
}

impl VariableScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以种子变量创建作用域
    pub fn seeded(seed: &HashMap<String, Value>) -> Self {
        Self {
            variables: seed.clone(),
        }
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// 环境配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Environment {
    /// 变量映射
    #[serde(flatten)]
    pub variables: HashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scope_bind_and_get() {
        let mut scope = VariableScope::new();
        assert!(scope.is_empty());

        scope.bind("id", json!(7));
        assert_eq!(scope.len(), 1);
        assert_eq!(scope.get("id"), Some(&json!(7)));
        assert_eq!(scope.get("missing"), None);
    }

    #[test]
    fn test_seeded_scope_is_independent() {
        let mut seed = HashMap::new();
        seed.insert("token".to_string(), json!("abc"));

        let mut scope = VariableScope::seeded(&seed);
        scope.bind("id", json!(7));
        scope.bind("token", json!("overridden"));

        let fresh = VariableScope::seeded(&seed);
        assert!(!fresh.contains("id"));
        assert_eq!(fresh.get("token"), Some(&json!("abc")));
    }

    #[test]
    fn test_environment_keeps_toml_types() {
        let env: Environment = toml::from_str("user_id = 3\nname = \"x\"").unwrap();
        assert_eq!(env.variables.get("user_id"), Some(&json!(3)));
        assert_eq!(env.variables.get("name"), Some(&json!("x")));
    }
}
