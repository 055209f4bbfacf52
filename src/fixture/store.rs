use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::{Result, RucheckError};

/// 只读的 fixture 文档
pub type Fixture = Arc<Value>;

/// Fixture 存储
///
/// 每个 `*.json` 文件以文件名（不含扩展名）命名整个文档；
/// 文档是集合（非空对象，且所有顶层值都是对象或数组）时，
/// 每个顶层键也各自成为一个 fixture。
///
/// 例如 `orders.json` 包含 `{"order1": {...}, "badOrder": {...}}`，
/// 则可以使用 `orders`、`order1`、`badOrder` 三个名称。
#[derive(Debug, Clone, Default)]
pub struct FixtureStore {
    fixtures: BTreeMap<String, Fixture>,
}

impl FixtureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取目录下所有 `*.json` 文件
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files: Vec<_> = fs::read_dir(dir)
            .map_err(|e| {
                RucheckError::Config(format!(
                    "无法读取 fixture 目录 {}: {}",
                    dir.display(),
                    e
                ))
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        // 保证重复名称的报错与文件系统顺序无关
        files.sort();

        let mut documents = Vec::with_capacity(files.len());
        for path in files {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = fs::read_to_string(&path)?;
            let document: Value = serde_json::from_str(&content).map_err(|e| {
                RucheckError::ParseError(format!("fixture {}: {}", path.display(), e))
            })?;
            debug!(fixture = stem, path = %path.display(), "loaded fixture file");
            documents.push((stem.to_string(), document));
        }

        Self::from_documents(documents)
    }

    /// 从内存中的文档构建
    pub fn from_documents<I, S>(documents: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let mut store = Self::new();
        for (name, document) in documents {
            let name = name.into();
            if let Some(members) = collection_members(&document) {
                for (key, member) in members {
                    store.insert(key.clone(), member.clone())?;
                }
            }
            store.insert(name, document)?;
        }
        Ok(store)
    }

    fn insert(&mut self, name: String, document: Value) -> Result<()> {
        if self.fixtures.contains_key(&name) {
            return Err(RucheckError::DuplicateFixture(name));
        }
        self.fixtures.insert(name, Arc::new(document));
        Ok(())
    }

    /// 按名称获取 fixture
    pub fn load(&self, name: &str) -> Result<Fixture> {
        self.fixtures
            .get(name)
            .cloned()
            .ok_or_else(|| RucheckError::FixtureNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fixtures.contains_key(name)
    }

    /// 所有可用名称（有序）
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fixtures.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }
}

fn collection_members(document: &Value) -> Option<&serde_json::Map<String, Value>> {
    let members = document.as_object()?;
    let is_collection = !members.is_empty()
        && members
            .values()
            .all(|member| member.is_object() || member.is_array());
    is_collection.then_some(members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_members_are_named() {
        let store = FixtureStore::from_documents([(
            "orders",
            json!({"order1": {"id": 1}, "badOrder": {"id": "x"}}),
        )])
        .unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(*store.load("order1").unwrap(), json!({"id": 1}));
        assert_eq!(*store.load("badOrder").unwrap(), json!({"id": "x"}));
        assert!(store.load("orders").unwrap().is_object());
    }

    #[test]
    fn test_missing_fixture() {
        let store = FixtureStore::new();
        let err = store.load("pet").unwrap_err();
        assert!(matches!(err, RucheckError::FixtureNotFound(ref name) if name == "pet"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = FixtureStore::from_documents([
            ("pets", json!({"pet": {"id": 1}})),
            ("pet", json!({"id": 2})),
        ]);
        assert!(matches!(result, Err(RucheckError::DuplicateFixture(ref name)) if name == "pet"));
    }

    #[test]
    fn test_records_with_shared_keys() {
        let store = FixtureStore::from_documents([
            ("user1", json!({"id": 1, "username": "user1"})),
            ("user2", json!({"id": 2, "username": "user2"})),
        ])
        .unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_array_document_has_no_members() {
        let store = FixtureStore::from_documents([("users", json!([{"id": 1}]))]).unwrap();
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["users"]);
    }

    #[test]
    fn test_load_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("pet.json"), r#"{"id": 10, "name": "doggie"}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let store = FixtureStore::load_dir(dir.path()).unwrap();
        assert_eq!(store.load("pet").unwrap()["name"], json!("doggie"));
        assert!(!store.contains("notes"));
        // 单条记录的字段不会成为 fixture
        assert!(!store.contains("id"));
    }

    #[test]
    fn test_load_dir_invalid_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        assert!(matches!(
            FixtureStore::load_dir(dir.path()),
            Err(RucheckError::ParseError(_))
        ));
    }

    #[test]
    fn test_shared_fixture_is_not_mutated() {
        let store = FixtureStore::from_documents([("pet", json!({"id": 1}))]).unwrap();
        let mut copy = store.load("pet").unwrap().as_ref().clone();
        copy["id"] = json!(2);
        assert_eq!(store.load("pet").unwrap()["id"], json!(1));
    }
}
