use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::Method;

/// 失败策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailurePolicy {
    /// 第一个断言失败的步骤之后停止（默认）
    #[default]
    HaltOnFirstFailure,
    /// 无论断言是否失败都执行所有步骤
    ContinueOnFailure,
}

/// 测试套件文件
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suite {
    /// 套件名称，缺省为文件名
    #[serde(default)]
    pub name: Option<String>,

    pub scenarios: Vec<ScenarioDef>,
}

/// 场景定义
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDef {
    pub name: String,

    pub steps: Vec<StepDef>,

    /// 覆盖运行级失败策略
    #[serde(default)]
    pub failure_policy: Option<FailurePolicy>,

    /// 跳过该场景
    #[serde(default)]
    pub skip: bool,

    /// 所属套件（加载时填入）
    #[serde(skip)]
    pub suite: Option<String>,
}

/// fixture 引用：单个名称或名称列表（组成 JSON 数组）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FixtureRef {
    One(String),
    Many(Vec<String>),
}

impl FixtureRef {
    pub fn names(&self) -> Vec<&str> {
        match self {
            FixtureRef::One(name) => vec![name.as_str()],
            FixtureRef::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// 步骤定义
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StepDef {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub method: Method,

    /// URL 模板，相对路径拼接到 base URL
    pub url: String,

    #[serde(default, deserialize_with = "ordered_map")]
    pub headers: Vec<(String, String)>,

    /// 查询参数；数组值展开为重复参数
    #[serde(default, deserialize_with = "ordered_map")]
    pub query: Vec<(String, Value)>,

    #[serde(default)]
    pub fixture: Option<FixtureRef>,

    /// 内联 body 模板；与对象 fixture 同时出现时覆盖其中的键
    #[serde(default)]
    pub body: Option<Value>,

    /// 状态码不在 2xx/3xx 时视为失败
    #[serde(default)]
    pub fail_on_status_code: bool,

    /// 变量名 -> 捕获来源，按声明顺序执行
    #[serde(default, deserialize_with = "ordered_map")]
    pub capture: Vec<(String, String)>,

    #[serde(default, rename = "assert")]
    pub assertions: Vec<Value>,
}

/// 按文档顺序读取 map 为键值对列表
fn ordered_map<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct PairsVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for PairsVisitor<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut pairs = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry()? {
                pairs.push(entry);
            }
            Ok(pairs)
        }
    }

    deserializer.deserialize_map(PairsVisitor(PhantomData))
}
