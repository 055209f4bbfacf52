use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assertion::path::{FieldPath, type_of};

/// 断言定义错误（解析阶段）
#[derive(Debug, thiserror::Error)]
pub enum AssertError {
    #[error("Invalid assertion syntax: {0}")]
    InvalidSyntax(String),

    #[error("Unknown assertion kind: {0}")]
    UnknownKind(String),

    #[error("Assertion '{kind}' is missing field '{field}'")]
    MissingField { kind: String, field: String },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// bodyHasKeys 的比较方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeysMode {
    /// 键集合完全相同
    #[default]
    Exact,
    /// 至少包含给定的键
    AtLeast,
}

/// fieldType 支持的类型名
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    Number,
    Integer,
    String,
    Array,
    Object,
    Boolean,
    Null,
}

impl TypeName {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "number" => Some(Self::Number),
            "integer" | "int" => Some(Self::Integer),
            "string" => Some(Self::String),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            "boolean" | "bool" => Some(Self::Boolean),
            "null" => Some(Self::Null),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Integer => "integer",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }

    /// 类型判定；integer 也算 number，小数部分为 0 的浮点数也算 integer
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Number => value.is_number(),
            Self::Integer => match value {
                Value::Number(n) => {
                    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
                }
                _ => false,
            },
            Self::String => value.is_string(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Boolean => value.is_boolean(),
            Self::Null => value.is_null(),
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 响应信封中的取值位置（用于变量捕获）
#[derive(Debug, Clone, PartialEq)]
pub enum ValuePath {
    /// HTTP 状态码
    Status,
    /// 响应 Header
    Header(String),
    /// JSON Body 路径
    Body(FieldPath),
    /// 响应时间（毫秒）
    ResponseTime,
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValuePath::Status => write!(f, "status"),
            ValuePath::Header(name) => write!(f, "headers.{}", name),
            ValuePath::Body(path) if path.is_root() => write!(f, "body"),
            ValuePath::Body(path) => write!(f, "{}", path),
            ValuePath::ResponseTime => write!(f, "response.time"),
        }
    }
}

/// 已编译的断言（封闭集合）
#[derive(Debug, Clone, PartialEq)]
pub enum Assertion {
    StatusEquals(u16),
    StatusOneOf(Vec<u16>),
    StatusNotEquals(u16),
    BodyHasKeys {
        path: FieldPath,
        keys: Vec<String>,
        mode: KeysMode,
    },
    FieldEquals {
        path: FieldPath,
        value: Value,
    },
    FieldType {
        path: FieldPath,
        type_name: TypeName,
    },
    FieldNotNull {
        path: FieldPath,
    },
    BodyIncludes {
        path: FieldPath,
        value: Value,
    },
    ForEachElement {
        path: FieldPath,
        assertions: Vec<Assertion>,
    },
    HeaderContains {
        name: String,
        substring: String,
    },
}

impl Assertion {
    /// 只作用于 JSON 文档的断言才能出现在 forEachElement 中
    pub fn is_field_assertion(&self) -> bool {
        !matches!(
            self,
            Assertion::StatusEquals(_)
                | Assertion::StatusOneOf(_)
                | Assertion::StatusNotEquals(_)
                | Assertion::HeaderContains { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Assertion::StatusEquals(_) => "statusEquals",
            Assertion::StatusOneOf(_) => "statusOneOf",
            Assertion::StatusNotEquals(_) => "statusNotEquals",
            Assertion::BodyHasKeys { .. } => "bodyHasKeys",
            Assertion::FieldEquals { .. } => "fieldEquals",
            Assertion::FieldType { .. } => "fieldType",
            Assertion::FieldNotNull { .. } => "fieldNotNull",
            Assertion::BodyIncludes { .. } => "bodyIncludes",
            Assertion::ForEachElement { .. } => "forEachElement",
            Assertion::HeaderContains { .. } => "headerContains",
        }
    }
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind();
        match self {
            Assertion::StatusEquals(code) | Assertion::StatusNotEquals(code) => {
                write!(f, "{}({})", kind, code)
            }
            Assertion::StatusOneOf(codes) => {
                let codes: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
                write!(f, "{}([{}])", kind, codes.join(", "))
            }
            Assertion::BodyHasKeys { path, keys, mode } => {
                let mode = match mode {
                    KeysMode::Exact => "exact",
                    KeysMode::AtLeast => "atLeast",
                };
                write!(f, "{}({}, [{}], {})", kind, path, keys.join(", "), mode)
            }
            Assertion::FieldEquals { path, value } | Assertion::BodyIncludes { path, value } => {
                write!(f, "{}({}, {})", kind, path, value)
            }
            Assertion::FieldType { path, type_name } => {
                write!(f, "{}({}, {})", kind, path, type_name)
            }
            Assertion::FieldNotNull { path } => write!(f, "{}({})", kind, path),
            Assertion::ForEachElement { path, assertions } => {
                let subs: Vec<String> = assertions.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({}, [{}])", kind, path, subs.join(", "))
            }
            Assertion::HeaderContains { name, substring } => {
                write!(f, "{}({}, \"{}\")", kind, name, substring)
            }
        }
    }
}

/// 断言结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResult {
    /// 所属步骤序号（从 0 开始）
    pub step_index: usize,

    /// 所属步骤名称
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,

    /// 断言描述
    pub description: String,

    /// 是否通过
    pub passed: bool,

    /// 实际值
    pub actual: Value,

    /// 期望值
    pub expected: Value,

    /// forEachElement 中的元素下标
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_index: Option<usize>,

    /// 失败消息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AssertionResult {
    /// 创建成功的断言结果
    pub fn success(description: String, actual: Value, expected: Value) -> Self {
        Self {
            step_index: 0,
            step_name: None,
            description,
            passed: true,
            actual,
            expected,
            element_index: None,
            message: None,
        }
    }

    /// 创建失败的断言结果
    pub fn failure(description: String, actual: Value, expected: Value, message: String) -> Self {
        Self {
            passed: false,
            message: Some(message),
            ..Self::success(description, actual, expected)
        }
    }

    pub fn at_element(mut self, index: usize) -> Self {
        self.element_index = Some(index);
        self
    }

    /// 标记所属步骤
    pub fn for_step(mut self, index: usize, name: Option<&str>) -> Self {
        self.step_index = index;
        self.step_name = name.map(str::to_string);
        self
    }
}

/// 用于失败消息的值描述
pub(crate) fn describe(value: Option<&Value>) -> String {
    match value {
        Some(v) => format!("{} ({})", v, type_of(v)),
        None => "<missing>".to_string(),
    }
}
