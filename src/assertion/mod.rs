/// 断言模块 - 编译断言定义并对响应求值
mod evaluator;
mod extractor;
mod parser;
mod path;
mod types;

pub use evaluator::{evaluate, evaluate_assertion};
pub use extractor::extract_value;
pub use parser::{compile, parse_assertion, parse_value_path};
pub use path::{FieldPath, json_eq, type_of};
pub use types::{AssertError, Assertion, AssertionResult, KeysMode, TypeName, ValuePath};
