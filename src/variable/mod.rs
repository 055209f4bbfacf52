/// 变量模块 - 配置、作用域、捕获与占位符替换
pub mod capture;
pub mod config;
pub mod resolver;
pub mod types;

pub use capture::{CaptureDirective, capture};
pub use config::{ConfigLoader, RucheckConfig, RunSettings, parse_duration};
pub use resolver::VariableResolver;
pub use types::{Environment, VariableScope};
