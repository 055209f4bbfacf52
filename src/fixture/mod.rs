/// Fixture 模块 - 按名称提供只读的 JSON 文档
pub mod store;

pub use store::{Fixture, FixtureStore};
