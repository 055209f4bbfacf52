pub mod assertion;
pub mod error;
pub mod fixture;
pub mod http;
pub mod logger;
pub mod runner;
pub mod scenario;
pub mod variable;

// Re-export commonly used types
pub use error::{ErrorKind, Result, RucheckError};
