/// Core Module for ArkDB
///
/// The data-access handle and the types it exchanges with callers: errors,
/// values, records and rows.

pub mod db;
pub mod error;
pub mod record;

// Re-export commonly used types for convenience
pub use error::{ArkdbError, QueryError, Result};
pub use record::{Record, Row, Value};
