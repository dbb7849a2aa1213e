/// ArkDB Error Module
///
/// This module defines the error taxonomy for the data-access handle.
/// Connection failures are fatal and surface from the constructor, query
/// failures are captured per call and mirrored into the handle's last-error
/// slot, and guarded preconditions are reported as invariant violations.
use thiserror::Error;

/// A failed statement execution.
///
/// Carries the driver message together with the statement that produced it.
/// Unlike the driver error it is `Clone`, so the same value can be returned
/// to the caller and kept in the handle's last-error slot.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} (statement: {sql})")]
pub struct QueryError {
    /// Message reported by the driver
    pub message: String,
    /// The statement as submitted, before parameter binding
    pub sql: String,
    /// SQLite extended result code, when the driver reported one
    pub code: Option<i32>,
}

impl QueryError {
    pub fn new(message: impl Into<String>, sql: impl Into<String>) -> Self {
        QueryError {
            message: message.into(),
            sql: sql.into(),
            code: None,
        }
    }

    /// Builds a `QueryError` from a driver error raised while running `sql`.
    pub fn from_driver(err: &rusqlite::Error, sql: &str) -> Self {
        let code = match err {
            rusqlite::Error::SqliteFailure(ffi, _) => Some(ffi.extended_code),
            _ => None,
        };
        QueryError {
            message: err.to_string(),
            sql: sql.to_string(),
            code,
        }
    }
}

/// Error type for every fallible operation of the crate.
#[derive(Error, Debug)]
pub enum ArkdbError {
    /// The database could not be opened. Raised only at construction.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A statement failed; also recorded as the handle's last error
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// A guarded precondition did not hold (auto-increment must grow,
    /// table must not pre-exist, ...)
    #[error("Invariant violation: {0}")]
    Invariant(String),

    /// Credential or configuration file errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Raw driver errors outside statement execution
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON rendering errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A record with no writable columns was handed to the codec
    #[error("Record error: {0} has no columns to write")]
    EmptyRecord(&'static str),

    /// A CRUD shorthand was used before `set_table`
    #[error("No active table set")]
    NoActiveTable,

    /// The handle's connection has already been closed
    #[error("Connection is closed")]
    Closed,
}

/// Type alias for Result to use ArkdbError as the error type.
pub type Result<T> = std::result::Result<T, ArkdbError>;
