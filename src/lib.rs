//! ArkDB: a single-connection data-access handle.
//!
//! One [`DbHandle`] owns one database connection and offers parameterized
//! execution with deferred commits, lazy row streaming, record-based
//! insert/update/delete against an active table, and a few catalog helpers.
//!
//! ```no_run
//! use arkdb::{record, DbHandle, Value};
//!
//! # fn main() -> arkdb::Result<()> {
//! let mut db = DbHandle::from_credential_file("db_config.txt")?;
//! db.set_table("people");
//! let id = db.insert(&record! { "name" => "Alice", "age" => 30 })?;
//! let row = db.fetch_one("SELECT * FROM people WHERE id = ?", &[Value::from(id)])?;
//! # Ok(())
//! # }
//! ```

// Core infrastructure modules
pub mod config;
pub mod core;

#[cfg(test)]
mod test_utils;

pub use crate::config::{ConnectOptions, Credentials};
pub use crate::core::db::{
    ColumnSpec, Cursor, DbHandle, DiskSize, Index, RowStream, SqlStatement, TableSpec, TransactionState,
};
pub use crate::core::{ArkdbError, QueryError, Record, Result, Row, Value};
