/// Database Handle Module
///
/// `DbHandle` is the single-connection object every operation goes through.
/// Statement execution lives in `query.rs`, record writes in `codec.rs` and
/// catalog questions in `schema.rs`; this file holds construction, the
/// active table and the last-error slot.

use crate::config::{ConnectOptions, Credentials};
use crate::core::db::connection::{ConnectionManager, TransactionState};
use crate::core::{ArkdbError, QueryError, Result};
use std::cell::RefCell;
use std::path::Path;
use tracing::error;

/// A handle bound to one database connection.
///
/// A handle is meant for one thread at a time: it is `Send` but not `Sync`,
/// and callers needing concurrency open one handle per worker.
#[derive(Debug)]
pub struct DbHandle {
    pub(crate) conn: ConnectionManager,
    schema: String,
    table: String,
    last_error: RefCell<Option<QueryError>>,
}

impl DbHandle {
    /// Opens a handle from either a credential file or explicit options.
    ///
    /// # Errors
    ///
    /// `ArkdbError::Config`/`Io` if the credentials cannot be read and
    /// `ArkdbError::Connection` if the database cannot be opened.
    pub fn connect(credentials: impl Into<Credentials>) -> Result<Self> {
        let options = credentials.into().resolve()?;
        let conn = ConnectionManager::open(&options)?;
        Ok(DbHandle {
            conn,
            schema: options.schema,
            table: String::new(),
            last_error: RefCell::new(None),
        })
    }

    pub fn from_credential_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        DbHandle::connect(Credentials::File(path.as_ref().to_path_buf()))
    }

    /// A handle over a fresh private in-memory database.
    pub fn in_memory() -> Result<Self> {
        DbHandle::connect(ConnectOptions::in_memory("main"))
    }

    /// Sets the table the CRUD shorthands operate on.
    pub fn set_table(&mut self, table: impl Into<String>) {
        self.table = table.into();
    }

    /// The active table, empty until [`DbHandle::set_table`] is called.
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// The error recorded by the most recent execution, if it failed.
    pub fn last_error(&self) -> Option<QueryError> {
        self.last_error.borrow().clone()
    }

    pub fn transaction_state(&self) -> TransactionState {
        self.conn.transaction_state()
    }

    pub fn connection_manager(&self) -> &ConnectionManager {
        &self.conn
    }

    /// Commits every statement executed since the last commit.
    pub fn commit(&self) -> Result<()> {
        self.conn.commit().map_err(|e| self.record_driver_error(e, "COMMIT"))
    }

    /// Discards every statement executed since the last commit.
    pub fn rollback(&self) -> Result<()> {
        self.conn.rollback().map_err(|e| self.record_driver_error(e, "ROLLBACK"))
    }

    /// Closes the connection; later operations fail with `ArkdbError::Closed`.
    /// Closing twice is a no-op. Dropping the handle closes it as well.
    pub fn close(&mut self) -> Result<()> {
        self.conn.close()
    }

    pub(crate) fn active_table(&self) -> Result<&str> {
        if self.table.is_empty() {
            Err(ArkdbError::NoActiveTable)
        } else {
            Ok(&self.table)
        }
    }

    /// `table` if given, otherwise the active table.
    pub(crate) fn target_table<'a>(&'a self, table: Option<&'a str>) -> Result<&'a str> {
        match table {
            Some(t) if !t.is_empty() => Ok(t),
            _ => self.active_table(),
        }
    }

    pub(crate) fn clear_error(&self) {
        self.last_error.borrow_mut().take();
    }

    /// Stores `err` as the last error and wraps it for the caller.
    pub(crate) fn record_failure(&self, err: QueryError) -> ArkdbError {
        error!("DB error: {}", err);
        *self.last_error.borrow_mut() = Some(err.clone());
        ArkdbError::Query(err)
    }

    fn record_driver_error(&self, err: ArkdbError, sql: &str) -> ArkdbError {
        match err {
            ArkdbError::Database(e) => self.record_failure(QueryError::from_driver(&e, sql)),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_arkdb_error;

    #[test]
    fn test_active_table() {
        let mut db = DbHandle::in_memory().unwrap();
        assert_eq!(db.table(), "");
        assert_arkdb_error!(db.active_table(), NoActiveTable);

        db.set_table("people");
        assert_eq!(db.table(), "people");
        assert_eq!(db.target_table(None).unwrap(), "people");
        assert_eq!(db.target_table(Some("other")).unwrap(), "other");
        assert_eq!(db.schema(), "main");
    }

    #[test]
    fn test_connect_failure_is_fatal() {
        let options = ConnectOptions::new("/nonexistent/dir", "u", "p", "db");
        assert_arkdb_error!(DbHandle::connect(options), Connection);
    }

    #[test]
    fn test_close_twice() {
        let mut db = DbHandle::in_memory().unwrap();
        db.close().unwrap();
        db.close().unwrap();
        assert_arkdb_error!(db.commit(), Closed);
    }

    #[test]
    fn test_record_failure_overwrites() {
        let db = DbHandle::in_memory().unwrap();
        let _ = db.record_failure(QueryError::new("first", "SELECT 1"));
        let _ = db.record_failure(QueryError::new("second", "SELECT 2"));
        assert_eq!(db.last_error().unwrap().message, "second");

        db.clear_error();
        assert!(db.last_error().is_none());
    }
}
