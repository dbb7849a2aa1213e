/// Connection Management Module
///
/// Owns the handle's single database connection, its lifecycle and the
/// deferred-commit transaction it keeps open between commits.

use crate::config::ConnectOptions;
use crate::core::{ArkdbError, Result};
use rusqlite::{Connection, OpenFlags, Statement};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error};

/// Represents database transaction states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    /// Nothing executed since the last commit or rollback
    #[default]
    Autocommit,
    /// Statements have run that are not yet committed
    Pending,
}

/// Connection manager for one handle.
///
/// The connection is opened at construction and closed exactly once, either
/// by [`ConnectionManager::close`] or on drop. Closing twice is a no-op.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Active database connection (None once closed)
    connection: Option<Connection>,
    /// Path to the database file (None for in-memory databases)
    current_path: Option<PathBuf>,
}

impl ConnectionManager {
    /// Opens the database described by `options`.
    ///
    /// # Errors
    ///
    /// Returns `ArkdbError::Connection` if the driver cannot open the database.
    pub fn open(options: &ConnectOptions) -> Result<Self> {
        let current_path = options.database_path();
        let conn = match &current_path {
            None => Connection::open_in_memory(),
            Some(path) => {
                let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
                if options.create_if_missing {
                    flags |= OpenFlags::SQLITE_OPEN_CREATE;
                }
                Connection::open_with_flags(path, flags)
            }
        }
        .map_err(|e| ArkdbError::Connection(format!("failed to open schema {:?}: {}", options.schema, e)))?;

        if let Some(ms) = options.busy_timeout_ms {
            conn.busy_timeout(Duration::from_millis(ms))
                .map_err(|e| ArkdbError::Connection(format!("failed to set busy timeout: {}", e)))?;
        }

        debug!(
            schema = %options.schema,
            path = ?current_path,
            user = %options.user,
            "opened connection"
        );

        Ok(ConnectionManager {
            connection: Some(conn),
            current_path,
        })
    }

    /// The live connection.
    ///
    /// # Errors
    ///
    /// Returns `ArkdbError::Closed` after [`ConnectionManager::close`].
    pub fn connection(&self) -> Result<&Connection> {
        self.connection.as_ref().ok_or(ArkdbError::Closed)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Gets the database file path, `None` for in-memory databases.
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    pub fn transaction_state(&self) -> TransactionState {
        match &self.connection {
            Some(conn) if !conn.is_autocommit() => TransactionState::Pending,
            _ => TransactionState::Autocommit,
        }
    }

    /// Opens the deferred transaction if none is pending.
    pub(crate) fn begin_if_needed(&self) -> rusqlite::Result<()> {
        if let Some(conn) = &self.connection {
            if conn.is_autocommit() {
                conn.execute_batch("BEGIN")?;
            }
        }
        Ok(())
    }

    /// Opens the deferred transaction before `stmt` runs, unless it only reads.
    ///
    /// Reads outside a pending transaction run in autocommit mode, so they
    /// hold no lock once their cursor is reset.
    pub(crate) fn begin_for(&self, stmt: &Statement<'_>) -> rusqlite::Result<()> {
        if stmt.readonly() {
            return Ok(());
        }
        self.begin_if_needed()
    }

    /// Commits every statement executed since the last commit.
    pub fn commit(&self) -> Result<()> {
        let conn = self.connection()?;
        if !conn.is_autocommit() {
            conn.execute_batch("COMMIT")?;
            debug!("committed transaction");
        }
        Ok(())
    }

    /// Discards every statement executed since the last commit.
    pub fn rollback(&self) -> Result<()> {
        let conn = self.connection()?;
        if !conn.is_autocommit() {
            conn.execute_batch("ROLLBACK")?;
            debug!("rolled back transaction");
        }
        Ok(())
    }

    /// Closes the connection. Uncommitted work is rolled back by the driver.
    ///
    /// Calling this on an already closed manager does nothing.
    pub fn close(&mut self) -> Result<()> {
        let Some(conn) = self.connection.take() else {
            return Ok(());
        };
        if !conn.is_autocommit() {
            debug!("closing with uncommitted work, rolling back");
        }
        conn.close().map_err(|(_, e)| ArkdbError::Database(e))?;
        debug!(path = ?self.current_path, "closed connection");
        Ok(())
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("failed to close connection: {}", e);
        }
    }
}
