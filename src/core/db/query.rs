/// Query Execution Module
///
/// Statement execution for `DbHandle`: the no-commit and committing write
/// paths, and the lazy row stream the read helpers are built on.
///
/// Every execution clears the handle's last error first. A failure is logged,
/// stored in the last-error slot and returned as `ArkdbError::Query`; it never
/// panics, so batch callers decide for themselves whether to stop.

use crate::core::db::handle::DbHandle;
use crate::core::{ArkdbError, QueryError, Result, Row, Value};
use rusqlite::{params_from_iter, CachedStatement, Connection, Rows};
use std::iter::FusedIterator;
use std::sync::Arc;
use tracing::debug;

impl DbHandle {
    /// Clears the last error and hands out the connection for one execution
    /// of `sql`.
    fn begin_execution(&self, sql: &str) -> Result<&Connection> {
        self.clear_error();
        let conn = match self.conn.connection() {
            Ok(conn) => conn,
            Err(e) => {
                let _ = self.record_failure(QueryError::new(e.to_string(), sql));
                return Err(e);
            }
        };
        debug!(sql, kind = ?StatementType::from_sql(sql), "executing statement");
        Ok(conn)
    }

    fn run<'a, T>(&'a self, sql: &str, f: impl FnOnce(&'a Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = self.begin_execution(sql)?;
        f(conn).map_err(|e| self.record_failure(QueryError::from_driver(&e, sql)))
    }

    /// Runs a parameterized statement without committing.
    ///
    /// Statements that produce rows (SELECT, PRAGMA, EXPLAIN, ...) are stepped
    /// to completion and their rows discarded. Only statements that write open
    /// the deferred transaction.
    ///
    /// # Returns
    ///
    /// The number of rows changed, 0 for read-only statements.
    ///
    /// # Errors
    ///
    /// `ArkdbError::Query` on driver failure; the same error is kept as
    /// [`DbHandle::last_error`].
    pub fn execute_no_commit(&self, sql: &str, params: &[Value]) -> Result<usize> {
        self.run(sql, |conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            self.conn.begin_for(&stmt)?;
            if stmt.column_count() == 0 {
                return stmt.execute(params_from_iter(params));
            }
            let readonly = stmt.readonly();
            let mut rows = stmt.query(params_from_iter(params))?;
            while rows.next()?.is_some() {}
            Ok(if readonly { 0 } else { conn.changes() as usize })
        })
    }

    /// Runs a parameterized statement and commits.
    ///
    /// The commit happens even when the statement fails, flushing whatever was
    /// executed earlier in the same transaction.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
        let outcome = self.execute_no_commit(sql, params);
        self.commit()?;
        outcome
    }

    /// Runs an insert-style statement without committing and returns the
    /// rowid of the inserted row.
    pub(crate) fn execute_insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
        self.run(sql, |conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            self.conn.begin_for(&stmt)?;
            stmt.execute(params_from_iter(params))?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Prepares `sql` for streaming.
    ///
    /// The returned cursor can be streamed several times with different
    /// parameters; every stream reissues the query.
    pub fn prepare(&self, sql: &str) -> Result<Cursor<'_>> {
        let stmt = self.run(sql, |conn| conn.prepare_cached(sql))?;
        let columns: Arc<[String]> = stmt.column_names().into_iter().map(String::from).collect();
        Ok(Cursor {
            handle: self,
            stmt,
            sql: sql.to_string(),
            columns,
        })
    }

    /// Executes `sql` and hands a lazy stream over its rows to `f`.
    ///
    /// Rows are fetched one at a time as `f` pulls them. The cursor is
    /// released when `f` returns, whether or not the stream was drained.
    pub fn stream_query<T>(&self, sql: &str, params: &[Value], f: impl FnOnce(RowStream<'_>) -> T) -> Result<T> {
        let mut cursor = self.prepare(sql)?;
        let stream = cursor.stream(params)?;
        Ok(f(stream))
    }

    /// Executes `sql` and collects every row, in result order.
    pub fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let mut cursor = self.prepare(sql)?;
        let rows = cursor.stream(params)?.collect::<Result<Vec<_>>>();
        rows
    }

    /// The first row of the result, or `None` when there is none.
    pub fn fetch_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        let mut cursor = self.prepare(sql)?;
        let row = cursor.stream(params)?.next().transpose();
        row
    }

    /// The named column of the first row.
    ///
    /// `None` when the query returns no row or the row has no such column.
    pub fn fetch_scalar(&self, column: &str, sql: &str, params: &[Value]) -> Result<Option<Value>> {
        Ok(self
            .fetch_one(sql, params)?
            .and_then(|row| row.get(column).cloned()))
    }
}

/// A prepared query bound to its handle.
pub struct Cursor<'h> {
    handle: &'h DbHandle,
    stmt: CachedStatement<'h>,
    sql: String,
    columns: Arc<[String]>,
}

impl<'h> Cursor<'h> {
    /// Result column names, in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Binds `params`, executes the query and returns a stream over its rows.
    pub fn stream(&mut self, params: &[Value]) -> Result<RowStream<'_>> {
        self.handle.clear_error();
        if let Err(e) = self.handle.conn.begin_for(&self.stmt) {
            return Err(self.handle.record_failure(QueryError::from_driver(&e, &self.sql)));
        }
        debug!(sql = %self.sql, "streaming query");

        match self.stmt.query(params_from_iter(params)) {
            Ok(rows) => Ok(RowStream {
                rows,
                columns: Arc::clone(&self.columns),
                handle: self.handle,
                sql: &self.sql,
                exhausted: false,
            }),
            Err(e) => Err(self.handle.record_failure(QueryError::from_driver(&e, &self.sql))),
        }
    }
}

/// A forward-only stream of result rows.
///
/// Each call to `next` steps the underlying cursor by exactly one row. The
/// stream ends after the last row or after the first error, and cannot be
/// rewound; dropping it resets the cursor.
pub struct RowStream<'s> {
    rows: Rows<'s>,
    columns: Arc<[String]>,
    handle: &'s DbHandle,
    sql: &'s str,
    exhausted: bool,
}

impl RowStream<'_> {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// True once the last row has been produced or a fetch failed.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

fn fetch_failure(handle: &DbHandle, sql: &str, err: &rusqlite::Error) -> ArkdbError {
    handle.record_failure(QueryError::from_driver(err, sql))
}

impl Iterator for RowStream<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let fetched = match self.rows.next() {
            Ok(Some(row)) => (0..self.columns.len())
                .map(|i| row.get_ref(i).map(Value::from))
                .collect::<rusqlite::Result<Vec<_>>>()
                .map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };
        match fetched {
            Ok(Some(values)) => Some(Ok(Row::new(Arc::clone(&self.columns), values))),
            Ok(None) => {
                self.exhausted = true;
                None
            }
            Err(e) => {
                self.exhausted = true;
                Some(Err(fetch_failure(self.handle, self.sql, &e)))
            }
        }
    }
}

impl FusedIterator for RowStream<'_> {}

/// Classification of a SQL statement by its leading keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementType {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
    Alter,
    /// BEGIN/COMMIT/ROLLBACK
    Transaction,
    Other,
}

impl StatementType {
    /// Determines the statement type from a SQL string
    pub fn from_sql(sql: &str) -> Self {
        let keyword = sql
            .split_whitespace()
            .next()
            .unwrap_or("")
            .trim_end_matches(';')
            .to_uppercase();

        match keyword.as_str() {
            "SELECT" | "WITH" | "VALUES" => StatementType::Select,
            "INSERT" | "REPLACE" => StatementType::Insert,
            "UPDATE" => StatementType::Update,
            "DELETE" => StatementType::Delete,
            "CREATE" => StatementType::Create,
            "DROP" => StatementType::Drop,
            "ALTER" => StatementType::Alter,
            "BEGIN" | "COMMIT" | "END" | "ROLLBACK" => StatementType::Transaction,
            _ => StatementType::Other,
        }
    }

    /// Whether the statement is expected to produce result rows.
    pub fn returns_rows(self) -> bool {
        self == StatementType::Select
    }
}
