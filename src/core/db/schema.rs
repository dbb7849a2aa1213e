/// Schema Introspection Module
///
/// Catalog questions and DDL helpers for `DbHandle`: table existence,
/// index listing and idempotent add/remove, the auto-increment counter,
/// on-disk size and table creation. Everything here is built on the
/// statement executor, so failures land in the handle's last-error slot.

use crate::core::db::codec::quote_identifier;
use crate::core::db::handle::DbHandle;
use crate::core::{ArkdbError, Result, Value};
use tracing::{info, warn};

/// Represents a database index
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    /// Index name
    pub name: String,
    /// Whether this is a UNIQUE index
    pub unique: bool,
    /// How the index came to be: `c` (CREATE INDEX), `u` (UNIQUE) or `pk`
    pub origin: String,
    /// Column names that make up this index
    pub columns: Vec<String>,
}

impl Index {
    pub fn covers(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Indexes backing a UNIQUE or PRIMARY KEY constraint cannot be dropped.
    pub fn is_constraint(&self) -> bool {
        self.origin != "c"
    }
}

/// One column of a [`TableSpec`].
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: String,
    /// Extra column constraints, e.g. `NOT NULL DEFAULT 0`
    pub constraints: String,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        ColumnSpec {
            name: name.into(),
            sql_type: sql_type.into(),
            constraints: String::new(),
        }
    }

    pub fn constraints(mut self, constraints: impl Into<String>) -> Self {
        self.constraints = constraints.into();
        self
    }
}

/// Description of a table for [`DbHandle::create_table`].
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub primary_key: Vec<String>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        TableSpec {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// The single `CREATE TABLE` statement for this spec.
    pub fn to_sql(&self) -> Result<String> {
        if self.columns.is_empty() {
            return Err(ArkdbError::Invariant(format!("table {} needs at least one column", self.name)));
        }
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let mut def = format!("{} {}", quote_identifier(&c.name), c.sql_type);
                if !c.constraints.trim().is_empty() {
                    def.push(' ');
                    def.push_str(c.constraints.trim());
                }
                def
            })
            .collect();
        if !self.primary_key.is_empty() {
            let pk: Vec<String> = self.primary_key.iter().map(|c| quote_identifier(c)).collect();
            parts.push(format!("PRIMARY KEY ({})", pk.join(", ")));
        }
        Ok(format!("CREATE TABLE {} ({})", quote_identifier(&self.name), parts.join(", ")))
    }
}

/// On-disk size of a table in megabytes, rounded to two decimals.
///
/// Either part is `None` when the catalog has nothing for the table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskSize {
    pub data_mb: Option<f64>,
    pub index_mb: Option<f64>,
}

const TABLE_LIKE_SQL: &str = "SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE ?";
const TABLE_DDL_SQL: &str = "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?";
const INDEX_LIST_SQL: &str = r#"SELECT name, "unique", origin FROM pragma_index_list(?) ORDER BY seq"#;
const INDEX_INFO_SQL: &str = "SELECT name FROM pragma_index_info(?) ORDER BY seqno";
const SEQUENCE_SQL: &str = "SELECT seq FROM sqlite_sequence WHERE name = ?";
const DATA_SIZE_SQL: &str = "SELECT ROUND(SUM(pgsize) / 1048576.0, 2) AS size_in_mb FROM dbstat WHERE name = ?";
const INDEX_SIZE_SQL: &str = "SELECT ROUND(TOTAL(d.pgsize) / 1048576.0, 2) AS size_in_mb \
     FROM dbstat d JOIN sqlite_master m ON m.name = d.name \
     WHERE m.type = 'index' AND m.tbl_name = ?";

/// Whether the `CREATE TABLE` text uses the AUTOINCREMENT keyword.
///
/// Quoted identifiers, string literals and comments are skipped, and only a
/// whole word matches, so a column named `autoincrement_note` does not count.
fn declares_autoincrement(ddl: &str) -> bool {
    let mut chars = ddl.chars().peekable();
    let mut word = String::new();
    while let Some(c) = chars.next() {
        if c.is_alphanumeric() || c == '_' {
            word.push(c);
            continue;
        }
        if word.eq_ignore_ascii_case("AUTOINCREMENT") {
            return true;
        }
        word.clear();
        let close = match c {
            '\'' | '"' | '`' => c,
            '[' => ']',
            '-' if chars.peek() == Some(&'-') => '\n',
            _ => continue,
        };
        // A doubled quote closes and immediately reopens the literal
        for inner in chars.by_ref() {
            if inner == close {
                break;
            }
        }
    }
    word.eq_ignore_ascii_case("AUTOINCREMENT")
}

impl DbHandle {
    /// Whether any table matches the `LIKE` pattern `pattern`.
    pub fn table_exists(&self, pattern: &str) -> Result<bool> {
        Ok(!self.fetch_all(TABLE_LIKE_SQL, &[Value::from(pattern)])?.is_empty())
    }

    /// The `CREATE TABLE` text of `table`, `None` if there is no such table.
    fn table_ddl(&self, table: &str) -> Result<Option<String>> {
        Ok(self
            .fetch_scalar("sql", TABLE_DDL_SQL, &[Value::from(table)])?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    /// Indexes of `table` (default: the active table), in catalog order.
    pub fn list_indexes(&self, table: Option<&str>) -> Result<Vec<Index>> {
        let table = self.target_table(table)?;
        let listed = self.fetch_all(INDEX_LIST_SQL, &[Value::from(table)])?;

        let mut indexes = Vec::with_capacity(listed.len());
        for row in listed {
            let name = row.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
            let columns = self
                .fetch_all(INDEX_INFO_SQL, &[Value::from(name.as_str())])?
                .iter()
                .filter_map(|r| r.get("name").and_then(Value::as_str).map(str::to_string))
                .collect();
            indexes.push(Index {
                unique: row.get("unique").and_then(Value::as_i64).unwrap_or(0) != 0,
                origin: row.get("origin").and_then(Value::as_str).unwrap_or("c").to_string(),
                name,
                columns,
            });
        }
        Ok(indexes)
    }

    /// Adds an index on `column` unless one already covers it.
    ///
    /// Returns `true` if an index was created, `false` if one already existed.
    pub fn add_index(&self, column: &str, table: Option<&str>) -> Result<bool> {
        let table = self.target_table(table)?;
        if self.list_indexes(Some(table))?.iter().any(|i| i.covers(column)) {
            info!("Index {} already exists in table {}", column, table);
            return Ok(false);
        }
        let sql = format!(
            "CREATE INDEX {} ON {} ({})",
            quote_identifier(&format!("idx_{}_{}", table, column)),
            quote_identifier(table),
            quote_identifier(column)
        );
        self.execute(&sql, &[])?;
        info!("Added index {} for table {}", column, table);
        Ok(true)
    }

    /// Drops the index covering `column`, if there is one.
    ///
    /// Returns `true` if an index was dropped, `false` if none covered the
    /// column. Indexes created with CREATE INDEX are preferred over ones
    /// backing a constraint.
    pub fn remove_index(&self, column: &str, table: Option<&str>) -> Result<bool> {
        let table = self.target_table(table)?;
        let indexes = self.list_indexes(Some(table))?;
        let target = indexes
            .iter()
            .filter(|i| i.covers(column))
            .min_by_key(|i| i.is_constraint());
        let Some(index) = target else {
            info!("Index {} does not exist in table {}", column, table);
            return Ok(false);
        };
        self.execute(&format!("DROP INDEX {}", quote_identifier(&index.name)), &[])?;
        info!("Removed index {} for table {}", column, table);
        Ok(true)
    }

    /// The next value the active table's auto-increment counter will hand out.
    ///
    /// `None` when the table does not exist or was not declared AUTOINCREMENT.
    pub fn get_auto_increment(&self) -> Result<Option<i64>> {
        let table = self.active_table()?;
        let Some(ddl) = self.table_ddl(table)? else {
            return Ok(None);
        };
        if !declares_autoincrement(&ddl) {
            return Ok(None);
        }
        let seq = self.fetch_scalar("seq", SEQUENCE_SQL, &[Value::from(table)])?;
        Ok(Some(seq.and_then(|v| v.as_i64()).unwrap_or(0) + 1))
    }

    /// Moves the active table's auto-increment counter forward to `next`.
    ///
    /// # Errors
    ///
    /// `ArkdbError::Invariant` if the table has no counter or `next` is not
    /// strictly greater than the current value; the counter is left as is.
    pub fn set_auto_increment(&self, next: i64) -> Result<()> {
        let table = self.active_table()?;
        let Some(current) = self.get_auto_increment()? else {
            warn!("Table {} has no auto-increment counter", table);
            return Err(ArkdbError::Invariant(format!("table {} has no auto-increment counter", table)));
        };
        if current >= next {
            warn!("Current value {} is larger than {}", current, next);
            return Err(ArkdbError::Invariant(format!(
                "auto-increment of {} is {}, new value {} must be larger",
                table, current, next
            )));
        }

        let params = [Value::from(next - 1), Value::from(table)];
        let updated = self.execute_no_commit("UPDATE sqlite_sequence SET seq = ? WHERE name = ?", &params)?;
        if updated == 0 {
            self.execute_no_commit("INSERT INTO sqlite_sequence (seq, name) VALUES (?, ?)", &params)?;
        }
        self.commit()
    }

    /// Refreshes the planner statistics of `table` (default: the active table).
    pub fn optimize_table(&self, table: Option<&str>) -> Result<()> {
        let table = self.target_table(table)?;
        self.execute(&format!("ANALYZE {}", quote_identifier(table)), &[])?;
        Ok(())
    }

    /// Data and index size of `table` (default: the active table).
    pub fn get_table_disk_size(&self, table: Option<&str>) -> Result<DiskSize> {
        let table = self.target_table(table)?;
        if self.table_ddl(table)?.is_none() {
            return Ok(DiskSize {
                data_mb: None,
                index_mb: None,
            });
        }
        let params = [Value::from(table)];
        let data_mb = self.fetch_scalar("size_in_mb", DATA_SIZE_SQL, &params)?;
        let index_mb = self.fetch_scalar("size_in_mb", INDEX_SIZE_SQL, &params)?;
        Ok(DiskSize {
            data_mb: data_mb.and_then(|v| v.as_f64()),
            index_mb: index_mb.and_then(|v| v.as_f64()),
        })
    }

    /// Creates the table described by `spec`.
    ///
    /// An existing table is an error unless `force` is set, in which case it
    /// is dropped and recreated. Drop and create run inside a savepoint: if
    /// either fails, both are undone and any no-commit work executed before
    /// stays pending. On success everything pending is committed.
    pub fn create_table(&self, spec: &TableSpec, force: bool) -> Result<()> {
        let create_sql = spec.to_sql()?;
        let exists = self.table_ddl(&spec.name)?.is_some();
        if exists && !force {
            warn!("Table {} already exists", spec.name);
            return Err(ArkdbError::Invariant(format!("table {} already exists", spec.name)));
        }

        self.savepoint("SAVEPOINT create_table")?;
        let outcome = if exists {
            self.execute_no_commit(&format!("DROP TABLE {}", quote_identifier(&spec.name)), &[])
                .and_then(|_| self.execute_no_commit(&create_sql, &[]))
        } else {
            self.execute_no_commit(&create_sql, &[])
        };
        if let Err(e) = outcome {
            self.savepoint("ROLLBACK TO create_table; RELEASE create_table")?;
            return Err(e);
        }
        self.savepoint("RELEASE create_table")?;
        self.commit()?;
        info!("Created table {}", spec.name);
        Ok(())
    }

    /// Runs savepoint bookkeeping without touching the last-error slot.
    fn savepoint(&self, sql: &str) -> Result<()> {
        self.conn.connection()?.execute_batch(sql)?;
        Ok(())
    }
}
