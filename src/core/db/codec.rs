/// Record Codec Module
///
/// Turns a `Record` into a parameterized INSERT, UPDATE or DELETE. Columns
/// are emitted in the record's sorted order, identifiers are quoted and every
/// value is bound as a parameter, so the same record always produces the same
/// statement text.

use crate::core::db::handle::DbHandle;
use crate::core::{ArkdbError, Record, Result, Value};

/// A statement ready to run: SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Double-quotes an identifier, doubling any embedded quote.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `INSERT INTO <table> (<cols>) VALUES (?, ...)`
///
/// # Errors
///
/// `ArkdbError::EmptyRecord` if the record has no columns.
pub fn encode_insert(table: &str, record: &Record) -> Result<SqlStatement> {
    if record.is_empty() {
        return Err(ArkdbError::EmptyRecord("insert"));
    }
    let columns: Vec<String> = record.columns().map(quote_identifier).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    Ok(SqlStatement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(table),
            columns.join(", "),
            placeholders
        ),
        params: record.iter().map(|(_, v)| v.clone()).collect(),
    })
}

/// `UPDATE <table> SET col = ?, ... WHERE <id_column> = ?`
///
/// The id column is never part of the SET list, even when the record carries
/// a value for it. The id value is bound last.
///
/// # Errors
///
/// `ArkdbError::EmptyRecord` if nothing but the id column is left to set.
pub fn encode_update(table: &str, id_column: &str, id_value: &Value, record: &Record) -> Result<SqlStatement> {
    let (assignments, mut params): (Vec<String>, Vec<Value>) = record
        .iter()
        .filter(|(column, _)| column.as_str() != id_column)
        .map(|(column, value)| (format!("{} = ?", quote_identifier(column)), value.clone()))
        .unzip();
    if assignments.is_empty() {
        return Err(ArkdbError::EmptyRecord("update"));
    }
    params.push(id_value.clone());
    Ok(SqlStatement {
        sql: format!(
            "UPDATE {} SET {} WHERE {} = ?",
            quote_identifier(table),
            assignments.join(", "),
            quote_identifier(id_column)
        ),
        params,
    })
}

/// `DELETE FROM <table> WHERE <id_column> = ?`
pub fn encode_delete(table: &str, id_column: &str, id_value: &Value) -> SqlStatement {
    SqlStatement {
        sql: format!(
            "DELETE FROM {} WHERE {} = ?",
            quote_identifier(table),
            quote_identifier(id_column)
        ),
        params: vec![id_value.clone()],
    }
}

impl DbHandle {
    /// Inserts `record` into the active table without committing.
    ///
    /// # Returns
    ///
    /// The rowid of the new row.
    pub fn insert_no_commit(&self, record: &Record) -> Result<i64> {
        let stmt = encode_insert(self.active_table()?, record)?;
        self.execute_insert(&stmt.sql, &stmt.params)
    }

    /// Inserts `record` into the active table and commits.
    pub fn insert(&self, record: &Record) -> Result<i64> {
        let outcome = self.insert_no_commit(record);
        self.commit()?;
        outcome
    }

    /// Updates the row whose `id_column` equals `id_value`, without committing.
    ///
    /// Returns the number of rows changed.
    pub fn update_no_commit(&self, id_value: impl Into<Value>, id_column: &str, record: &Record) -> Result<usize> {
        let stmt = encode_update(self.active_table()?, id_column, &id_value.into(), record)?;
        self.execute_no_commit(&stmt.sql, &stmt.params)
    }

    pub fn update(&self, id_value: impl Into<Value>, id_column: &str, record: &Record) -> Result<usize> {
        let outcome = self.update_no_commit(id_value, id_column, record);
        self.commit()?;
        outcome
    }

    /// Deletes the row whose `id_column` equals `id_value`, without committing.
    pub fn delete_no_commit(&self, id_value: impl Into<Value>, id_column: &str) -> Result<usize> {
        let stmt = encode_delete(self.active_table()?, id_column, &id_value.into());
        self.execute_no_commit(&stmt.sql, &stmt.params)
    }

    pub fn delete(&self, id_value: impl Into<Value>, id_column: &str) -> Result<usize> {
        let outcome = self.delete_no_commit(id_value, id_column);
        self.commit()?;
        outcome
    }
}
