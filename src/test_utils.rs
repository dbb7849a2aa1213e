/// # Test Utilities Module
///
/// Shared fixtures for the unit tests: isolated in-memory handles with a
/// small sample schema, plus error assertion helpers.

use crate::core::db::DbHandle;

/// Isolated handle over a private in-memory database
pub struct HandleFixture {
    pub db: DbHandle,
}

impl HandleFixture {
    /// Empty database, no active table
    pub fn new() -> Self {
        HandleFixture {
            db: DbHandle::in_memory().expect("in-memory database should open"),
        }
    }

    /// `people (id INTEGER PRIMARY KEY, name TEXT, score REAL)` with three
    /// committed rows: Alice, Bob and one with NULL name and score.
    pub fn with_people() -> Self {
        let fixture = HandleFixture::new();
        let db = &fixture.db;
        db.execute("CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT, score REAL)", &[])
            .expect("create people");
        for (name, score) in [(Some("Alice"), Some(123.45)), (Some("Bob"), Some(678.9)), (None, None)] {
            db.execute_no_commit(
                "INSERT INTO people (name, score) VALUES (?, ?)",
                &[name.into(), score.into()],
            )
            .expect("insert person");
        }
        db.commit().expect("commit people");
        fixture
    }
}

/// Asserts that `$result` is `Err(ArkdbError::$variant(..))`
#[macro_export]
macro_rules! assert_arkdb_error {
    ($result:expr, $variant:ident) => {
        $crate::assert_arkdb_error!($result, $variant, stringify!($result))
    };
    ($result:expr, $variant:ident, $context:expr) => {
        match $result {
            Err($crate::core::ArkdbError::$variant { .. }) => {}
            Ok(_) => panic!("Expected {} error but got Ok in {}", stringify!($variant), $context),
            Err(other) => panic!("Expected {} but got {:?} in {}", stringify!($variant), other, $context),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ArkdbError, Result, Value};

    #[test]
    fn test_people_fixture() {
        let fixture = HandleFixture::with_people();
        let count = fixture.db.fetch_scalar("n", "SELECT COUNT(*) AS n FROM people", &[]).unwrap();
        assert_eq!(count, Some(Value::Integer(3)));
        assert_eq!(fixture.db.table(), "");
    }

    #[test]
    fn test_error_assertion_macro() {
        let result: Result<i32> = Err(ArkdbError::Invariant("counter must grow".to_string()));
        assert_arkdb_error!(result, Invariant, "macro test");

        let result: Result<i32> = Err(ArkdbError::NoActiveTable);
        assert_arkdb_error!(result, NoActiveTable, "unit variant");
    }
}
