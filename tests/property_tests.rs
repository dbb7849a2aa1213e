//! Property-based tests for the record codec
//!
//! These tests verify that statement generation is a pure function of the
//! record's contents:
//! - Column order never depends on insertion order
//! - The id column is never part of an UPDATE's SET list
//! - Placeholder and parameter counts always agree

#[cfg(test)]
mod tests {
    use arkdb::core::db::{encode_delete, encode_insert, encode_update};
    use arkdb::{DbHandle, Record, Value};
    use proptest::prelude::*;

    fn arb_column_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,15}".prop_map(|s: String| s)
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<i64>().prop_map(Value::Integer),
            (-1.0e6f64..1.0e6f64).prop_map(Value::Real),
            "[ -~]{0,20}".prop_map(Value::Text),
        ]
    }

    fn arb_fields() -> impl Strategy<Value = Vec<(String, Value)>> {
        prop::collection::vec((arb_column_name(), arb_value()), 1..12)
    }

    fn placeholders(sql: &str) -> usize {
        sql.matches('?').count()
    }

    proptest! {
        #[test]
        fn insert_is_independent_of_insertion_order(fields in arb_fields()) {
            let forward: Record = fields.iter().cloned().collect();
            let backward: Record = fields.iter().rev().cloned().collect();
            // Duplicate names collapse to one column whichever value wins
            let mut unique = fields.clone();
            unique.sort_by(|a, b| a.0.cmp(&b.0));
            unique.dedup_by(|a, b| a.0 == b.0);
            let canonical: Record = unique.into_iter().collect();

            let a = encode_insert("t", &forward).unwrap();
            let b = encode_insert("t", &backward).unwrap();
            let c = encode_insert("t", &canonical).unwrap();
            prop_assert_eq!(&a.sql, &b.sql);
            prop_assert_eq!(&a.sql, &c.sql);
            prop_assert_eq!(placeholders(&a.sql), a.params.len());
            prop_assert_eq!(a.params.len(), forward.len());
        }

        #[test]
        fn update_never_sets_the_id_column(fields in arb_fields(), id in any::<i64>()) {
            let mut record: Record = fields.into_iter().collect();
            let id_column = record.columns().next().unwrap().to_string();
            record.insert("Extra", 1);

            let stmt = encode_update("t", &id_column, &Value::Integer(id), &record).unwrap();
            let set_clause = stmt.sql.split(" WHERE ").next().unwrap();
            let quoted_id = format!("\"{}\" = ?", id_column);
            prop_assert!(!set_clause.contains(&quoted_id));
            prop_assert_eq!(placeholders(&stmt.sql), stmt.params.len());
            prop_assert_eq!(stmt.params.len(), record.len());
            prop_assert_eq!(stmt.params.last(), Some(&Value::Integer(id)));
        }

        #[test]
        fn delete_binds_only_the_id(id in arb_value()) {
            let stmt = encode_delete("t", "id", &id);
            prop_assert_eq!(placeholders(&stmt.sql), 1);
            prop_assert_eq!(stmt.params, vec![id]);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn inserted_rows_read_back(values in prop::collection::vec((any::<i64>(), "[a-z]{0,10}"), 1..20)) {
            let mut db = DbHandle::in_memory().unwrap();
            db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, n INTEGER, s TEXT)", &[]).unwrap();
            db.set_table("t");

            for (n, s) in &values {
                let rec: Record = [("n", Value::from(*n)), ("s", Value::from(s.as_str()))].into_iter().collect();
                let id = db.insert_no_commit(&rec).unwrap();
                let row = db.fetch_one("SELECT n, s FROM t WHERE id = ?", &[Value::from(id)]).unwrap().unwrap();
                prop_assert_eq!(row.into_record(), rec);
            }
            db.commit().unwrap();

            let count = db.stream_query("SELECT id FROM t", &[], |rows| rows.count()).unwrap();
            prop_assert_eq!(count, values.len());
        }
    }
}
