/// Database Module
///
/// The single-connection data-access handle, split by concern:
/// - **Connection Management** (`connection.rs`): opening, transaction state, teardown
/// - **Handle** (`handle.rs`): the `DbHandle` type, active table and last-error slot
/// - **Query Execution** (`query.rs`): no-commit/committing execution and row streaming
/// - **Record Codec** (`codec.rs`): INSERT/UPDATE/DELETE built from records
/// - **Schema Introspection** (`schema.rs`): catalog questions and DDL helpers
///
/// ## Error Handling
///
/// Statement failures are returned as `ArkdbError::Query` and kept as the
/// handle's last error; only connection failures are fatal.
pub mod codec;
pub mod connection;
pub mod handle;
pub mod query;
pub mod schema;

pub use codec::{encode_delete, encode_insert, encode_update, quote_identifier, SqlStatement};
pub use connection::{ConnectionManager, TransactionState};
pub use handle::DbHandle;
pub use query::{Cursor, RowStream, StatementType};
pub use schema::{ColumnSpec, DiskSize, Index, TableSpec};
