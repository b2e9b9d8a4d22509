//! Driver boundary.
//!
//! The executor only ever talks to a database through [`Driver`] and the
//! [`Statement`] handles it prepares. A statement is prepared, bound value by
//! value, executed once, then inspected for its error state, row count and rows.
//!
//! Implementations shipped with the crate:
//!
//! - [`sqlite::SqliteDriver`] over `rusqlite` (feature `sqlite`, on by default)
//! - [`postgres::PostgresDriver`] over `may_postgres` (feature `postgres`)
//!
//! MySQL has no bundled driver; implement [`Driver`] for your client and hand it
//! to [`Database::new`](crate::Database::new).

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use crate::binder::ParamType;
use crate::connection::DriverKind;
use crate::value::{ParamKey, Row, Value};
use std::fmt;

/// SQLSTATE reported by a statement that completed without error.
pub const NO_ERROR_STATE: &str = "00000";

/// Low-level driver error: SQLSTATE, vendor code and message.
///
/// Immutable once built; displays as `[state][code] info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementError {
    pub sql_state: String,
    pub code: Option<String>,
    pub info: Option<String>,
}

impl StatementError {
    pub fn new(sql_state: impl Into<String>, code: Option<String>, info: Option<String>) -> Self {
        Self {
            sql_state: sql_state.into(),
            code,
            info,
        }
    }

    /// General error (`HY000`) with a message and no vendor code.
    pub fn general(info: impl Into<String>) -> Self {
        Self::new("HY000", None, Some(info.into()))
    }

    /// The "no error" state.
    pub fn none() -> Self {
        Self::new(NO_ERROR_STATE, None, None)
    }

    pub fn is_error(&self) -> bool {
        self.sql_state != NO_ERROR_STATE
    }
}

impl fmt::Display for StatementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}][{}] {}",
            self.sql_state,
            self.code.as_deref().unwrap_or(""),
            self.info.as_deref().unwrap_or("")
        )
    }
}

impl std::error::Error for StatementError {}

/// A database connection able to prepare statements.
///
/// Connections are used from one thread of control at a time; nothing here is
/// internally synchronized.
pub trait Driver {
    /// Which SQL dialect this connection speaks.
    fn kind(&self) -> DriverKind;

    /// Prepare `sql` for execution.
    ///
    /// # Errors
    ///
    /// Returns the driver's error when the statement cannot be prepared
    /// (syntax error, unknown table, closed connection, ...).
    fn prepare<'c>(&'c self, sql: &str) -> Result<Box<dyn Statement + 'c>, StatementError>;

    /// Row id generated by the most recent successful INSERT, when the backend tracks one.
    fn last_insert_id(&self) -> Option<i64> {
        None
    }
}

/// A prepared statement handle.
pub trait Statement {
    /// Bind one value. Positional keys are already 1-based here.
    ///
    /// # Errors
    ///
    /// Returns the driver's error when the key does not name a placeholder of
    /// this statement or the value cannot be converted.
    fn bind_value(&mut self, key: &ParamKey, value: &Value, ty: ParamType) -> Result<(), StatementError>;

    /// Run the statement; `false` when the driver reports failure.
    fn execute(&mut self) -> bool;

    /// SQLSTATE of the last operation, [`NO_ERROR_STATE`] on success.
    fn error_code(&self) -> String;

    /// Full error triple of the last operation.
    fn error_info(&self) -> StatementError;

    /// Rows affected (writes) or produced (reads) by the last execution.
    fn row_count(&self) -> u64;

    /// Next result row, `None` once exhausted.
    fn fetch(&mut self) -> Option<Row>;

    /// Every remaining row.
    ///
    /// # Errors
    ///
    /// Returns the driver's error when rows cannot be materialized, e.g. the
    /// statement never executed successfully.
    fn fetch_all(&mut self) -> Result<Vec<Row>, StatementError>;
}
