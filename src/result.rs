//! Execution results.
//!
//! [`ExecutedQuery`] is the immutable record of one statement execution.
//! [`ResultCursor`] wraps it together with the live statement handle so the
//! rows of a SELECT can be read one at a time or all at once.

use crate::driver::{Statement, StatementError, NO_ERROR_STATE};
use crate::value::{Params, Row};
use std::fmt;

/// Outcome of executing one bound statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedQuery {
    query: String,
    bound: Params,
    rows: u64,
    error: Option<StatementError>,
}

impl ExecutedQuery {
    /// Execute `stmt` and capture its outcome.
    ///
    /// A driver that reports success with a SQLSTATE other than `00000` is
    /// still recorded as failed.
    pub(crate) fn execute(stmt: &mut dyn Statement, query: &str, bound: Params) -> Self {
        let ok = stmt.execute();
        let error = if !ok || stmt.error_code() != NO_ERROR_STATE {
            Some(stmt.error_info())
        } else {
            None
        };
        Self {
            query: query.to_string(),
            bound,
            rows: stmt.row_count(),
            error,
        }
    }

    pub fn new(query: impl Into<String>, bound: Params, rows: u64, error: Option<StatementError>) -> Self {
        Self {
            query: query.into(),
            bound,
            rows,
            error,
        }
    }

    pub fn query_string(&self) -> &str {
        &self.query
    }

    /// Parameters exactly as they were bound (positional keys 1-based).
    pub fn bound_data(&self) -> &Params {
        &self.bound
    }

    /// Rows affected (writes) or matched (reads).
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn error(&self) -> Option<&StatementError> {
        self.error.as_ref()
    }

    /// No error, and at least one row when `expect_positive_row_count` is set.
    pub fn is_success(&self, expect_positive_row_count: bool) -> bool {
        self.error.is_none() && self.rows >= u64::from(expect_positive_row_count)
    }
}

impl fmt::Display for ExecutedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(e) => write!(f, "{} -> {e}", self.query),
            None => write!(f, "{} -> {} row(s)", self.query, self.rows),
        }
    }
}

/// Row materialization failed after a successful execution.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub query: ExecutedQuery,
    pub message: String,
    pub source: Option<StatementError>,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FetchFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Sequential reader over an executed SELECT.
pub struct ResultCursor<'c> {
    query: ExecutedQuery,
    stmt: Box<dyn Statement + 'c>,
}

impl<'c> ResultCursor<'c> {
    pub(crate) fn new(query: ExecutedQuery, stmt: Box<dyn Statement + 'c>) -> Self {
        Self { query, stmt }
    }

    /// Row count reported at execution. Not `count()`: that name belongs to
    /// [`Iterator::count`], which drains the cursor.
    pub fn row_count(&self) -> u64 {
        self.query.rows()
    }

    /// Alias of [`ResultCursor::next_row`].
    pub fn row(&mut self) -> Option<Row> {
        self.next_row()
    }

    /// Next row, `None` once exhausted.
    pub fn next_row(&mut self) -> Option<Row> {
        self.stmt.fetch()
    }

    /// Every remaining row.
    ///
    /// # Errors
    ///
    /// Returns [`FetchFailure`] when the driver cannot materialize the rows.
    pub fn all(&mut self) -> Result<Vec<Row>, FetchFailure> {
        self.stmt.fetch_all().map_err(|e| FetchFailure {
            query: self.query.clone(),
            message: "Failed to fetch rows from executed query".to_string(),
            source: Some(e),
        })
    }

    pub fn query(&self) -> &ExecutedQuery {
        &self.query
    }

    pub fn into_query(self) -> ExecutedQuery {
        self.query
    }
}

impl Iterator for ResultCursor<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.next_row()
    }
}

impl fmt::Debug for ResultCursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCursor").field("query", &self.query).finish_non_exhaustive()
    }
}
