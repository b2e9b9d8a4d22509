//! Query execution.
//!
//! [`Database`] owns one driver connection, its query log and an optional
//! failure observer. Every statement goes through the same synchronous
//! pipeline:
//!
//! 1. prepare the SQL text
//! 2. bind every parameter with its inferred wire type
//! 3. execute and capture success, SQLSTATE and row count
//! 4. append the [`ExecutedQuery`] to the log, failures included
//! 5. with `throw_on_fail`, turn an unsuccessful execution into a
//!    [`QueryExecutionFailure`]
//!
//! Prepare failures and bind errors abort the statement regardless of
//! `throw_on_fail`; they never reach the log because nothing was executed.

use crate::binder::{self, BindTypeError};
use crate::connection::{self, ConnectionError, Credentials, DriverKind};
use crate::driver::{Driver, Statement, StatementError};
use crate::events::QueryObserver;
use crate::query::{BuilderError, QueryBuilder};
use crate::query_log::QueryLog;
use crate::result::{ExecutedQuery, FetchFailure, ResultCursor};
use crate::value::Params;
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

const DEFAULT_FAILURE_MESSAGE: &str = "Failed to execute DB query";

/// A statement could not be executed, or executed unsuccessfully under
/// `throw_on_fail`.
#[derive(Debug, Clone)]
pub struct QueryExecutionFailure {
    pub query: String,
    /// Parameters bound before the failure (positional keys 1-based).
    pub bound: Params,
    pub error: Option<StatementError>,
    pub message: String,
}

impl QueryExecutionFailure {
    /// Message precedence: `message`, then the driver error's text, then a generic default.
    pub fn new(
        query: impl Into<String>,
        bound: Params,
        error: Option<StatementError>,
        message: Option<String>,
    ) -> Self {
        let message = message
            .filter(|m| !m.is_empty())
            .or_else(|| error.as_ref().and_then(|e| e.info.clone()).filter(|m| !m.is_empty()))
            .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
        Self {
            query: query.into(),
            bound,
            error,
            message,
        }
    }
}

impl fmt::Display for QueryExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for QueryExecutionFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Error returned by [`Database`] and [`QueryBuilder`] operations.
#[derive(Debug)]
pub enum QueryError {
    /// A parameter has no wire type
    BindType(BindTypeError),
    /// Statement preparation, binding or execution failed
    Execution(QueryExecutionFailure),
    /// Rows could not be materialized
    Fetch(FetchFailure),
    /// The builder was misused
    Builder(BuilderError),
    /// Connection could not be established
    Connection(ConnectionError),
}

impl QueryError {
    /// The failed execution, when this error carries one.
    pub fn execution(&self) -> Option<&QueryExecutionFailure> {
        match self {
            QueryError::Execution(f) => Some(f),
            _ => None,
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::BindType(e) => write!(f, "{e}"),
            QueryError::Execution(e) => write!(f, "{e}"),
            QueryError::Fetch(e) => write!(f, "{e}"),
            QueryError::Builder(e) => write!(f, "{e}"),
            QueryError::Connection(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueryError::BindType(e) => Some(e),
            QueryError::Execution(e) => Some(e),
            QueryError::Fetch(e) => Some(e),
            QueryError::Builder(e) => Some(e),
            QueryError::Connection(e) => Some(e),
        }
    }
}

impl From<BindTypeError> for QueryError {
    fn from(err: BindTypeError) -> Self {
        QueryError::BindType(err)
    }
}

impl From<QueryExecutionFailure> for QueryError {
    fn from(err: QueryExecutionFailure) -> Self {
        QueryError::Execution(err)
    }
}

impl From<FetchFailure> for QueryError {
    fn from(err: FetchFailure) -> Self {
        QueryError::Fetch(err)
    }
}

impl From<BuilderError> for QueryError {
    fn from(err: BuilderError) -> Self {
        QueryError::Builder(err)
    }
}

impl From<ConnectionError> for QueryError {
    fn from(err: ConnectionError) -> Self {
        QueryError::Connection(err)
    }
}

/// A database connection with its query log.
///
/// Not thread-safe: the log and the driver handle are used from one thread of
/// control at a time. Give each worker its own `Database`.
///
/// # Examples
///
/// ```
/// use lifeline::{params, Database};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let db = Database::open_sqlite(":memory:")?;
/// db.exec("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", params!(), true)?;
/// db.exec("INSERT INTO users (id, name) VALUES (?, ?)", params![7, "Bob"], true)?;
///
/// let rows = db.fetch("SELECT * FROM users WHERE id = :id", params! { "id" => 7 }, true)?.all()?;
/// assert_eq!(rows.len(), 1);
/// assert_eq!(db.queries().count(), 3);
/// # Ok(())
/// # }
/// ```
pub struct Database {
    driver: Box<dyn Driver>,
    credentials: Option<Credentials>,
    log: RefCell<QueryLog>,
    observer: Option<Arc<dyn QueryObserver>>,
}

impl Database {
    /// Wrap an already connected driver.
    pub fn new(driver: Box<dyn Driver>) -> Self {
        Self {
            driver,
            credentials: None,
            log: RefCell::new(QueryLog::new()),
            observer: None,
        }
    }

    /// Connect with a bundled driver.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when the credentials are incomplete or the
    /// driver cannot connect.
    pub fn connect(credentials: Credentials) -> Result<Self, ConnectionError> {
        let driver = connection::connect(&credentials)?;
        let mut db = Self::new(driver);
        db.credentials = Some(credentials);
        Ok(db)
    }

    /// Open a SQLite database file, or `":memory:"`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when the file cannot be opened.
    #[cfg(feature = "sqlite")]
    pub fn open_sqlite(path: &str) -> Result<Self, ConnectionError> {
        Self::connect(Credentials::new(DriverKind::Sqlite, path))
    }

    /// Register the observer notified about failures.
    pub fn with_observer(mut self, observer: Arc<dyn QueryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn observer(&self) -> Option<&Arc<dyn QueryObserver>> {
        self.observer.as_ref()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub fn driver_kind(&self) -> DriverKind {
        self.driver.kind()
    }

    pub fn last_insert_id(&self) -> Option<i64> {
        self.driver.last_insert_id()
    }

    /// A fresh query builder on this connection.
    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }

    /// Snapshot of every statement executed on this connection so far.
    ///
    /// The snapshot is detached from the connection, so statements can keep
    /// running while it is held.
    pub fn queries(&self) -> QueryLog {
        self.log.borrow().clone()
    }

    /// Number of statements in the log.
    pub fn query_count(&self) -> usize {
        self.log.borrow().count()
    }

    /// Empty the log.
    pub fn flush_queries(&self) {
        self.log.borrow_mut().flush();
    }

    /// Execute a statement that returns no rows.
    ///
    /// # Errors
    ///
    /// - [`QueryError::BindType`] when a parameter cannot be bound
    /// - [`QueryError::Execution`] when preparing or binding fails, or when
    ///   `throw_on_fail` is set and the execution was unsuccessful
    pub fn exec(
        &self,
        sql: &str,
        params: impl Into<Params>,
        throw_on_fail: bool,
    ) -> Result<ExecutedQuery, QueryError> {
        let (query, _stmt) = self.run(sql, &params.into(), throw_on_fail)?;
        Ok(query)
    }

    /// Execute a SELECT and return a cursor over its rows.
    ///
    /// # Errors
    ///
    /// Same as [`Database::exec`].
    pub fn fetch(
        &self,
        sql: &str,
        params: impl Into<Params>,
        throw_on_fail: bool,
    ) -> Result<ResultCursor<'_>, QueryError> {
        let (query, stmt) = self.run(sql, &params.into(), throw_on_fail)?;
        Ok(ResultCursor::new(query, stmt))
    }

    fn run(
        &self,
        sql: &str,
        params: &Params,
        throw_on_fail: bool,
    ) -> Result<(ExecutedQuery, Box<dyn Statement + '_>), QueryError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(sql).entered();

        let start = Instant::now();

        let mut stmt = match self.driver.prepare(sql) {
            Ok(stmt) => stmt,
            Err(e) => {
                return Err(self.fail(QueryExecutionFailure::new(sql, Params::new(), Some(e), None)));
            }
        };

        let bound = binder::bind(params)?;
        for (i, param) in bound.iter().enumerate() {
            log::trace!("bind {} = {} ({:?})", param.key, param.value, param.ty);
            if let Err(e) = stmt.bind_value(&param.key, &param.value, param.ty) {
                let sent = binder::bound_params(&bound[..i]);
                return Err(self.fail(QueryExecutionFailure::new(sql, sent, Some(e), None)));
            }
        }

        let executed = ExecutedQuery::execute(stmt.as_mut(), sql, binder::bound_params(&bound));
        self.log.borrow_mut().append(executed.clone());

        #[cfg(feature = "metrics")]
        METRICS.record_query(start.elapsed());
        log::debug!("{sql} -> {} row(s) in {:?}", executed.rows(), start.elapsed());

        if let Some(e) = executed.error() {
            log::warn!("query failed: {sql}: {e}");
            #[cfg(feature = "metrics")]
            METRICS.record_query_error();
        }

        if throw_on_fail && !executed.is_success(false) {
            let failure = QueryExecutionFailure::new(
                sql,
                executed.bound_data().clone(),
                executed.error().cloned(),
                None,
            );
            return Err(self.fail(failure));
        }

        Ok((executed, stmt))
    }

    fn fail(&self, failure: QueryExecutionFailure) -> QueryError {
        if let Some(observer) = &self.observer {
            observer.on_query_exec_fail(&failure);
        }
        QueryError::Execution(failure)
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("driver", &self.driver.kind())
            .field("credentials", &self.credentials)
            .field("queries", &self.log.borrow().count())
            .finish_non_exhaustive()
    }
}
