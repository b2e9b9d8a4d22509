//! Failure notifications.
//!
//! A [`QueryObserver`] is handed to a [`Database`](crate::Database) at
//! construction and hears about every raised execution failure and every ORM
//! persistence failure. Notifications are best-effort hooks for logging and
//! alerting; they never change control flow.

use crate::executor::QueryExecutionFailure;
use crate::result::ExecutedQuery;

/// Receiver of failure notifications.
pub trait QueryObserver: Send + Sync {
    /// A [`QueryExecutionFailure`] is about to be returned to the caller.
    fn on_query_exec_fail(&self, _failure: &QueryExecutionFailure) {}

    /// An ORM save/insert/update/delete missed its row-count contract.
    fn on_model_query_fail(&self, _query: &ExecutedQuery) {}
}

/// Observer forwarding failures to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl QueryObserver for LoggingObserver {
    fn on_query_exec_fail(&self, failure: &QueryExecutionFailure) {
        log::error!("query failed: {} ({})", failure.query, failure.message);
    }

    fn on_model_query_fail(&self, query: &ExecutedQuery) {
        log::warn!("model query failed: {query}");
    }
}
