//! # Lifeline
//!
//! A small database access layer: credentials and driver selection, a
//! prepared-statement executor with typed parameter binding, a fluent query
//! builder with pagination, a table schema catalog that renders CREATE TABLE
//! DDL, and a dirty-tracking ORM on top.
//!
//! ```no_run
//! use lifeline::{params, Database};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::open_sqlite(":memory:")?;
//! db.exec("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", params![], true)?;
//! db.exec("INSERT INTO users (id, name) VALUES (?, ?)", params![7, "Bob"], true)?;
//!
//! let bob = db.query().table("users").find(params! { "id" => 7 }).fetch()?.all()?;
//! assert_eq!(bob[0].get("name").and_then(|v| v.as_str()), Some("Bob"));
//! # Ok(())
//! # }
//! ```
//!
//! Cargo features:
//!
//! - `sqlite` (default): the bundled SQLite driver
//! - `postgres`: the PostgreSQL driver
//! - `metrics`: OpenTelemetry counters and histograms for executed statements
//! - `tracing`: spans around prepare and execute

pub mod value;

pub mod binder;
pub mod config;
pub mod connection;
pub mod dialect;
pub mod driver;
pub mod events;
pub mod executor;
pub mod metrics;
pub mod orm;
pub mod placeholders;
pub mod query;
pub mod query_log;
pub mod result;
pub mod schema;

pub use config::DatabaseConfig;
pub use connection::{ConnectionError, Credentials, DriverKind};
pub use events::{LoggingObserver, QueryObserver};
pub use executor::{Database, QueryError, QueryExecutionFailure};
pub use orm::{Model, OrmError, Record};
pub use query::{Paginated, QueryBuilder};
pub use result::{ExecutedQuery, FetchFailure, ResultCursor};
pub use schema::{Column, Schema, Table};
pub use value::{DataType, ParamKey, Params, Row, Value};
