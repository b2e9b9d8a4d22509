//! Connection Module
//!
//! Driver selection, credentials and DSN construction, and connection
//! establishment for the bundled drivers.
//!
//! - [`DriverKind`] names the SQL dialect a connection speaks
//! - [`Credentials`] validates and renders the DSN
//! - [`connect`] opens a bundled driver from credentials

use crate::driver::{Driver, StatementError};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Supported database drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverKind {
    Mysql,
    Sqlite,
    Pgsql,
}

impl DriverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverKind::Mysql => "mysql",
            DriverKind::Sqlite => "sqlite",
            DriverKind::Pgsql => "pgsql",
        }
    }

    /// Drivers [`connect`] can open in this build.
    pub fn available() -> Vec<DriverKind> {
        let mut kinds = Vec::new();
        #[cfg(feature = "sqlite")]
        kinds.push(DriverKind::Sqlite);
        #[cfg(feature = "postgres")]
        kinds.push(DriverKind::Pgsql);
        kinds
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriverKind {
    type Err = ConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(DriverKind::Mysql),
            "sqlite" => Ok(DriverKind::Sqlite),
            "pgsql" | "postgres" | "postgresql" => Ok(DriverKind::Pgsql),
            other => Err(ConnectionError::InvalidDriver(other.to_string())),
        }
    }
}

/// Connection error type
#[derive(Debug)]
pub enum ConnectionError {
    /// Driver name outside the supported set
    InvalidDriver(String),
    /// DSN requested without a database name
    MissingDatabaseName,
    /// No bundled driver for this kind in this build
    DriverUnavailable(DriverKind),
    /// The driver refused the connection
    Driver(StatementError),
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::InvalidDriver(name) => {
                write!(f, "Invalid database driver or is not supported: {name}")
            }
            ConnectionError::MissingDatabaseName => {
                write!(f, "Cannot get DSN; Database name is not set")
            }
            ConnectionError::DriverUnavailable(kind) => {
                write!(f, "No bundled driver for {kind}; implement Driver and use Database::new")
            }
            ConnectionError::Driver(e) => write!(f, "Connection error: {e}"),
        }
    }
}

impl std::error::Error for ConnectionError {}

impl From<StatementError> for ConnectionError {
    fn from(err: StatementError) -> Self {
        ConnectionError::Driver(err)
    }
}

/// Database credentials.
///
/// `persistent` is carried for callers that pool connections themselves;
/// the bundled drivers ignore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub driver: DriverKind,
    pub dbname: String,
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub persistent: bool,
}

impl Credentials {
    pub fn new(driver: DriverKind, dbname: impl Into<String>) -> Self {
        Self {
            driver,
            dbname: dbname.into(),
            host: "localhost".to_string(),
            port: None,
            username: None,
            password: None,
            persistent: false,
        }
    }

    /// Parse the driver name and build credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::InvalidDriver`] for an unknown driver name.
    pub fn parse(driver: &str, dbname: impl Into<String>) -> Result<Self, ConnectionError> {
        Ok(Self::new(driver.parse()?, dbname))
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn login(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.username = Some(username.into());
        self.password = password;
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// PDO-style DSN: `sqlite:<path>` or `<driver>:host=<h>;[port=<p>;]dbname=<n>;charset=utf8mb4`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::MissingDatabaseName`] when `dbname` is empty.
    pub fn dsn(&self) -> Result<String, ConnectionError> {
        if self.dbname.is_empty() {
            return Err(ConnectionError::MissingDatabaseName);
        }

        Ok(match self.driver {
            DriverKind::Sqlite => format!("sqlite:{}", self.dbname),
            driver => {
                let port = self.port.map(|p| format!("port={p};")).unwrap_or_default();
                format!(
                    "{}:host={};{}dbname={};charset=utf8mb4",
                    driver, self.host, port, self.dbname
                )
            }
        })
    }

    /// Key-value connection string understood by `may_postgres`.
    #[cfg(feature = "postgres")]
    fn postgres_conninfo(&self) -> String {
        let mut parts = vec![format!("host={}", self.host)];
        if let Some(port) = self.port {
            parts.push(format!("port={port}"));
        }
        if let Some(user) = &self.username {
            parts.push(format!("user={user}"));
        }
        if let Some(password) = &self.password {
            parts.push(format!("password={password}"));
        }
        parts.push(format!("dbname={}", self.dbname));
        parts.join(" ")
    }
}

/// Open a bundled driver for `credentials`.
///
/// # Errors
///
/// Returns [`ConnectionError`] when the database name is missing, no bundled
/// driver exists for the requested kind, or the driver fails to connect.
pub fn connect(credentials: &Credentials) -> Result<Box<dyn Driver>, ConnectionError> {
    #[cfg(feature = "tracing")]
    let _span = tracing_helpers::acquire_connection_span(credentials.driver.as_str()).entered();

    let dsn = credentials.dsn()?;
    log::debug!("connecting to {dsn}");

    match credentials.driver {
        #[cfg(feature = "sqlite")]
        DriverKind::Sqlite => Ok(Box::new(crate::driver::sqlite::SqliteDriver::open(
            &credentials.dbname,
        )?)),
        #[cfg(feature = "postgres")]
        DriverKind::Pgsql => Ok(Box::new(crate::driver::postgres::PostgresDriver::connect(
            &credentials.postgres_conninfo(),
        )?)),
        kind => Err(ConnectionError::DriverUnavailable(kind)),
    }
}
