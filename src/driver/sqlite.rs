//! SQLite driver over `rusqlite`.
//!
//! Statements that produce columns are stepped to completion inside
//! [`Statement::execute`] and their rows buffered, so the row count of a SELECT
//! is known right after execution and the cursor never outlives a live step.

use super::{Driver, NO_ERROR_STATE, Statement, StatementError};
use crate::binder::ParamType;
use crate::connection::DriverKind;
use crate::value::{ParamKey, Row, Value};
use rusqlite::types::{Null, ValueRef};
use rusqlite::{Connection, ErrorCode};
use std::collections::VecDeque;
use std::path::Path;

/// SQLite connection.
pub struct SqliteDriver {
    conn: Connection,
}

impl SqliteDriver {
    /// Open (or create) a database file. `":memory:"` opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns the SQLite error when the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StatementError> {
        let conn = Connection::open(path).map_err(|e| statement_error(&e))?;
        Ok(Self { conn })
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns the SQLite error when the database cannot be created.
    pub fn open_in_memory() -> Result<Self, StatementError> {
        let conn = Connection::open_in_memory().map_err(|e| statement_error(&e))?;
        Ok(Self { conn })
    }

    /// Wrap an already configured connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Driver for SqliteDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Sqlite
    }

    fn prepare<'c>(&'c self, sql: &str) -> Result<Box<dyn Statement + 'c>, StatementError> {
        let stmt = self.conn.prepare(sql).map_err(|e| statement_error(&e))?;
        Ok(Box::new(SqliteStatement {
            stmt,
            rows: VecDeque::new(),
            row_count: 0,
            error: None,
            executed: false,
        }))
    }

    fn last_insert_id(&self) -> Option<i64> {
        Some(self.conn.last_insert_rowid())
    }
}

struct SqliteStatement<'c> {
    stmt: rusqlite::Statement<'c>,
    rows: VecDeque<Row>,
    row_count: u64,
    error: Option<StatementError>,
    executed: bool,
}

impl SqliteStatement<'_> {
    fn parameter_index(&self, key: &ParamKey) -> Result<usize, StatementError> {
        match key {
            ParamKey::Index(i) => Ok(*i),
            ParamKey::Name(name) => {
                for prefix in [":", "@", "$"] {
                    let index = self
                        .stmt
                        .parameter_index(&format!("{prefix}{name}"))
                        .map_err(|e| statement_error(&e))?;
                    if let Some(index) = index {
                        return Ok(index);
                    }
                }
                Err(StatementError::new(
                    "HY093",
                    None,
                    Some(format!("Invalid parameter number: parameter :{name} was not defined")),
                ))
            }
        }
    }

    fn run(&mut self) -> Result<(), rusqlite::Error> {
        if self.stmt.column_count() == 0 {
            let changed = self.stmt.raw_execute()?;
            self.row_count = changed as u64;
            return Ok(());
        }

        let names: Vec<String> = self
            .stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut buffered = VecDeque::new();
        {
            let mut rows = self.stmt.raw_query();
            while let Some(row) = rows.next()? {
                let mut out = Row::new();
                for (i, name) in names.iter().enumerate() {
                    out.columns.push((name.clone(), from_value_ref(row.get_ref(i)?)));
                }
                buffered.push_back(out);
            }
        }
        self.row_count = buffered.len() as u64;
        self.rows = buffered;
        Ok(())
    }
}

impl Statement for SqliteStatement<'_> {
    fn bind_value(&mut self, key: &ParamKey, value: &Value, ty: ParamType) -> Result<(), StatementError> {
        let index = self.parameter_index(key)?;
        let bound = match (ty, value) {
            (ParamType::Null, _) => self.stmt.raw_bind_parameter(index, Null),
            (ParamType::Bool, Value::Bool(b)) => self.stmt.raw_bind_parameter(index, *b),
            (ParamType::Int, Value::Int(i)) => self.stmt.raw_bind_parameter(index, *i),
            (_, Value::Float(f)) => self.stmt.raw_bind_parameter(index, *f),
            (_, Value::Text(s)) => self.stmt.raw_bind_parameter(index, s.as_str()),
            (_, Value::Blob(b)) => self.stmt.raw_bind_parameter(index, b.as_slice()),
            (_, other) => {
                return Err(StatementError::general(format!(
                    "Cannot bind {} as {ty:?}",
                    other.type_name()
                )))
            }
        };
        bound.map_err(|e| statement_error(&e))
    }

    fn execute(&mut self) -> bool {
        self.executed = true;
        match self.run() {
            Ok(()) => {
                self.error = None;
                true
            }
            Err(e) => {
                log::debug!("sqlite statement failed: {e}");
                self.rows.clear();
                self.row_count = 0;
                self.error = Some(statement_error(&e));
                false
            }
        }
    }

    fn error_code(&self) -> String {
        self.error
            .as_ref()
            .map_or_else(|| NO_ERROR_STATE.to_string(), |e| e.sql_state.clone())
    }

    fn error_info(&self) -> StatementError {
        self.error.clone().unwrap_or_else(StatementError::none)
    }

    fn row_count(&self) -> u64 {
        self.row_count
    }

    fn fetch(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }

    fn fetch_all(&mut self) -> Result<Vec<Row>, StatementError> {
        if !self.executed {
            return Err(StatementError::general("Statement has not been executed"));
        }
        Ok(self.rows.drain(..).collect())
    }
}

fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

/// Map a rusqlite error onto the SQLSTATE triple. Constraint violations report
/// `23000`, every other SQLite failure the general `HY000`.
fn statement_error(err: &rusqlite::Error) -> StatementError {
    match err {
        rusqlite::Error::SqliteFailure(failure, message) => {
            let state = if failure.code == ErrorCode::ConstraintViolation {
                "23000"
            } else {
                "HY000"
            };
            StatementError::new(
                state,
                Some(failure.extended_code.to_string()),
                Some(message.clone().unwrap_or_else(|| failure.to_string())),
            )
        }
        other => StatementError::general(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> SqliteDriver {
        let driver = SqliteDriver::open_in_memory().unwrap();
        driver
            .connection()
            .execute_batch(
                "CREATE TABLE items (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE, price REAL);",
            )
            .unwrap();
        driver
    }

    #[test]
    fn test_named_and_positional_binding() {
        let driver = driver();
        let mut insert = driver
            .prepare("INSERT INTO items (name, price) VALUES (:name, :price)")
            .unwrap();
        insert
            .bind_value(&ParamKey::name("name"), &Value::from("apple"), ParamType::Str)
            .unwrap();
        insert
            .bind_value(&ParamKey::name("price"), &Value::Float(1.5), ParamType::Str)
            .unwrap();
        assert!(insert.execute());
        assert_eq!(insert.row_count(), 1);
        assert_eq!(insert.error_code(), NO_ERROR_STATE);
        assert_eq!(driver.last_insert_id(), Some(1));

        let mut select = driver.prepare("SELECT id, name, price FROM items WHERE id = ?").unwrap();
        select.bind_value(&ParamKey::Index(1), &Value::Int(1), ParamType::Int).unwrap();
        assert!(select.execute());
        assert_eq!(select.row_count(), 1);
        let row = select.fetch().unwrap();
        assert_eq!(row.get("name"), Some(&Value::from("apple")));
        assert_eq!(row.get("price"), Some(&Value::Float(1.5)));
        assert!(select.fetch().is_none());
    }

    #[test]
    fn test_unknown_named_parameter() {
        let driver = driver();
        let mut stmt = driver.prepare("SELECT * FROM items WHERE name = :name").unwrap();
        let err = stmt
            .bind_value(&ParamKey::name("nope"), &Value::from("x"), ParamType::Str)
            .unwrap_err();
        assert_eq!(err.sql_state, "HY093");
    }

    #[test]
    fn test_constraint_violation_state() {
        let driver = driver();
        driver
            .connection()
            .execute("INSERT INTO items (name) VALUES ('dup')", [])
            .unwrap();
        let mut stmt = driver.prepare("INSERT INTO items (name) VALUES ('dup')").unwrap();
        assert!(!stmt.execute());
        assert_eq!(stmt.error_code(), "23000");
        assert!(stmt.error_info().info.unwrap().contains("UNIQUE"));
    }

    #[test]
    fn test_prepare_failure() {
        let driver = driver();
        assert!(driver.prepare("SELECT * FROM missing_table").is_err());
    }

    #[test]
    fn test_fetch_all_before_execute_fails() {
        let driver = driver();
        let mut stmt = driver.prepare("SELECT * FROM items").unwrap();
        assert!(stmt.fetch_all().is_err());
        assert!(stmt.execute());
        assert!(stmt.fetch_all().unwrap().is_empty());
    }
}
