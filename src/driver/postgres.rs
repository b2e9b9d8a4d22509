//! PostgreSQL driver over `may_postgres`.
//!
//! `:name` and `?` placeholders are rewritten to `$n` before preparing (see
//! [`crate::placeholders`]). Bound values are converted to the parameter types
//! the server inferred for the prepared statement, and result columns are
//! decoded from their wire types into [`Value`]s.

use super::{Driver, NO_ERROR_STATE, Statement, StatementError};
use crate::binder::ParamType;
use crate::connection::DriverKind;
use crate::placeholders::{self, Rewritten};
use crate::value::{ParamKey, Row, Value};
use may_postgres::types::{ToSql, Type};
use may_postgres::Client;
use std::collections::VecDeque;
use std::str::FromStr;

/// PostgreSQL connection.
pub struct PostgresDriver {
    client: Client,
}

impl PostgresDriver {
    /// Connect with a key-value connection string
    /// (`host=localhost port=5432 user=postgres dbname=mydb`) or a URI.
    ///
    /// # Errors
    ///
    /// Returns the connection error reported by `may_postgres`.
    pub fn connect(connection_string: &str) -> Result<Self, StatementError> {
        let client = may_postgres::connect(connection_string).map_err(|e| statement_error(&e))?;
        Ok(Self { client })
    }

    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Driver for PostgresDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Pgsql
    }

    fn prepare<'c>(&'c self, sql: &str) -> Result<Box<dyn Statement + 'c>, StatementError> {
        let rewritten = placeholders::to_numbered(sql);
        let stmt = self
            .client
            .prepare(&rewritten.sql)
            .map_err(|e| statement_error(&e))?;
        let bound = vec![None; rewritten.slots.len()];
        Ok(Box::new(PostgresStatement {
            client: &self.client,
            stmt,
            rewritten,
            bound,
            rows: VecDeque::new(),
            row_count: 0,
            error: None,
            executed: false,
        }))
    }
}

struct PostgresStatement<'c> {
    client: &'c Client,
    stmt: may_postgres::Statement,
    rewritten: Rewritten,
    bound: Vec<Option<Value>>,
    rows: VecDeque<Row>,
    row_count: u64,
    error: Option<StatementError>,
    executed: bool,
}

impl PostgresStatement<'_> {
    fn run(&mut self) -> Result<(), StatementError> {
        let mut params: Vec<Box<dyn ToSql>> = Vec::with_capacity(self.bound.len());
        for (i, value) in self.bound.iter().enumerate() {
            let value = value.as_ref().ok_or_else(|| {
                StatementError::new(
                    "HY093",
                    None,
                    Some(format!("Invalid parameter number: {} is not bound", self.rewritten.slots[i])),
                )
            })?;
            let ty = self.stmt.params().get(i).cloned().unwrap_or(Type::TEXT);
            params.push(to_param(&ty, value)?);
        }
        let refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        if self.stmt.columns().is_empty() {
            self.row_count = self
                .client
                .execute(&self.stmt, &refs)
                .map_err(|e| statement_error(&e))?;
            return Ok(());
        }

        let rows = self
            .client
            .query(&self.stmt, &refs)
            .map_err(|e| statement_error(&e))?;
        let mut buffered = VecDeque::with_capacity(rows.len());
        for row in &rows {
            buffered.push_back(from_row(row)?);
        }
        self.row_count = buffered.len() as u64;
        self.rows = buffered;
        Ok(())
    }
}

impl Statement for PostgresStatement<'_> {
    fn bind_value(&mut self, key: &ParamKey, value: &Value, _ty: ParamType) -> Result<(), StatementError> {
        let ordinal = self.rewritten.ordinal(key).ok_or_else(|| {
            StatementError::new(
                "HY093",
                None,
                Some(format!("Invalid parameter number: parameter {key} was not defined")),
            )
        })?;
        self.bound[ordinal - 1] = Some(value.clone());
        Ok(())
    }

    fn execute(&mut self) -> bool {
        self.executed = true;
        match self.run() {
            Ok(()) => {
                self.error = None;
                true
            }
            Err(e) => {
                self.rows.clear();
                self.row_count = 0;
                self.error = Some(e);
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

fn conversion_error(value: &Value, ty: &Type) -> StatementError {
    StatementError::new(
        "22P02",
        None,
        Some(format!("Cannot convert {} value to {}", value.type_name(), ty.name())),
    )
}

/// Integer view of `value` that refuses lossy input: fractional floats and
/// text that is not a whole number yield `None`.
fn checked_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Float(f) if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 => {
            Some(*f as i64)
        }
        Value::Text(_) | Value::Blob(_) => text_of(value).trim().parse().ok(),
        _ => None,
    }
}

fn checked_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::Bool(b) => Some(f64::from(u8::from(*b))),
        Value::Text(_) | Value::Blob(_) => text_of(value).trim().parse().ok(),
        _ => None,
    }
}

/// [`checked_integer`] narrowed to the column width.
fn narrow<T: TryFrom<i64>>(value: &Value, ty: &Type) -> Result<T, StatementError> {
    checked_integer(value)
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(|| conversion_error(value, ty))
}

fn text_of(value: &Value) -> String {
    match value {
        Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
        other => other.to_string(),
    }
}

/// Convert a bound value to the parameter type the server expects.
fn to_param(ty: &Type, value: &Value) -> Result<Box<dyn ToSql>, StatementError> {
    let null = value.is_null();
    let param: Box<dyn ToSql> = if *ty == Type::BOOL {
        Box::new((!null).then(|| match value {
            Value::Bool(b) => *b,
            other => other.to_integer() != 0,
        }))
    } else if *ty == Type::INT2 {
        let n = if null { None } else { Some(narrow::<i16>(value, ty)?) };
        Box::new(n)
    } else if *ty == Type::INT4 {
        let n = if null { None } else { Some(narrow::<i32>(value, ty)?) };
        Box::new(n)
    } else if *ty == Type::INT8 {
        let n = if null { None } else { Some(narrow::<i64>(value, ty)?) };
        Box::new(n)
    } else if *ty == Type::FLOAT4 {
        let f = if null {
            None
        } else {
            let f = checked_float(value).ok_or_else(|| conversion_error(value, ty))?;
            if f.is_finite() && f.abs() > f64::from(f32::MAX) {
                return Err(conversion_error(value, ty));
            }
            Some(f as f32)
        };
        Box::new(f)
    } else if *ty == Type::FLOAT8 {
        let f = if null {
            None
        } else {
            Some(checked_float(value).ok_or_else(|| conversion_error(value, ty))?)
        };
        Box::new(f)
    } else if *ty == Type::NUMERIC {
        let decimal = if null {
            None
        } else {
            Some(
                rust_decimal::Decimal::from_str(&text_of(value))
                    .map_err(|_| conversion_error(value, ty))?,
            )
        };
        Box::new(decimal)
    } else if *ty == Type::BYTEA {
        Box::new(match value {
            Value::Null => None,
            Value::Blob(b) => Some(b.clone()),
            other => Some(text_of(other).into_bytes()),
        })
    } else if *ty == Type::TIMESTAMP {
        let ts = if null {
            None
        } else {
            Some(
                chrono::NaiveDateTime::parse_from_str(&text_of(value), "%Y-%m-%d %H:%M:%S")
                    .map_err(|_| conversion_error(value, ty))?,
            )
        };
        Box::new(ts)
    } else if *ty == Type::TIMESTAMPTZ {
        let ts = if null {
            None
        } else {
            Some(
                chrono::DateTime::parse_from_rfc3339(&text_of(value))
                    .map(|dt| dt.with_timezone(&chrono::Utc))
                    .map_err(|_| conversion_error(value, ty))?,
            )
        };
        Box::new(ts)
    } else if *ty == Type::DATE {
        let date = if null {
            None
        } else {
            Some(
                chrono::NaiveDate::parse_from_str(&text_of(value), "%Y-%m-%d")
                    .map_err(|_| conversion_error(value, ty))?,
            )
        };
        Box::new(date)
    } else {
        Box::new((!null).then(|| text_of(value)))
    };
    Ok(param)
}

fn from_row(row: &may_postgres::Row) -> Result<Row, StatementError> {
    let mut out = Row::new();
    for (i, column) in row.columns().iter().enumerate() {
        let ty = column.type_();
        let value = if *ty == Type::BOOL {
            get::<bool>(row, i)?.map_or(Value::Null, Value::Bool)
        } else if *ty == Type::INT2 {
            get::<i16>(row, i)?.map_or(Value::Null, |v| Value::Int(i64::from(v)))
        } else if *ty == Type::INT4 {
            get::<i32>(row, i)?.map_or(Value::Null, |v| Value::Int(i64::from(v)))
        } else if *ty == Type::INT8 {
            get::<i64>(row, i)?.map_or(Value::Null, Value::Int)
        } else if *ty == Type::FLOAT4 {
            get::<f32>(row, i)?.map_or(Value::Null, |v| Value::Float(f64::from(v)))
        } else if *ty == Type::FLOAT8 {
            get::<f64>(row, i)?.map_or(Value::Null, Value::Float)
        } else if *ty == Type::NUMERIC {
            get::<rust_decimal::Decimal>(row, i)?.map_or(Value::Null, |v| Value::Text(v.to_string()))
        } else if *ty == Type::BYTEA {
            get::<Vec<u8>>(row, i)?.map_or(Value::Null, Value::Blob)
        } else if *ty == Type::TIMESTAMP {
            get::<chrono::NaiveDateTime>(row, i)?
                .map_or(Value::Null, |v| Value::Text(v.format("%Y-%m-%d %H:%M:%S").to_string()))
        } else if *ty == Type::TIMESTAMPTZ {
            get::<chrono::DateTime<chrono::Utc>>(row, i)?
                .map_or(Value::Null, |v| Value::Text(v.to_rfc3339()))
        } else if *ty == Type::DATE {
            get::<chrono::NaiveDate>(row, i)?.map_or(Value::Null, |v| Value::Text(v.to_string()))
        } else {
            get::<String>(row, i)?.map_or(Value::Null, Value::Text)
        };
        out.columns.push((column.name().to_string(), value));
    }
    Ok(out)
}

fn get<T>(row: &may_postgres::Row, idx: usize) -> Result<Option<T>, StatementError>
where
    T: for<'a> may_postgres::types::FromSql<'a>,
{
    row.try_get::<usize, Option<T>>(idx)
        .map_err(|e| StatementError::general(format!("Failed to decode column {idx}: {e}")))
}

fn statement_error(err: &may_postgres::Error) -> StatementError {
    let state = err.code().map_or("HY000", |c| c.code()).to_string();
    let info = err
        .as_db_error()
        .map_or_else(|| err.to_string(), |db| db.message().to_string());
    StatementError::new(state.clone(), Some(state), Some(info))
}
