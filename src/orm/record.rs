//! Dirty-tracking row state.

use super::OrmError;
use crate::schema::{self, Column, ColumnKind, Table};
use crate::value::{Params, Row, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Current snapshot layout.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Field values of one table row plus the values last seen in the database.
///
/// Values are keyed by declared column name. A column that was never set and
/// never loaded is *unset*, which is different from being set to NULL.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    table: Arc<Table>,
    values: BTreeMap<String, Value>,
    originals: BTreeMap<String, Value>,
}

impl Record {
    /// Empty record, not yet persisted.
    pub fn new(table: Arc<Table>) -> Self {
        Self {
            table,
            values: BTreeMap::new(),
            originals: BTreeMap::new(),
        }
    }

    /// Hydrate from a fetched row and snapshot every column as original.
    ///
    /// Integer and double columns go through a numeric cast. Decimal columns
    /// read back as numbers (SQLite `REAL`) are turned into decimal strings.
    /// NULL stays NULL.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::MissingColumnValue`] when the row lacks a declared
    /// column.
    pub fn from_row(table: Arc<Table>, row: Row) -> Result<Self, OrmError> {
        let mut values = BTreeMap::new();
        for column in table.columns() {
            let raw = row.get(column.name()).cloned().ok_or_else(|| OrmError::MissingColumnValue {
                table: table.name().to_string(),
                column: column.name().to_string(),
            })?;
            values.insert(column.name().to_string(), hydrate(column, raw));
        }

        Ok(Self {
            table,
            originals: values.clone(),
            values,
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn table_arc(&self) -> Arc<Table> {
        Arc::clone(&self.table)
    }

    /// Set a column value.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::ColumnNotFound`] for an undeclared column. Type
    /// checks happen in [`Record::changes`].
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<&mut Self, OrmError> {
        if self.table.col(column).is_none() {
            return Err(OrmError::ColumnNotFound {
                table: self.table.name().to_string(),
                column: column.to_string(),
            });
        }
        self.values.insert(column.to_string(), value.into());
        Ok(self)
    }

    /// Current value; `None` when unset.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Value last seen in the database; `None` when never loaded or written.
    pub fn original(&self, column: &str) -> Option<&Value> {
        self.originals.get(column)
    }

    pub fn originals(&self) -> &BTreeMap<String, Value> {
        &self.originals
    }

    /// Whether the record was loaded from or written to the database.
    pub fn is_persisted(&self) -> bool {
        !self.originals.is_empty()
    }

    /// Primary key, else the first unique column.
    pub fn primary_col(&self) -> Option<&Column> {
        self.table.match_column()
    }

    /// Columns whose current value differs from the original, in table order.
    ///
    /// A column is included when its original is NULL or missing and it now
    /// holds a value, or when its original is non-NULL and the current value
    /// differs in type or value. Unset columns are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Validation`] when a set value breaks its column's
    /// nullability or type.
    pub fn changes(&self) -> Result<Params, OrmError> {
        let mut changes = Params::new();
        for column in self.table.columns() {
            let name = column.name();
            let original = self.originals.get(name).filter(|v| !v.is_null());
            let current = match self.values.get(name) {
                Some(v) => v.clone(),
                None if original.is_none() => continue,
                None => Value::Null,
            };

            schema::validate_column_value(&self.table, column, &current)?;

            let changed = match original {
                None => !current.is_null(),
                Some(original) => &current != original,
            };
            if changed {
                changes = changes.with(name, current);
            }
        }
        Ok(changes)
    }

    /// Current values become the originals.
    pub(crate) fn commit(&mut self) {
        self.originals = self.values.clone();
    }

    pub(crate) fn clear_originals(&mut self) {
        self.originals.clear();
    }

    pub(crate) fn fill(&mut self, column: &str, value: Value) {
        self.values.insert(column.to_string(), value);
    }

    /// Serializable copy of the values and originals.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Validation`] when a value is an array or object.
    pub fn snapshot(&self) -> Result<RecordSnapshot, OrmError> {
        Ok(RecordSnapshot {
            version: SNAPSHOT_VERSION,
            table: self.table.name().to_string(),
            values: to_snapshot(&self.values)?,
            originals: to_snapshot(&self.originals)?,
        })
    }

    /// Rebuild a record from [`Record::snapshot`] output.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Validation`] for a snapshot of another table or
    /// layout version, or one naming undeclared columns.
    pub fn restore(table: Arc<Table>, snapshot: RecordSnapshot) -> Result<Self, OrmError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(OrmError::Validation(format!(
                "Unsupported record snapshot version {}",
                snapshot.version
            )));
        }
        if snapshot.table != table.name() {
            return Err(OrmError::Validation(format!(
                "Snapshot of \"{}\" cannot be restored as a \"{}\" record",
                snapshot.table,
                table.name()
            )));
        }

        let mut record = Self::new(table);
        for (column, value) in snapshot.values {
            record.set(&column, value)?;
        }
        for (column, value) in snapshot.originals {
            if record.table.col(&column).is_none() {
                return Err(OrmError::ColumnNotFound {
                    table: record.table.name().to_string(),
                    column,
                });
            }
            record.originals.insert(column, value.into());
        }
        Ok(record)
    }
}

fn hydrate(column: &Column, raw: Value) -> Value {
    if raw.is_null() {
        return raw;
    }
    match (column.kind(), raw) {
        (ColumnKind::Decimal { .. }, Value::Int(i)) => Value::Text(i.to_string()),
        (ColumnKind::Decimal { .. }, Value::Float(f)) => Value::Text(f.to_string()),
        (_, raw) => column.data_type().coerce(raw),
    }
}

/// Versioned, serializable form of a [`Record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub version: u32,
    pub table: String,
    pub values: BTreeMap<String, SnapshotValue>,
    pub originals: BTreeMap<String, SnapshotValue>,
}

/// Scalar value as stored in a [`RecordSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SnapshotValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<SnapshotValue> for Value {
    fn from(v: SnapshotValue) -> Self {
        match v {
            SnapshotValue::Null => Value::Null,
            SnapshotValue::Bool(b) => Value::Bool(b),
            SnapshotValue::Int(i) => Value::Int(i),
            SnapshotValue::Float(f) => Value::Float(f),
            SnapshotValue::Text(s) => Value::Text(s),
            SnapshotValue::Blob(b) => Value::Blob(b),
        }
    }
}

fn to_snapshot(values: &BTreeMap<String, Value>) -> Result<BTreeMap<String, SnapshotValue>, OrmError> {
    values
        .iter()
        .map(|(column, value)| {
            let v = match value {
                Value::Null => SnapshotValue::Null,
                Value::Bool(b) => SnapshotValue::Bool(*b),
                Value::Int(i) => SnapshotValue::Int(*i),
                Value::Float(f) => SnapshotValue::Float(*f),
                Value::Text(s) => SnapshotValue::Text(s.clone()),
                Value::Blob(b) => SnapshotValue::Blob(b.clone()),
                Value::Array(_) | Value::Object(_) => {
                    return Err(OrmError::Validation(format!(
                        "Column \"{column}\" holds a non-scalar value and cannot be snapshotted"
                    )))
                }
            };
            Ok((column.clone(), v))
        })
        .collect()
}
