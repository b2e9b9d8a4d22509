//! Schema catalog.
//!
//! Tables are declared once with [`Table`] and [`Column`] builders and
//! registered in a [`Schema`]. Registration validates every definition, so the
//! ORM layer can rely on the catalog being consistent. A [`BoundTable`] pairs a
//! registered table with the [`Database`] it lives in and is the entry point
//! for ORM reads ([`BoundTable::find`]) and DDL ([`BoundTable::migration`]).

pub mod column;
pub mod migration;
pub mod table;

pub use column::{Column, ColumnKind, LobSize};
pub use migration::Migration;
pub use table::{Constraint, Table};

use crate::connection::DriverKind;
use crate::executor::Database;
use crate::orm::{FindQuery, Model, OrmError};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Invalid table or column definition, or a catalog lookup failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    InvalidTable(String),
    InvalidColumn(String),
    /// A primary key or constraint names a column the table does not have.
    ColumnNotDefined(String),
    PrimaryKey(String),
    DuplicateTable(String),
    UnknownTable(String),
    UnsupportedDriver(DriverKind),
    InvalidEol,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::InvalidTable(msg) | SchemaError::InvalidColumn(msg) | SchemaError::PrimaryKey(msg) => {
                write!(f, "{msg}")
            }
            SchemaError::ColumnNotDefined(col) => write!(f, "Column \"{col}\" not defined in table"),
            SchemaError::DuplicateTable(name) => write!(f, "Table \"{name}\" is already registered"),
            SchemaError::UnknownTable(name) => write!(f, "Table \"{name}\" is not registered"),
            SchemaError::UnsupportedDriver(driver) => {
                write!(f, "Schema DDL is not supported for {driver} databases")
            }
            SchemaError::InvalidEol => write!(f, "Invalid EOL character"),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Registry of validated tables, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    tables: BTreeMap<String, Arc<Table>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a table.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateTable`] when the name is taken, or any
    /// error of [`Table::validate`].
    pub fn register(&mut self, table: Table) -> Result<Arc<Table>, SchemaError> {
        table.validate()?;
        if self.tables.contains_key(table.name()) {
            return Err(SchemaError::DuplicateTable(table.name().to_string()));
        }
        let table = Arc::new(table);
        self.tables.insert(table.name().to_string(), Arc::clone(&table));
        log::debug!("Registered table {} ({} columns)", table.name(), table.columns().len());
        Ok(table)
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownTable`] when nothing is registered under `name`.
    pub fn table(&self, name: &str) -> Result<Arc<Table>, SchemaError> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownTable(name.to_string()))
    }

    /// Bind a registered table to a connection.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownTable`] when nothing is registered under `name`.
    pub fn bind<'db>(&self, db: &'db Database, name: &str) -> Result<BoundTable<'db>, SchemaError> {
        Ok(BoundTable::new(db, self.table(name)?))
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values().map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// A table bound to the database that holds it.
#[derive(Clone)]
pub struct BoundTable<'db> {
    db: &'db Database,
    table: Arc<Table>,
}

impl<'db> BoundTable<'db> {
    pub fn new(db: &'db Database, table: Arc<Table>) -> Self {
        Self { db, table }
    }

    pub fn db(&self) -> &'db Database {
        self.db
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Shared handle on the table definition, as held by ORM records.
    pub fn table_arc(&self) -> Arc<Table> {
        Arc::clone(&self.table)
    }

    /// # Errors
    ///
    /// Returns [`OrmError::ColumnNotFound`] for an undeclared column.
    pub fn col(&self, name: &str) -> Result<&Column, OrmError> {
        self.table.col(name).ok_or_else(|| OrmError::ColumnNotFound {
            table: self.table.name().to_string(),
            column: name.to_string(),
        })
    }

    /// Check a value against a column's nullability and semantic type.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Validation`] when the value does not fit.
    pub fn validate_column_value_type(&self, column: &Column, value: &Value) -> Result<(), OrmError> {
        validate_column_value(&self.table, column, value)
    }

    /// Start an ORM read on this table.
    pub fn find<M: Model>(&self) -> FindQuery<'db, M> {
        FindQuery::new(self.clone())
    }

    /// DDL generator for this table in the connection's dialect.
    pub fn migration(&self) -> Migration<'_> {
        Migration::new(&self.table, self.db.driver_kind())
    }
}

impl fmt::Debug for BoundTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let db = match self.db.credentials() {
            Some(c) => format!("{}@{}", c.host, c.dbname),
            None => self.db.driver_kind().to_string(),
        };
        f.debug_struct("BoundTable")
            .field("db", &db)
            .field("table", &self.table.name())
            .finish()
    }
}

/// NULL is only accepted by nullable columns; anything else must be a scalar
/// whose runtime type matches the column's semantic type exactly.
pub(crate) fn validate_column_value(table: &Table, column: &Column, value: &Value) -> Result<(), OrmError> {
    if value.is_null() {
        if !column.is_nullable() {
            return Err(OrmError::Validation(format!(
                "Column \"{}.{}\" cannot be NULL",
                table.name(),
                column.name()
            )));
        }
        return Ok(());
    }

    if !column.data_type().accepts(value) {
        return Err(OrmError::Validation(format!(
            "Column \"{}.{}\" expects value of type \"{}\", got \"{}\"",
            table.name(),
            column.name(),
            column.data_type(),
            value.type_name()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Table {
        Table::new("users")
            .column(Column::integer("id").auto_increment())
            .column(Column::string("name"))
            .column(Column::double("score").nullable())
            .primary_key("id")
    }

    #[test]
    fn test_register_and_lookup() {
        let mut schema = Schema::new();
        schema.register(users()).unwrap();
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.table("users").unwrap().name(), "users");
        assert_eq!(
            schema.table("nope").unwrap_err(),
            SchemaError::UnknownTable("nope".to_string())
        );
        assert_eq!(
            schema.register(users()).unwrap_err(),
            SchemaError::DuplicateTable("users".to_string())
        );
    }

    #[test]
    fn test_register_rejects_invalid_tables() {
        let mut schema = Schema::new();
        let table = Table::new("t").column(Column::string("a").nullable()).primary_key("a");
        assert!(matches!(schema.register(table), Err(SchemaError::PrimaryKey(_))));
        assert!(schema.is_empty());
    }

    #[test]
    fn test_value_validation_messages() {
        let table = users();
        let name = table.col("name").unwrap();
        let score = table.col("score").unwrap();

        let err = validate_column_value(&table, name, &Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "Column \"users.name\" cannot be NULL");

        let err = validate_column_value(&table, name, &Value::Int(3)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Column \"users.name\" expects value of type \"string\", got \"integer\""
        );

        assert!(validate_column_value(&table, score, &Value::Null).is_ok());
        assert!(validate_column_value(&table, score, &Value::Float(1.5)).is_ok());
        assert!(validate_column_value(&table, score, &Value::Int(1)).is_err());
        assert!(validate_column_value(&table, name, &Value::Array(vec![])).is_err());
    }
}
