//! Error types for ORM operations.

use crate::executor::QueryError;
use crate::result::ExecutedQuery;
use crate::schema::SchemaError;
use std::fmt;

/// The four writes a [`ModelQuery`](super::ModelQuery) can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Save,
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Save => "save",
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for ORM operations
#[derive(Debug)]
pub enum OrmError {
    /// A value does not fit its column's nullability or type
    Validation(String),
    ColumnNotFound { table: String, column: String },
    /// A row handed to [`Record::from_row`](super::Record::from_row) lacks a declared column
    MissingColumnValue { table: String, column: String },
    /// A match column override that is neither primary nor unique
    NotPrimaryOrUnique(String),
    /// The table has neither a primary key nor a unique column
    NoMatchColumn { model: String, operation: Operation },
    /// The match column has no value to match on
    NoMatchValue {
        model: String,
        operation: Operation,
        column: String,
    },
    /// Insert of a row that was loaded from or already written to the database
    AlreadyExists(String),
    NoChanges { model: String, operation: Operation },
    /// A [`ModelQuery`](super::ModelQuery) runs at most once
    AlreadyExecuted,
    /// Read returned no row, carries `db.table`
    ModelNotFound(String),
    InvalidQuery(String),
    /// A write did not meet its expected row count
    Persistence {
        model: String,
        operation: Operation,
        message: String,
        query: Box<ExecutedQuery>,
    },
    Query(QueryError),
    UnknownTable(String),
    Schema(SchemaError),
}

impl OrmError {
    /// The failed statement of a persistence failure.
    pub fn failed_query(&self) -> Option<&ExecutedQuery> {
        match self {
            OrmError::Persistence { query, .. } => Some(query),
            _ => None,
        }
    }
}

impl fmt::Display for OrmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrmError::Validation(msg) | OrmError::InvalidQuery(msg) => write!(f, "{msg}"),
            OrmError::ColumnNotFound { table, column } => {
                write!(f, "Column \"{column}\" not found in \"{table}\" table")
            }
            OrmError::MissingColumnValue { table, column } => {
                write!(f, "No value for column \"{table}.{column}\" in input row")
            }
            OrmError::NotPrimaryOrUnique(column) => {
                write!(f, "Column \"{column}\" is not PRIMARY OR UNIQUE")
            }
            OrmError::NoMatchColumn { model, operation } => write!(
                f,
                "{} query on a {model} model requires a PRIMARY or UNIQUE col",
                operation.as_str().to_uppercase()
            ),
            OrmError::NoMatchValue {
                model,
                operation,
                column,
            } => write!(
                f,
                "Cannot run {} query on {model} model, No value for \"{column}\"",
                operation.as_str().to_uppercase()
            ),
            OrmError::AlreadyExists(model) => write!(f, "Cannot insert already existing {model} row"),
            OrmError::NoChanges { model, operation } => match operation {
                Operation::Insert => write!(f, "No data to insert {model} row"),
                _ => write!(f, "ORM model {model} has no changes for {operation}"),
            },
            OrmError::AlreadyExecuted => write!(f, "This query has already been executed"),
            OrmError::ModelNotFound(table) => write!(f, "No matching row found in \"{table}\""),
            OrmError::Persistence { message, .. } => write!(f, "{message}"),
            OrmError::Query(e) => write!(f, "{e}"),
            OrmError::UnknownTable(name) => write!(f, "Table \"{name}\" is not registered"),
            OrmError::Schema(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for OrmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OrmError::Query(e) => Some(e),
            OrmError::Schema(e) => Some(e),
            _ => None,
        }
    }
}

impl From<QueryError> for OrmError {
    fn from(e: QueryError) -> Self {
        OrmError::Query(e)
    }
}

impl From<SchemaError> for OrmError {
    fn from(e: SchemaError) -> Self {
        match e {
            SchemaError::UnknownTable(name) => OrmError::UnknownTable(name),
            other => OrmError::Schema(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = OrmError::NoMatchColumn {
            model: "User".to_string(),
            operation: Operation::Save,
        };
        assert_eq!(err.to_string(), "SAVE query on a User model requires a PRIMARY or UNIQUE col");

        let err = OrmError::NoMatchValue {
            model: "User".to_string(),
            operation: Operation::Delete,
            column: "id".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot run DELETE query on User model, No value for \"id\"");

        let err = OrmError::NoChanges {
            model: "User".to_string(),
            operation: Operation::Update,
        };
        assert_eq!(err.to_string(), "ORM model User has no changes for update");

        let err = OrmError::NoChanges {
            model: "User".to_string(),
            operation: Operation::Insert,
        };
        assert_eq!(err.to_string(), "No data to insert User row");
    }

    #[test]
    fn test_unknown_table_maps_from_schema() {
        let err: OrmError = SchemaError::UnknownTable("t".to_string()).into();
        assert!(matches!(err, OrmError::UnknownTable(ref t) if t == "t"));
        let err: OrmError = SchemaError::InvalidEol.into();
        assert!(matches!(err, OrmError::Schema(SchemaError::InvalidEol)));
    }
}
