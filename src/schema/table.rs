//! Table definitions and table level constraints.

use super::column::Column;
use super::SchemaError;
use crate::connection::DriverKind;

pub const DEFAULT_ENGINE: &str = "InnoDB";
pub const DEFAULT_CHARSET: &str = "utf8mb4";
pub const DEFAULT_COLLATION: &str = "utf8mb4_unicode_ci";

/// Table level constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Named multi-column unique key.
    UniqueKey { name: String, columns: Vec<String> },
    /// `column` references `table(references)`, optionally in another database.
    ForeignKey {
        column: String,
        table: String,
        references: String,
        database: Option<String>,
    },
}

impl Constraint {
    pub fn unique_key(name: &str, columns: &[&str]) -> Self {
        Constraint::UniqueKey {
            name: name.to_string(),
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    pub fn foreign_key(column: &str, table: &str, references: &str) -> Self {
        Constraint::ForeignKey {
            column: column.to_string(),
            table: table.to_string(),
            references: references.to_string(),
            database: None,
        }
    }

    /// Qualify the referenced table of a foreign key with a database name.
    pub fn in_database(mut self, db: &str) -> Self {
        if let Constraint::ForeignKey { database, .. } = &mut self {
            *database = Some(db.to_string());
        }
        self
    }

    /// Constraint clause for CREATE TABLE, `None` for drivers without DDL support.
    pub fn sql(&self, driver: DriverKind) -> Option<String> {
        match self {
            Constraint::UniqueKey { name, columns } => {
                let cols = columns
                    .iter()
                    .map(|c| format!("`{c}`"))
                    .collect::<Vec<_>>()
                    .join(",");
                match driver {
                    DriverKind::Mysql => Some(format!("UNIQUE KEY `{name}` ({cols})")),
                    DriverKind::Sqlite => Some(format!("CONSTRAINT `{name}` UNIQUE ({cols})")),
                    DriverKind::Pgsql => None,
                }
            }
            Constraint::ForeignKey {
                column,
                table,
                references,
                database,
            } => {
                let target = match database {
                    Some(db) => format!("`{db}`.`{table}`"),
                    None => format!("`{table}`"),
                };
                match driver {
                    DriverKind::Mysql => {
                        Some(format!("FOREIGN KEY (`{column}`) REFERENCES {target}(`{references}`)"))
                    }
                    DriverKind::Sqlite => Some(format!(
                        "CONSTRAINT `cnstrnt_{column}_frgn` FOREIGN KEY (`{column}`) REFERENCES {target}(`{references}`)"
                    )),
                    DriverKind::Pgsql => None,
                }
            }
        }
    }

    fn columns(&self) -> Vec<&str> {
        match self {
            Constraint::UniqueKey { columns, .. } => columns.iter().map(String::as_str).collect(),
            Constraint::ForeignKey { column, .. } => vec![column.as_str()],
        }
    }
}

/// A table: ordered columns, optional primary key and constraints.
///
/// # Example
///
/// ```
/// use lifeline::schema::{Column, Table};
///
/// let users = Table::new("users")
///     .column(Column::integer("id").unsigned().auto_increment())
///     .column(Column::string("email").length(128).unique())
///     .column(Column::string("name").length(64))
///     .primary_key("id");
/// assert_eq!(users.columns().len(), 3);
/// assert_eq!(users.primary_column().map(|c| c.name()), Some("id"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    engine: String,
    charset: String,
    collation: String,
    columns: Vec<Column>,
    primary_key: Option<String>,
    constraints: Vec<Constraint>,
}

impl Table {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            engine: DEFAULT_ENGINE.to_string(),
            charset: DEFAULT_CHARSET.to_string(),
            collation: DEFAULT_COLLATION.to_string(),
            columns: Vec::new(),
            primary_key: None,
            constraints: Vec::new(),
        }
    }

    /// MySQL storage engine.
    pub fn with_engine(mut self, engine: &str) -> Self {
        self.engine = engine.to_string();
        self
    }

    /// Character set and collation given to string and text columns added
    /// after this call that do not set their own.
    pub fn defaults(mut self, charset: &str, collation: &str) -> Self {
        self.charset = charset.to_string();
        self.collation = collation.to_string();
        self
    }

    /// Append a column. A column with the same name replaces the earlier one.
    pub fn column(mut self, mut column: Column) -> Self {
        column.apply_charset_defaults(&self.charset, &self.collation);
        match self.columns.iter_mut().find(|c| c.name() == column.name()) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        self
    }

    pub fn primary_key(mut self, column: &str) -> Self {
        self.primary_key = Some(column.to_string());
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn col(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    pub fn primary_key_name(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    pub fn primary_column(&self) -> Option<&Column> {
        self.primary_key.as_deref().and_then(|pk| self.col(pk))
    }

    /// Column the ORM matches single rows on: the primary key, else the
    /// first unique column.
    pub fn match_column(&self) -> Option<&Column> {
        self.primary_column()
            .or_else(|| self.columns.iter().find(|c| c.is_unique()))
    }

    /// Whether `column` is the primary key or carries a unique attribute.
    pub fn is_primary_or_unique(&self, column: &Column) -> bool {
        self.primary_key.as_deref() == Some(column.name()) || column.is_unique()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Validate every column, the primary key rules and constraint columns.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::InvalidTable`] for an empty name, engine or column list
    /// - [`SchemaError::InvalidColumn`] for a column outside its kind's limits
    /// - [`SchemaError::ColumnNotDefined`] when the primary key or a constraint
    ///   names a missing column
    /// - [`SchemaError::PrimaryKey`] for a nullable primary key, or one
    ///   without a default that is not an auto-increment integer
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.name.is_empty() {
            return Err(SchemaError::InvalidTable("Table name cannot be empty".to_string()));
        }
        if self.engine.is_empty() {
            return Err(SchemaError::InvalidTable(format!(
                "Invalid engine for table \"{}\"",
                self.name
            )));
        }
        if self.columns.is_empty() {
            return Err(SchemaError::InvalidTable(format!(
                "Table \"{}\" has no columns",
                self.name
            )));
        }

        for column in &self.columns {
            column.validate()?;
        }

        if let Some(pk) = self.primary_key.as_deref() {
            let column = self
                .col(pk)
                .ok_or_else(|| SchemaError::ColumnNotDefined(pk.to_string()))?;
            if column.is_nullable() {
                return Err(SchemaError::PrimaryKey(format!(
                    "Primary key \"{pk}\" cannot be nullable"
                )));
            }
            let no_default = !matches!(column.default_value(), Some(d) if !d.is_null());
            if no_default && !column.is_auto_increment() {
                return Err(SchemaError::PrimaryKey(format!(
                    "Primary key \"{pk}\" default value cannot be NULL"
                )));
            }
        }

        for constraint in &self.constraints {
            for col in constraint.columns() {
                if self.col(col).is_none() {
                    return Err(SchemaError::ColumnNotDefined(col.to_string()));
                }
            }
        }

        Ok(())
    }
}
