//! CREATE TABLE generation for MySQL and SQLite.

use super::column::{quote_literal, Column};
use super::table::Table;
use super::SchemaError;
use crate::connection::DriverKind;
use crate::value::Value;

/// Renders the DDL of one table for one driver.
///
/// ```
/// use lifeline::connection::DriverKind;
/// use lifeline::schema::{Column, Migration, Table};
///
/// let table = Table::new("tags")
///     .column(Column::integer("id").auto_increment())
///     .column(Column::string("label").length(32).unique())
///     .primary_key("id");
///
/// let sql = Migration::new(&table, DriverKind::Sqlite)
///     .create_if_not_exists()
///     .eol("\n")
///     .unwrap()
///     .create_table()
///     .unwrap();
/// assert_eq!(
///     sql,
///     "CREATE TABLE IF NOT EXISTS `tags` (\n  `id` integer PRIMARY KEY AUTOINCREMENT NOT NULL,\n  `label` TEXT UNIQUE NOT NULL\n);"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Migration<'t> {
    table: &'t Table,
    driver: DriverKind,
    drop_existing: bool,
    create_if_not_exists: bool,
    eol: &'static str,
}

impl<'t> Migration<'t> {
    pub fn new(table: &'t Table, driver: DriverKind) -> Self {
        Self {
            table,
            driver,
            drop_existing: false,
            create_if_not_exists: false,
            eol: "\n",
        }
    }

    /// Prefix the statement with `DROP TABLE IF EXISTS`.
    pub fn drop_existing(mut self) -> Self {
        self.drop_existing = true;
        self
    }

    pub fn create_if_not_exists(mut self) -> Self {
        self.create_if_not_exists = true;
        self
    }

    /// Line separator: `""`, `"\n"` or `"\r\n"`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidEol`] for anything else.
    pub fn eol(mut self, eol: &str) -> Result<Self, SchemaError> {
        self.eol = match eol {
            "" => "",
            "\n" => "\n",
            "\r\n" => "\r\n",
            _ => return Err(SchemaError::InvalidEol),
        };
        Ok(self)
    }

    /// Render the statement.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::UnsupportedDriver`] for PostgreSQL, or when a column
    ///   or constraint has no mapping for the driver
    /// - any error of [`Table::validate`]
    pub fn create_table(&self) -> Result<String, SchemaError> {
        if self.driver == DriverKind::Pgsql {
            return Err(SchemaError::UnsupportedDriver(self.driver));
        }
        self.table.validate()?;

        let eol = self.eol;
        let name = self.table.name();
        let mut statement = String::new();

        if self.drop_existing {
            statement.push_str(&format!("DROP TABLE IF EXISTS `{name}`;{eol}"));
        }

        statement.push_str("CREATE TABLE");
        if self.create_if_not_exists {
            statement.push_str(" IF NOT EXISTS");
        }
        statement.push_str(&format!(" `{name}` ({eol}"));

        let mut lines = Vec::with_capacity(self.table.columns().len());
        let mut mysql_unique_keys = Vec::new();
        for column in self.table.columns() {
            lines.push(self.column_definition(column)?);
            if column.is_unique() && self.driver == DriverKind::Mysql {
                mysql_unique_keys.push(column.name());
            }
        }

        for key in mysql_unique_keys {
            lines.push(format!("  UNIQUE KEY (`{key}`)"));
        }

        for constraint in self.table.constraints() {
            let sql = constraint
                .sql(self.driver)
                .ok_or(SchemaError::UnsupportedDriver(self.driver))?;
            lines.push(format!("  {sql}"));
        }

        statement.push_str(&lines.join(&format!(",{eol}")));
        statement.push_str(eol);
        match self.driver {
            DriverKind::Mysql => statement.push_str(&format!(") ENGINE={};", self.table.engine())),
            DriverKind::Sqlite | DriverKind::Pgsql => statement.push_str(");"),
        }

        Ok(statement)
    }

    fn column_definition(&self, column: &Column) -> Result<String, SchemaError> {
        let sql_type = column
            .sql_type(self.driver)
            .ok_or(SchemaError::UnsupportedDriver(self.driver))?;
        let mut def = format!("  `{}` {sql_type}", column.name());

        if column.is_unsigned() && !(self.driver == DriverKind::Sqlite && column.is_auto_increment()) {
            def.push_str(" UNSIGNED");
        }

        if self.table.primary_key_name() == Some(column.name()) {
            def.push_str(" PRIMARY KEY");
        }

        if column.is_auto_increment() {
            def.push_str(match self.driver {
                DriverKind::Mysql => " auto_increment",
                DriverKind::Sqlite | DriverKind::Pgsql => " AUTOINCREMENT",
            });
        }

        if column.is_unique() && self.driver == DriverKind::Sqlite {
            def.push_str(" UNIQUE");
        }

        if self.driver == DriverKind::Mysql {
            if let Some(charset) = column.charset_name() {
                def.push_str(&format!(" CHARACTER SET {charset}"));
            }
            if let Some(collation) = column.collation_name() {
                def.push_str(&format!(" COLLATE {collation}"));
            }
        }

        if !column.is_nullable() {
            def.push_str(" NOT NULL");
        }

        match column.default_value() {
            Some(Value::Null) | None => {
                if column.is_nullable() {
                    def.push_str(" default NULL");
                }
            }
            Some(value) => {
                def.push_str(" default ");
                def.push_str(&default_literal(value));
            }
        }

        Ok(def)
    }
}

fn default_literal(value: &Value) -> String {
    match value {
        Value::Text(s) => quote_literal(s),
        Value::Bool(b) => i32::from(*b).to_string(),
        Value::Blob(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            format!("x'{hex}'")
        }
        other => other.to_string(),
    }
}
