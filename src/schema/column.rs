//! Column definitions.
//!
//! A [`Column`] carries everything the ORM and the DDL generator need to know
//! about one table column: its name, its [`ColumnKind`] (the storage type and
//! its size parameters), nullability, default value and attributes such as
//! `UNIQUE`, `UNSIGNED` or a MySQL character set.
//!
//! Builder methods never fail. Out-of-range settings are kept as given and
//! reported by [`Column::validate`], which [`Schema::register`](super::Schema::register)
//! runs for every column of a table.

use super::SchemaError;
use crate::connection::DriverKind;
use crate::value::{DataType, Value};
use once_cell::sync::Lazy;
use regex::Regex;

/// Largest length of a `varchar`/`char`/`varbinary`/`binary` column.
pub const LENGTH_MAX: u32 = 0xffff;
/// Largest total digit count of a decimal or floating point column.
pub const MAX_DIGITS: u8 = 65;
/// Largest scale of a decimal or floating point column with fewer digits.
pub const MAX_SCALE: u8 = 30;

static DECIMAL_DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").unwrap_or_else(|e| panic!("decimal pattern is invalid: {e}"))
});

/// Size class of MySQL `TEXT` and `BLOB` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LobSize {
    Tiny,
    #[default]
    Regular,
    Medium,
    Long,
}

impl LobSize {
    fn prefix(self) -> &'static str {
        match self {
            LobSize::Tiny => "TINY",
            LobSize::Regular => "",
            LobSize::Medium => "MEDIUM",
            LobSize::Long => "LONG",
        }
    }
}

/// Storage type of a column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    /// Integer of `size` bytes (1, 2, 3, 4 or 8).
    Integer {
        size: u8,
        unsigned: bool,
        auto_increment: bool,
    },
    /// `varchar(length)`, or `char(length)` when fixed.
    String { length: u32, fixed: bool },
    /// `varbinary(length)`, or `binary(length)` when fixed.
    Binary { length: u32, fixed: bool },
    Text { size: LobSize },
    Blob { size: LobSize },
    /// Exact numeric, exchanged as a decimal string.
    Decimal { digits: u8, scale: u8 },
    Float { digits: u8, scale: u8, unsigned: bool },
    Double { digits: u8, scale: u8, unsigned: bool },
    Enum { options: Vec<String> },
}

impl ColumnKind {
    /// Semantic type values of this column carry in the ORM.
    pub fn data_type(&self) -> DataType {
        match self {
            ColumnKind::Integer { .. } => DataType::Integer,
            ColumnKind::Float { .. } | ColumnKind::Double { .. } => DataType::Double,
            ColumnKind::String { .. }
            | ColumnKind::Binary { .. }
            | ColumnKind::Text { .. }
            | ColumnKind::Blob { .. }
            | ColumnKind::Decimal { .. }
            | ColumnKind::Enum { .. } => DataType::String,
        }
    }

    /// Whether MySQL applies a character set and collation to this column.
    pub fn is_textual(&self) -> bool {
        matches!(self, ColumnKind::String { .. } | ColumnKind::Text { .. })
    }
}

/// One table column.
///
/// # Example
///
/// ```
/// use lifeline::schema::Column;
///
/// let id = Column::integer("id").bytes(8).unsigned().auto_increment();
/// let email = Column::string("email").length(128).unique();
/// let note = Column::text("note").nullable();
/// # let _ = (id, email, note);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    nullable: bool,
    default: Option<Value>,
    unique: bool,
    charset: Option<String>,
    collation: Option<String>,
}

impl Column {
    fn with_kind(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            nullable: false,
            default: None,
            unique: false,
            charset: None,
            collation: None,
        }
    }

    /// 4 byte signed integer.
    pub fn integer(name: &str) -> Self {
        Self::with_kind(
            name,
            ColumnKind::Integer {
                size: 4,
                unsigned: false,
                auto_increment: false,
            },
        )
    }

    /// `varchar(255)`.
    pub fn string(name: &str) -> Self {
        Self::with_kind(
            name,
            ColumnKind::String {
                length: 255,
                fixed: false,
            },
        )
    }

    /// `varbinary(255)`.
    pub fn binary(name: &str) -> Self {
        Self::with_kind(
            name,
            ColumnKind::Binary {
                length: 255,
                fixed: false,
            },
        )
    }

    pub fn text(name: &str) -> Self {
        Self::with_kind(name, ColumnKind::Text { size: LobSize::default() })
    }

    pub fn blob(name: &str) -> Self {
        Self::with_kind(name, ColumnKind::Blob { size: LobSize::default() })
    }

    /// `decimal(10,0)` defaulting to `'0'`.
    pub fn decimal(name: &str) -> Self {
        let mut col = Self::with_kind(name, ColumnKind::Decimal { digits: 10, scale: 0 });
        col.default = Some(Value::from("0"));
        col
    }

    /// `float(10,0)` defaulting to `0`.
    pub fn float(name: &str) -> Self {
        let mut col = Self::with_kind(
            name,
            ColumnKind::Float {
                digits: 10,
                scale: 0,
                unsigned: false,
            },
        );
        col.default = Some(Value::Float(0.0));
        col
    }

    /// `double(10,0)` defaulting to `0`.
    pub fn double(name: &str) -> Self {
        let mut col = Self::with_kind(
            name,
            ColumnKind::Double {
                digits: 10,
                scale: 0,
                unsigned: false,
            },
        );
        col.default = Some(Value::Float(0.0));
        col
    }

    /// Enumeration of string options.
    pub fn enumeration(name: &str, options: &[&str]) -> Self {
        Self::with_kind(
            name,
            ColumnKind::Enum {
                options: options.iter().map(|o| (*o).to_string()).collect(),
            },
        )
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Default value. `Value::Null` is only valid on nullable columns.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Integer byte size: 1, 2, 3, 4 or 8. No effect on other kinds.
    pub fn bytes(mut self, size: u8) -> Self {
        if let ColumnKind::Integer { size: s, .. } = &mut self.kind {
            *s = size;
        }
        self
    }

    /// No effect on non-numeric kinds.
    pub fn unsigned(mut self) -> Self {
        match &mut self.kind {
            ColumnKind::Integer { unsigned, .. }
            | ColumnKind::Float { unsigned, .. }
            | ColumnKind::Double { unsigned, .. } => *unsigned = true,
            _ => {}
        }
        self
    }

    /// No effect on non-integer kinds.
    pub fn auto_increment(mut self) -> Self {
        if let ColumnKind::Integer { auto_increment, .. } = &mut self.kind {
            *auto_increment = true;
        }
        self
    }

    /// Variable length of a string or binary column.
    pub fn length(mut self, length: u32) -> Self {
        match &mut self.kind {
            ColumnKind::String { length: l, fixed } | ColumnKind::Binary { length: l, fixed } => {
                *l = length;
                *fixed = false;
            }
            _ => {}
        }
        self
    }

    /// Fixed length of a string or binary column (`char`, `binary`).
    pub fn fixed(mut self, length: u32) -> Self {
        match &mut self.kind {
            ColumnKind::String { length: l, fixed } | ColumnKind::Binary { length: l, fixed } => {
                *l = length;
                *fixed = true;
            }
            _ => {}
        }
        self
    }

    /// MySQL size class of a text or blob column.
    pub fn size(mut self, class: LobSize) -> Self {
        match &mut self.kind {
            ColumnKind::Text { size } | ColumnKind::Blob { size } => *size = class,
            _ => {}
        }
        self
    }

    /// Digits and scale of a decimal or floating point column.
    pub fn precision(mut self, digits: u8, scale: u8) -> Self {
        match &mut self.kind {
            ColumnKind::Decimal { digits: d, scale: s }
            | ColumnKind::Float { digits: d, scale: s, .. }
            | ColumnKind::Double { digits: d, scale: s, .. } => {
                *d = digits;
                *s = scale;
            }
            _ => {}
        }
        self
    }

    pub fn charset(mut self, charset: &str) -> Self {
        self.charset = Some(charset.to_string());
        self
    }

    pub fn collation(mut self, collation: &str) -> Self {
        self.collation = Some(collation.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    pub fn data_type(&self) -> DataType {
        self.kind.data_type()
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Declared default. `None` when no default was set.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(
            self.kind,
            ColumnKind::Integer { unsigned: true, .. }
                | ColumnKind::Float { unsigned: true, .. }
                | ColumnKind::Double { unsigned: true, .. }
        )
    }

    pub fn is_auto_increment(&self) -> bool {
        matches!(self.kind, ColumnKind::Integer { auto_increment: true, .. })
    }

    pub fn charset_name(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    pub fn collation_name(&self) -> Option<&str> {
        self.collation.as_deref()
    }

    pub(crate) fn apply_charset_defaults(&mut self, charset: &str, collation: &str) {
        if !self.kind.is_textual() {
            return;
        }
        if self.charset.is_none() {
            self.charset = Some(charset.to_string());
        }
        if self.collation.is_none() {
            self.collation = Some(collation.to_string());
        }
    }

    /// Check every setting against the limits of its kind.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidColumn`] naming the first problem found.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let invalid = |message: String| Err(SchemaError::InvalidColumn(message));

        if self.name.is_empty() {
            return invalid("Column name cannot be empty".to_string());
        }

        if matches!(self.default, Some(Value::Null)) && !self.nullable {
            return invalid(format!(
                "Default value for col \"{}\" cannot be NULL; Column is not nullable",
                self.name
            ));
        }

        if let Some(default) = self.default.as_ref().filter(|d| !d.is_null()) {
            let expected = self.kind.data_type();
            if !expected.accepts(default) {
                return invalid(format!(
                    "Default value for col \"{}\" must be of type \"{}\", got \"{}\"",
                    self.name,
                    expected,
                    default.type_name()
                ));
            }
        }

        match &self.kind {
            ColumnKind::Integer { size, unsigned, .. } => {
                if !matches!(size, 1 | 2 | 3 | 4 | 8) {
                    return invalid(format!("Invalid integer size {size} for col \"{}\"", self.name));
                }
                if *unsigned && self.default.as_ref().and_then(Value::as_i64).is_some_and(|d| d < 0) {
                    return invalid(format!(
                        "Cannot set signed integer as default value of col \"{}\"",
                        self.name
                    ));
                }
            }
            ColumnKind::String { length, .. } | ColumnKind::Binary { length, .. } => {
                if *length < 1 || *length > LENGTH_MAX {
                    return invalid(format!(
                        "Maximum length for col \"{}\" cannot exceed {LENGTH_MAX}",
                        self.name
                    ));
                }
            }
            ColumnKind::Decimal { digits, scale } => {
                check_precision(*digits, *scale)?;
                if let Some(default) = self.default.as_ref().and_then(Value::as_str) {
                    if !DECIMAL_DEFAULT.is_match(default) {
                        return invalid(format!("Bad default decimal value for col \"{}\"", self.name));
                    }
                }
            }
            ColumnKind::Float { digits, scale, .. } | ColumnKind::Double { digits, scale, .. } => {
                check_precision(*digits, *scale)?;
            }
            ColumnKind::Enum { options } => {
                if options.is_empty() {
                    return invalid(format!("Enum col \"{}\" has no options", self.name));
                }
                if let Some(default) = self.default.as_ref().and_then(Value::as_str) {
                    if !options.iter().any(|o| o == default) {
                        return invalid(format!(
                            "Default value for \"{}\" must be from defined options",
                            self.name
                        ));
                    }
                }
            }
            ColumnKind::Text { .. } | ColumnKind::Blob { .. } => {}
        }

        Ok(())
    }

    /// Type portion of the column definition, `None` when the driver has no
    /// mapping for this kind.
    pub fn sql_type(&self, driver: DriverKind) -> Option<String> {
        let mysql = driver == DriverKind::Mysql;
        match &self.kind {
            ColumnKind::Integer { size, .. } => Some(
                if mysql {
                    match size {
                        1 => "tinyint",
                        2 => "smallint",
                        3 => "mediumint",
                        8 => "bigint",
                        _ => "int",
                    }
                } else {
                    "integer"
                }
                .to_string(),
            ),
            ColumnKind::String { length, fixed } => Some(match driver {
                DriverKind::Mysql | DriverKind::Pgsql => {
                    format!("{}({length})", if *fixed { "char" } else { "varchar" })
                }
                DriverKind::Sqlite => "TEXT".to_string(),
            }),
            ColumnKind::Binary { length, fixed } => Some(if mysql {
                format!("{}({length})", if *fixed { "binary" } else { "varbinary" })
            } else {
                "BLOB".to_string()
            }),
            ColumnKind::Text { size } => Some(if mysql {
                format!("{}TEXT", size.prefix())
            } else {
                "TEXT".to_string()
            }),
            ColumnKind::Blob { size } => Some(if mysql {
                format!("{}BLOB", size.prefix())
            } else {
                "BLOB".to_string()
            }),
            ColumnKind::Decimal { digits, scale } => match driver {
                DriverKind::Mysql => Some(format!("decimal({digits},{scale})")),
                DriverKind::Sqlite => Some("REAL".to_string()),
                DriverKind::Pgsql => None,
            },
            ColumnKind::Float { digits, scale, .. } => match driver {
                DriverKind::Mysql => Some(format!("float({digits},{scale})")),
                DriverKind::Sqlite => Some("REAL".to_string()),
                DriverKind::Pgsql => None,
            },
            ColumnKind::Double { digits, scale, .. } => match driver {
                DriverKind::Mysql => Some(format!("double({digits},{scale})")),
                DriverKind::Sqlite => Some("REAL".to_string()),
                DriverKind::Pgsql => None,
            },
            ColumnKind::Enum { options } => {
                let list = options
                    .iter()
                    .map(|o| quote_literal(o))
                    .collect::<Vec<_>>()
                    .join(",");
                match driver {
                    DriverKind::Mysql => Some(format!("enum({list})")),
                    DriverKind::Sqlite => Some(format!("TEXT CHECK(`{}` in ({list}))", self.name)),
                    DriverKind::Pgsql => None,
                }
            }
        }
    }
}

fn check_precision(digits: u8, scale: u8) -> Result<(), SchemaError> {
    if !(1..=MAX_DIGITS).contains(&digits) {
        return Err(SchemaError::InvalidColumn(format!(
            "Precision digits must be between 1 and {MAX_DIGITS}"
        )));
    }
    let max_scale = digits.max(MAX_SCALE);
    if scale > max_scale {
        return Err(SchemaError::InvalidColumn(format!(
            "Scale digits must be between 0 and {max_scale}"
        )));
    }
    Ok(())
}

/// `'text'` with embedded quotes doubled.
pub(crate) fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
