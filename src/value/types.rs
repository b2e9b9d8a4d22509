//! Semantic column data types.
//!
//! Every schema column maps onto one of three semantic types. ORM validation
//! compares a value's runtime [`type_name`](super::Value::type_name) against
//! [`DataType::as_str`], so the two vocabularies must stay aligned.

use super::Value;
use std::fmt;

/// Semantic type of a column as seen by the ORM layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    Double,
    String,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Integer => "integer",
            DataType::Double => "double",
            DataType::String => "string",
        }
    }

    /// Whether a non-null value carries this runtime type.
    pub fn accepts(self, value: &Value) -> bool {
        value.is_scalar() && value.type_name() == self.as_str()
    }

    /// Coerce a raw driver value into this semantic type.
    ///
    /// Integer and double columns go through a numeric cast; string columns
    /// pass through unchanged.
    pub fn coerce(self, value: Value) -> Value {
        match self {
            DataType::Integer => Value::Int(value.to_integer()),
            DataType::Double => Value::Float(value.to_double()),
            DataType::String => value,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_matches_runtime_type() {
        assert!(DataType::Integer.accepts(&Value::Int(3)));
        assert!(!DataType::Integer.accepts(&Value::Float(3.0)));
        assert!(DataType::Double.accepts(&Value::Float(0.5)));
        assert!(DataType::String.accepts(&Value::from("a")));
        assert!(DataType::String.accepts(&Value::Blob(vec![0xff])));
        assert!(!DataType::String.accepts(&Value::Bool(true)));
        assert!(!DataType::String.accepts(&Value::Null));
    }

    #[test]
    fn test_coerce() {
        assert_eq!(DataType::Integer.coerce(Value::from("17")), Value::Int(17));
        assert_eq!(DataType::Double.coerce(Value::Int(2)), Value::Float(2.0));
        assert_eq!(DataType::String.coerce(Value::Int(2)), Value::Int(2));
    }
}
