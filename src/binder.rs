//! Parameter binding.
//!
//! Every value handed to the executor gets a wire type before it reaches the
//! driver: booleans bind as [`ParamType::Bool`], integers as [`ParamType::Int`],
//! nulls as [`ParamType::Null`] and strings, floats and blobs as
//! [`ParamType::Str`]. Arrays and objects have no wire representation.
//!
//! Positional keys are shifted by one so the first positional value binds at
//! position 1. Callers never pre-offset.

use crate::value::{ParamKey, Params, Value};
use std::fmt;

/// Wire type a value is bound with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Bool,
    Int,
    Null,
    Str,
}

impl ParamType {
    /// Infer the wire type of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`BindTypeError`] for arrays and objects.
    pub fn infer(value: &Value) -> Result<Self, BindTypeError> {
        match value {
            Value::Bool(_) => Ok(ParamType::Bool),
            Value::Int(_) => Ok(ParamType::Int),
            Value::Null => Ok(ParamType::Null),
            Value::Text(_) | Value::Float(_) | Value::Blob(_) => Ok(ParamType::Str),
            Value::Array(_) | Value::Object(_) => Err(BindTypeError {
                type_name: value.type_name(),
            }),
        }
    }
}

/// A parameter value has no representable wire type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindTypeError {
    pub type_name: &'static str,
}

impl fmt::Display for BindTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cannot bind value of type {}", self.type_name)
    }
}

impl std::error::Error for BindTypeError {}

/// One parameter ready for [`Statement::bind_value`](crate::driver::Statement::bind_value).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam {
    pub key: ParamKey,
    pub value: Value,
    pub ty: ParamType,
}

/// Resolve the final key and wire type of every parameter in `params`.
///
/// Stops at the first value that cannot be bound; nothing is returned for a
/// partially bindable map.
///
/// # Errors
///
/// Returns [`BindTypeError`] when a value is an array or object.
pub fn bind(params: &Params) -> Result<Vec<BoundParam>, BindTypeError> {
    params
        .iter()
        .map(|(key, value)| {
            let ty = ParamType::infer(value)?;
            let key = match key {
                ParamKey::Index(i) => ParamKey::Index(i + 1),
                named => named.clone(),
            };
            Ok(BoundParam {
                key,
                value: value.clone(),
                ty,
            })
        })
        .collect()
}

/// The map actually sent to the driver, as echoed in diagnostics.
pub fn bound_params(bound: &[BoundParam]) -> Params {
    bound
        .iter()
        .map(|p| (p.key.clone(), p.value.clone()))
        .collect()
}
