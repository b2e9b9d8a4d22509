//! Ordered parameter maps.
//!
//! A parameter map keeps insertion order and accepts either positional keys
//! (0-based sequence indices) or named keys. Named keys are stored without a
//! leading `:`.

use super::Value;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// Key of a bound parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamKey {
    Index(usize),
    Name(String),
}

impl ParamKey {
    pub fn name(name: &str) -> Self {
        ParamKey::Name(name.trim_start_matches(':').to_string())
    }

    pub fn is_named(&self) -> bool {
        matches!(self, ParamKey::Name(_))
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            ParamKey::Name(n) => Some(n),
            ParamKey::Index(_) => None,
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKey::Index(i) => write!(f, "{i}"),
            ParamKey::Name(n) => write!(f, ":{n}"),
        }
    }
}

/// Insertion-ordered map from [`ParamKey`] to [`Value`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(ParamKey, Value)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional parameters; the first value gets index 0.
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            entries: values
                .into_iter()
                .enumerate()
                .map(|(i, v)| (ParamKey::Index(i), v.into()))
                .collect(),
        }
    }

    /// Named parameters in the given order.
    pub fn named<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut params = Self::new();
        for (k, v) in values {
            params.insert(ParamKey::name(k.as_ref()), v);
        }
        params
    }

    /// Add a named value, builder style.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(ParamKey::name(name), value);
        self
    }

    /// Insert or replace a value, keeping the original position on replace.
    pub fn insert(&mut self, key: ParamKey, value: impl Into<Value>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Append a positional value after the current highest index.
    pub fn push(&mut self, value: impl Into<Value>) {
        let next = self
            .entries
            .iter()
            .filter_map(|(k, _)| match k {
                ParamKey::Index(i) => Some(i + 1),
                ParamKey::Name(_) => None,
            })
            .max()
            .unwrap_or(0);
        self.entries.push((ParamKey::Index(next), value.into()));
    }

    pub fn get(&self, key: &ParamKey) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_named(&self, name: &str) -> Option<&Value> {
        self.get(&ParamKey::name(name))
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.get_named(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every key is named (an empty map counts as named).
    pub fn all_named(&self) -> bool {
        self.entries.iter().all(|(k, _)| k.is_named())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParamKey, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &ParamKey> {
        self.entries.iter().map(|(k, _)| k)
    }
}

impl IntoIterator for Params {
    type Item = (ParamKey, Value);
    type IntoIter = std::vec::IntoIter<(ParamKey, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a ParamKey, &'a Value);
    type IntoIter = Box<dyn Iterator<Item = (&'a ParamKey, &'a Value)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl FromIterator<(ParamKey, Value)> for Params {
    fn from_iter<T: IntoIterator<Item = (ParamKey, Value)>>(iter: T) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Params::positional(values)
    }
}

impl<V: Into<Value>, const N: usize> From<[(&str, V); N]> for Params {
    fn from(values: [(&str, V); N]) -> Self {
        Params::named(values)
    }
}

impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(&k.to_string(), v)?;
        }
        map.end()
    }
}

/// Build a [`Params`] map.
///
/// ```
/// use lifeline::params;
///
/// let named = params! { "id" => 7, "name" => "Bob" };
/// assert_eq!(named.len(), 2);
///
/// let positional = params![5, "x"];
/// assert!(!positional.all_named());
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::value::Params::new()
    };
    ($($key:literal => $value:expr),+ $(,)?) => {{
        let mut params = $crate::value::Params::new();
        $(params.insert($crate::value::ParamKey::name($key), $value);)+
        params
    }};
    ($($value:expr),+ $(,)?) => {{
        let mut params = $crate::value::Params::new();
        $(params.push($value);)+
        params
    }};
}
