//! Placeholder rewriting.
//!
//! Statements are written with `:name` and `?` placeholders. PostgreSQL only
//! understands `$1, $2, ...`, so before preparing, every placeholder is
//! replaced by its ordinal and the slot list remembers which caller key feeds
//! each ordinal. A named placeholder used twice shares one ordinal.
//!
//! The builder also renames the named placeholders of a WHERE clause when it
//! merges them with SET parameters ([`prefix_named`]). Quoted literals and
//! `::type` casts are left alone by both rewrites.

use crate::value::ParamKey;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"'(?:[^']|'')*'|"(?:[^"]|"")*"|::|:([A-Za-z_][A-Za-z0-9_]*)|\?"#)
        .unwrap_or_else(|e| panic!("placeholder pattern is invalid: {e}"))
});

/// A statement rewritten to `$n` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub sql: String,
    /// `slots[n - 1]` is the bound key that feeds `$n`. Positional keys are 1-based.
    pub slots: Vec<ParamKey>,
}

impl Rewritten {
    /// Ordinal (1-based) fed by `key`, if the statement uses it.
    pub fn ordinal(&self, key: &ParamKey) -> Option<usize> {
        self.slots.iter().position(|k| k == key).map(|i| i + 1)
    }
}

/// Rewrite `:name` and `?` placeholders to `$n`.
pub fn to_numbered(sql: &str) -> Rewritten {
    let mut slots: Vec<ParamKey> = Vec::new();
    let mut positional = 0usize;

    let rewritten = PLACEHOLDER.replace_all(sql, |caps: &Captures<'_>| {
        let whole = &caps[0];
        if let Some(name) = caps.get(1) {
            let key = ParamKey::Name(name.as_str().to_string());
            let ordinal = match slots.iter().position(|k| *k == key) {
                Some(i) => i + 1,
                None => {
                    slots.push(key);
                    slots.len()
                }
            };
            format!("${ordinal}")
        } else if whole == "?" {
            positional += 1;
            slots.push(ParamKey::Index(positional));
            format!("${}", slots.len())
        } else {
            whole.to_string()
        }
    });

    Rewritten {
        sql: rewritten.into_owned(),
        slots,
    }
}

/// Prefix every `:name` placeholder with `prefix`, e.g. `:id` -> `:__id`.
pub fn prefix_named(sql: &str, prefix: &str) -> String {
    PLACEHOLDER
        .replace_all(sql, |caps: &Captures<'_>| match caps.get(1) {
            Some(name) => format!(":{prefix}{}", name.as_str()),
            None => caps[0].to_string(),
        })
        .into_owned()
}
