//! ORM reads.

use super::{Model, OrmError, Record};
use crate::dialect::Dialect;
use crate::schema::{self, BoundTable};
use crate::value::{Params, Value};
use std::fmt;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Asc,
    Desc,
}

/// Load models of one table.
///
/// Either match columns by value ([`col`](FindQuery::col),
/// [`matching`](FindQuery::matching)) or give a raw `WHERE ...` clause
/// ([`raw`](FindQuery::raw)); the raw clause wins when both are set. Builder
/// errors are kept and returned by [`all`](FindQuery::all) /
/// [`first`](FindQuery::first).
pub struct FindQuery<'db, M: Model> {
    table: BoundTable<'db>,
    matches: Params,
    raw: Option<(String, Params)>,
    order: Option<(String, Direction)>,
    limit: Option<u64>,
    error: Option<OrmError>,
    model: PhantomData<fn() -> M>,
}

impl<'db, M: Model> FindQuery<'db, M> {
    pub fn new(table: BoundTable<'db>) -> Self {
        Self {
            table,
            matches: Params::new(),
            raw: None,
            order: None,
            limit: None,
            error: None,
            model: PhantomData,
        }
    }

    /// Match a single column, replacing earlier matches.
    pub fn col(self, column: &str, value: impl Into<Value>) -> Self {
        self.matching(Params::new().with(column, value))
    }

    /// Match every named column of `cols`, replacing earlier matches.
    pub fn matching(mut self, cols: impl Into<Params>) -> Self {
        self.matches = cols.into();
        self
    }

    /// Raw condition starting with `WHERE ` (any case).
    pub fn raw(mut self, clause: &str, params: impl Into<Params>) -> Self {
        match strip_where(clause) {
            Some(condition) => self.raw = Some((condition.to_string(), params.into())),
            None => self.fail(OrmError::InvalidQuery("Query must start with \"WHERE\"".to_string())),
        }
        self
    }

    pub fn asc(self, column: &str) -> Self {
        self.order_by(column, Direction::Asc)
    }

    pub fn desc(self, column: &str) -> Self {
        self.order_by(column, Direction::Desc)
    }

    /// At most `count` rows; must be at least 1.
    pub fn limit(mut self, count: u64) -> Self {
        if count < 1 {
            self.fail(OrmError::InvalidQuery("Invalid limit value".to_string()));
        } else {
            self.limit = Some(count);
        }
        self
    }

    /// Every matching model.
    ///
    /// # Errors
    ///
    /// - the first builder error, if any
    /// - [`OrmError::ColumnNotFound`] / [`OrmError::Validation`] for bad match columns
    /// - [`OrmError::InvalidQuery`] when there is nothing to match
    /// - [`OrmError::Query`] when the SELECT fails
    /// - [`OrmError::ModelNotFound`] when no row matches
    pub fn all(self) -> Result<Vec<M>, OrmError> {
        self.fetch()
    }

    /// The first matching model.
    ///
    /// # Errors
    ///
    /// Same as [`FindQuery::all`].
    pub fn first(mut self) -> Result<M, OrmError> {
        self.limit = Some(1);
        let table = self.location();
        self.fetch()?
            .into_iter()
            .next()
            .ok_or(OrmError::ModelNotFound(table))
    }

    fn fetch(mut self) -> Result<Vec<M>, OrmError> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }

        let (condition, params) = match self.raw.clone() {
            Some(raw) => raw,
            None => self.match_clause()?,
        };

        let db = self.table.db();
        let mut builder = db.query().table(self.table.table().name()).where_clause(&condition, params);
        if let Some((column, direction)) = &self.order {
            builder = match direction {
                Direction::Asc => builder.asc(&[column.as_str()]),
                Direction::Desc => builder.desc(&[column.as_str()]),
            };
        }
        if let Some(limit) = self.limit {
            builder = builder.limit(limit);
        }

        let rows = builder.fetch()?.all().map_err(|e| OrmError::Query(e.into()))?;
        if rows.is_empty() {
            return Err(OrmError::ModelNotFound(self.location()));
        }

        log::debug!("Loaded {} row(s) from {}", rows.len(), self.table.table().name());
        rows.into_iter()
            .map(|row| {
                let record = Record::from_row(self.table.table_arc(), row)?;
                let mut model = M::from_record(record);
                model.on_load();
                Ok(model)
            })
            .collect()
    }

    fn match_clause(&self) -> Result<(String, Params), OrmError> {
        let table = self.table.table();
        let dialect = Dialect::from(self.table.db().driver_kind());
        let mut conditions = Vec::with_capacity(self.matches.len());
        let mut values = Params::new();
        for (key, value) in &self.matches {
            let name = key.as_name().ok_or_else(|| {
                OrmError::InvalidQuery("All column names must be of type string".to_string())
            })?;
            let column = self.table.col(name)?;
            schema::validate_column_value(table, column, value)?;
            if value.is_null() {
                conditions.push(format!("{} IS NULL", dialect.quote(column.name())));
            } else {
                conditions.push(format!("{}=?", dialect.quote(column.name())));
                values.push(value.clone());
            }
        }

        if conditions.is_empty() {
            return Err(OrmError::InvalidQuery("Cannot build query; No columns to match".to_string()));
        }
        Ok((conditions.join(" AND "), values))
    }

    fn order_by(mut self, column: &str, direction: Direction) -> Self {
        match self.table.col(column) {
            Ok(col) => self.order = Some((col.name().to_string(), direction)),
            Err(e) => self.fail(e),
        }
        self
    }

    fn fail(&mut self, err: OrmError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// `dbname.table` for messages.
    fn location(&self) -> String {
        let table = self.table.table().name();
        match self.table.db().credentials() {
            Some(c) => format!("{}.{table}", c.dbname),
            None => table.to_string(),
        }
    }
}

impl<M: Model> fmt::Debug for FindQuery<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FindQuery")
            .field("table", &self.table.table().name())
            .field("matches", &self.matches)
            .field("raw", &self.raw)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("error", &self.error)
            .finish()
    }
}

/// Condition after a leading `WHERE` and one whitespace character.
fn strip_where(clause: &str) -> Option<&str> {
    let keyword = clause.get(..5)?;
    let separator = clause.as_bytes().get(5)?;
    if keyword.eq_ignore_ascii_case("where") && separator.is_ascii_whitespace() {
        Some(&clause[6..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_where() {
        assert_eq!(strip_where("WHERE `id` > ?"), Some("`id` > ?"));
        assert_eq!(strip_where("where\tx=1"), Some("x=1"));
        assert_eq!(strip_where("WHEREx=1"), None);
        assert_eq!(strip_where("SELECT 1"), None);
        assert_eq!(strip_where("wh"), None);
    }
}
