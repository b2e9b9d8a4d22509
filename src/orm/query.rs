//! Single-use write queries for one model.

use super::{Model, Operation, OrmError};
use crate::dialect::Dialect;
use crate::executor::Database;
use crate::result::ExecutedQuery;
use crate::schema;
use crate::value::{Params, Value};
use std::fmt;

type FailureCallback<'m> = Box<dyn FnMut(&ExecutedQuery) + 'm>;

/// Save, insert, update or delete the row behind one model.
///
/// The row is matched on the table's primary key (or first unique column)
/// and the value that column had when the model was loaded. A query runs at
/// most once; build a new one for the next write.
///
/// On a failed write the connection's observer is notified, then the
/// [`on_fail`](ModelQuery::on_fail) callback runs, then
/// [`OrmError::Persistence`] is returned. On success the model's originals
/// are refreshed and its `after_query` hook runs.
pub struct ModelQuery<'m, 'db, M: Model> {
    db: &'db Database,
    model: &'m mut M,
    match_column: Option<String>,
    match_value: Value,
    executed: bool,
    expect_positive_row_count: bool,
    on_fail: Option<FailureCallback<'m>>,
}

impl<'m, 'db, M: Model> ModelQuery<'m, 'db, M> {
    pub fn new(db: &'db Database, model: &'m mut M) -> Self {
        let record = model.record();
        let (match_column, match_value) = match record.primary_col() {
            Some(col) => (
                Some(col.name().to_string()),
                record.original(col.name()).cloned().unwrap_or(Value::Null),
            ),
            None => (None, Value::Null),
        };
        Self {
            db,
            model,
            match_column,
            match_value,
            executed: false,
            expect_positive_row_count: true,
            on_fail: None,
        }
    }

    /// Match on another primary or unique column.
    ///
    /// # Errors
    ///
    /// - [`OrmError::ColumnNotFound`] for an undeclared column
    /// - [`OrmError::Validation`] when `value` does not fit the column
    /// - [`OrmError::NotPrimaryOrUnique`] for a column that cannot identify one row
    pub fn where_column(mut self, column: &str, value: impl Into<Value>) -> Result<Self, OrmError> {
        let value = value.into();
        let table = self.model.record().table();
        let col = table.col(column).ok_or_else(|| OrmError::ColumnNotFound {
            table: table.name().to_string(),
            column: column.to_string(),
        })?;
        schema::validate_column_value(table, col, &value)?;
        if !table.is_primary_or_unique(col) {
            return Err(OrmError::NotPrimaryOrUnique(column.to_string()));
        }

        self.match_column = Some(column.to_string());
        self.match_value = value;
        Ok(self)
    }

    /// Called with the failed statement before the error is returned.
    pub fn on_fail(mut self, callback: impl FnMut(&ExecutedQuery) + 'm) -> Self {
        self.on_fail = Some(Box::new(callback));
        self
    }

    /// Whether save, update and delete must affect at least one row. Defaults to true.
    pub fn expect_positive_row_count(mut self, expect: bool) -> Self {
        self.expect_positive_row_count = expect;
        self
    }

    pub fn match_column(&self) -> Option<&str> {
        self.match_column.as_deref()
    }

    pub fn match_value(&self) -> &Value {
        &self.match_value
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Insert the row, or update the changed columns when the match column
    /// value already exists.
    ///
    /// # Errors
    ///
    /// - [`OrmError::AlreadyExecuted`] on a second run
    /// - [`OrmError::NoMatchColumn`] / [`OrmError::NoMatchValue`] without a match clause
    /// - [`OrmError::Validation`] for invalid field values
    /// - [`OrmError::Query`] when the statement cannot be prepared or bound
    /// - [`OrmError::Persistence`] when the write fails
    pub fn save(&mut self) -> Result<ExecutedQuery, OrmError> {
        self.before_query()?;
        let (column, value) = self.require_match(Operation::Save)?;
        let changes = self.model.record().changes()?;

        let update_cols = param_names(&changes);
        let mut data = changes;
        if !data.contains_name(&column) {
            data = data.with(&column, value.clone());
        }
        let insert_cols = param_names(&data);

        let sql = self.dialect().upsert(
            self.model.record().table().name(),
            &as_refs(&insert_cols),
            &as_refs(&update_cols),
            &column,
        );
        let query = self.db.exec(&sql, data, false)?;
        let expect = self.expect_positive_row_count;
        let query = self.check(Operation::Save, query, expect, |model| {
            format!("Failed to save {model} row")
        })?;

        let record = self.model.record_mut();
        if record.get(&column).is_none() {
            record.fill(&column, value);
        }
        record.commit();
        self.after_query();
        Ok(query)
    }

    /// Insert the row. Requires at least one change.
    ///
    /// # Errors
    ///
    /// - [`OrmError::AlreadyExecuted`] on a second run
    /// - [`OrmError::AlreadyExists`] when the model already has an original key
    /// - [`OrmError::NoChanges`] when nothing is set
    /// - [`OrmError::Validation`], [`OrmError::Query`] and [`OrmError::Persistence`]
    ///   as for [`ModelQuery::save`]
    pub fn insert(&mut self) -> Result<ExecutedQuery, OrmError> {
        self.insert_row(false)
    }

    /// Insert the row, skipping it silently when it collides with an existing key.
    ///
    /// # Errors
    ///
    /// Same as [`ModelQuery::insert`], except that zero inserted rows is not a failure.
    pub fn insert_ignore(&mut self) -> Result<ExecutedQuery, OrmError> {
        self.insert_row(true)
    }

    /// Update the changed columns of the matched row.
    ///
    /// # Errors
    ///
    /// - [`OrmError::NoChanges`] when nothing changed
    /// - otherwise as for [`ModelQuery::save`]
    pub fn update(&mut self) -> Result<ExecutedQuery, OrmError> {
        self.before_query()?;
        let (column, value) = self.require_match(Operation::Update)?;
        let changes = self.model.record().changes()?;
        if changes.is_empty() {
            return Err(OrmError::NoChanges {
                model: self.model.model_name(),
                operation: Operation::Update,
            });
        }

        let dialect = self.dialect();
        let sets = param_names(&changes)
            .iter()
            .map(|c| format!("{}=:{c}", dialect.quote(c)))
            .collect::<Vec<_>>()
            .join(", ");
        let match_param = format!("p_{column}");
        let sql = format!(
            "UPDATE {} SET {sets} WHERE {}=:{match_param}",
            dialect.quote(self.model.record().table().name()),
            dialect.quote(&column),
        );
        let data = changes.with(&match_param, value.clone());

        let query = self.db.exec(&sql, data, false)?;
        let expect = self.expect_positive_row_count;
        let query = self.check(Operation::Update, query, expect, |model| {
            format!("{model} with {column} => {value} could not be updated")
        })?;

        self.model.record_mut().commit();
        self.after_query();
        Ok(query)
    }

    /// Delete the matched row.
    ///
    /// # Errors
    ///
    /// As for [`ModelQuery::save`].
    pub fn delete(&mut self) -> Result<ExecutedQuery, OrmError> {
        self.before_query()?;
        let (column, value) = self.require_match(Operation::Delete)?;

        let dialect = self.dialect();
        let sql = format!(
            "DELETE FROM {} WHERE {}=?",
            dialect.quote(self.model.record().table().name()),
            dialect.quote(&column),
        );
        let query = self.db.exec(&sql, Params::positional([value.clone()]), false)?;
        let expect = self.expect_positive_row_count;
        let query = self.check(Operation::Delete, query, expect, |model| {
            format!("{model} with {column} => {value} could not be deleted")
        })?;

        self.model.record_mut().clear_originals();
        self.after_query();
        Ok(query)
    }

    fn insert_row(&mut self, ignore_duplicate: bool) -> Result<ExecutedQuery, OrmError> {
        self.before_query()?;

        let record = self.model.record();
        let persisted = match record.primary_col() {
            Some(col) => record.original(col.name()).is_some_and(|v| !v.is_null()),
            None => record.is_persisted(),
        };
        if persisted {
            return Err(OrmError::AlreadyExists(self.model.model_name()));
        }

        let changes = record.changes()?;
        if changes.is_empty() {
            return Err(OrmError::NoChanges {
                model: self.model.model_name(),
                operation: Operation::Insert,
            });
        }

        let cols = param_names(&changes);
        let sql = self
            .dialect()
            .insert(record.table().name(), &as_refs(&cols), ignore_duplicate);
        let query = self.db.exec(&sql, changes, false)?;
        let query = self.check(Operation::Insert, query, !ignore_duplicate, |model| {
            format!("Failed to insert {model} row")
        })?;

        if query.rows() > 0 {
            let last_id = self.db.last_insert_id();
            let record = self.model.record_mut();
            let auto_key = record
                .table()
                .primary_column()
                .filter(|c| c.is_auto_increment())
                .map(|c| c.name().to_string());
            if let (Some(key), Some(id)) = (auto_key, last_id) {
                if !matches!(record.get(&key), Some(v) if !v.is_null()) {
                    record.fill(&key, Value::Int(id));
                }
            }
            record.commit();
        }
        self.after_query();
        Ok(query)
    }

    fn dialect(&self) -> Dialect {
        Dialect::from(self.db.driver_kind())
    }

    fn before_query(&mut self) -> Result<(), OrmError> {
        if self.executed {
            return Err(OrmError::AlreadyExecuted);
        }
        self.model.before_query();
        Ok(())
    }

    fn after_query(&mut self) {
        self.executed = true;
        self.model.after_query();
    }

    fn require_match(&self, operation: Operation) -> Result<(String, Value), OrmError> {
        let column = self.match_column.clone().ok_or_else(|| OrmError::NoMatchColumn {
            model: self.model.model_name(),
            operation,
        })?;
        if self.match_value.is_null() {
            return Err(OrmError::NoMatchValue {
                model: self.model.model_name(),
                operation,
                column,
            });
        }
        Ok((column, self.match_value.clone()))
    }

    fn check(
        &mut self,
        operation: Operation,
        query: ExecutedQuery,
        expect_positive_row_count: bool,
        message: impl FnOnce(&str) -> String,
    ) -> Result<ExecutedQuery, OrmError> {
        if query.is_success(expect_positive_row_count) {
            return Ok(query);
        }

        if let Some(observer) = self.db.observer() {
            observer.on_model_query_fail(&query);
        }
        if let Some(callback) = self.on_fail.as_mut() {
            callback(&query);
        }

        let model = self.model.model_name();
        let message = message(&model);
        log::warn!("{message}: {query}");
        Err(OrmError::Persistence {
            model,
            operation,
            message,
            query: Box::new(query),
        })
    }
}

impl<M: Model> fmt::Debug for ModelQuery<'_, '_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelQuery")
            .field("model", &self.model.model_name())
            .field("match_column", &self.match_column)
            .field("match_value", &self.match_value)
            .field("executed", &self.executed)
            .field("expect_positive_row_count", &self.expect_positive_row_count)
            .finish()
    }
}

fn param_names(params: &Params) -> Vec<String> {
    params
        .keys()
        .filter_map(|k| k.as_name().map(str::to_string))
        .collect()
}

fn as_refs(names: &[String]) -> Vec<&str> {
    names.iter().map(String::as_str).collect()
}
