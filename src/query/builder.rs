//! Fluent query builder.
//!
//! A [`QueryBuilder`] accumulates one logical query against one table, then a
//! terminal call ([`insert`](QueryBuilder::insert),
//! [`update`](QueryBuilder::update), [`delete`](QueryBuilder::delete),
//! [`fetch`](QueryBuilder::fetch), [`paginate`](QueryBuilder::paginate))
//! renders the SQL and hands it to the [`Database`] executor. Values always
//! travel as bound parameters; only builder-typed LIMIT integers are inlined.

use super::paginated::Paginated;
use crate::dialect::Dialect;
use crate::executor::{Database, QueryError};
use crate::placeholders;
use crate::result::{ExecutedQuery, ResultCursor};
use crate::value::{ParamKey, Params, Row};
use std::fmt;

const DEFAULT_PER_PAGE: u64 = 100;

/// Misuse of the builder. Never governed by `throw_on_fail`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderError {
    InsertIndexed,
    UpdateWithoutWhere,
    UpdateIndexed,
    UpdateWhereNotNamed,
    DeleteWithoutWhere,
}

impl fmt::Display for BuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            BuilderError::InsertIndexed => "INSERT query cannot accept indexed array",
            BuilderError::UpdateWithoutWhere => "UPDATE query requires WHERE clause",
            BuilderError::UpdateIndexed => "UPDATE query cannot accept indexed array",
            BuilderError::UpdateWhereNotNamed => "WHERE clause for UPDATE query requires named parameters",
            BuilderError::DeleteWithoutWhere => "DELETE query requires WHERE clause",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for BuilderError {}

/// Builder for one query on one table.
///
/// # Examples
///
/// ```
/// use lifeline::{params, Database};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let db = Database::open_sqlite(":memory:")?;
/// db.exec("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", params!(), true)?;
/// db.query().table("users").insert(params! { "id" => 7, "name" => "Bob" })?;
///
/// let rows = db.query().table("users").find(params! { "id" => 7 }).fetch()?.all()?;
/// assert_eq!(rows[0].get("name").and_then(|v| v.as_str()), Some("Bob"));
/// # Ok(())
/// # }
/// ```
pub struct QueryBuilder<'db> {
    db: &'db Database,
    dialect: Dialect,
    table: String,
    where_clause: Option<String>,
    params: Params,
    columns: String,
    lock: bool,
    order: String,
    start: Option<u64>,
    limit: Option<u64>,
    throw_on_fail: bool,
}

impl<'db> QueryBuilder<'db> {
    pub(crate) fn new(db: &'db Database) -> Self {
        Self {
            db,
            dialect: Dialect::new(db.driver_kind()),
            table: String::new(),
            where_clause: None,
            params: Params::new(),
            columns: "*".to_string(),
            lock: false,
            order: String::new(),
            start: None,
            limit: None,
            throw_on_fail: true,
        }
    }

    /// Whether failed executions are returned as errors (default `true`).
    pub fn options(mut self, throw_on_fail: bool) -> Self {
        self.throw_on_fail = throw_on_fail;
        self
    }

    pub fn table(mut self, name: &str) -> Self {
        self.table = name.trim().to_string();
        self
    }

    /// Raw WHERE condition with positional or named parameters. Replaces any
    /// earlier condition.
    pub fn where_clause(mut self, clause: &str, params: impl Into<Params>) -> Self {
        self.where_clause = Some(clause.to_string());
        self.params = params.into();
        self
    }

    /// Equality match on every named column, joined with `AND`. Positional
    /// entries are skipped; with nothing left the query matches every row.
    pub fn find(mut self, cols: impl Into<Params>) -> Self {
        let mut clauses = Vec::new();
        let mut params = Params::new();
        for (key, value) in cols.into() {
            let Some(name) = key.as_name() else {
                continue;
            };
            clauses.push(format!("{}=:{name}", self.dialect.quote(name)));
            params.insert(key.clone(), value);
        }
        self.where_clause = (!clauses.is_empty()).then(|| clauses.join(" AND "));
        self.params = params;
        self
    }

    /// Projection. Names containing parentheses are raw expressions and are
    /// not quoted.
    pub fn cols(mut self, cols: &[&str]) -> Self {
        self.columns = cols
            .iter()
            .map(|c| {
                let c = c.trim();
                if c.contains(['(', ')']) {
                    c.to_string()
                } else {
                    self.dialect.quote(c)
                }
            })
            .collect::<Vec<_>>()
            .join(",");
        self
    }

    /// Lock the selected rows (`FOR UPDATE`).
    pub fn lock(mut self) -> Self {
        self.lock = true;
        self
    }

    pub fn asc(self, cols: &[&str]) -> Self {
        self.order_by(cols, "ASC")
    }

    pub fn desc(self, cols: &[&str]) -> Self {
        self.order_by(cols, "DESC")
    }

    fn order_by(mut self, cols: &[&str], direction: &str) -> Self {
        self.order = if cols.is_empty() {
            String::new()
        } else {
            let cols: Vec<String> = cols.iter().map(|c| self.dialect.quote(c.trim())).collect();
            format!(" ORDER BY {} {direction}", cols.join(","))
        };
        self
    }

    pub fn start(mut self, from: u64) -> Self {
        self.start = Some(from);
        self
    }

    pub fn limit(mut self, count: u64) -> Self {
        self.limit = Some(count);
        self
    }

    /// `INSERT INTO table (cols) VALUES (:cols)`.
    ///
    /// # Errors
    ///
    /// [`BuilderError::InsertIndexed`] for positional keys, otherwise whatever
    /// [`Database::exec`] returns.
    pub fn insert(&self, assoc: impl Into<Params>) -> Result<ExecutedQuery, QueryError> {
        let assoc = assoc.into();
        if !assoc.all_named() {
            return Err(BuilderError::InsertIndexed.into());
        }
        let cols: Vec<&str> = assoc.keys().filter_map(|k| k.as_name()).collect();
        let sql = self.dialect.insert(&self.table, &cols, false);
        self.db.exec(&sql, assoc, self.throw_on_fail)
    }

    /// `UPDATE table SET col=:col, ... WHERE clause`.
    ///
    /// WHERE parameters are renamed with a `__` prefix (placeholders in the
    /// clause included) so they cannot collide with SET parameters. Callers
    /// must not name their own parameters with a leading `__`.
    ///
    /// # Errors
    ///
    /// [`BuilderError`] without a WHERE clause, with positional SET keys or
    /// with positional WHERE parameters; otherwise whatever
    /// [`Database::exec`] returns.
    pub fn update(&self, assoc: impl Into<Params>) -> Result<ExecutedQuery, QueryError> {
        let Some(clause) = self.restricting_clause() else {
            return Err(BuilderError::UpdateWithoutWhere.into());
        };
        let assoc = assoc.into();
        if !assoc.all_named() {
            return Err(BuilderError::UpdateIndexed.into());
        }
        if !self.params.all_named() {
            return Err(BuilderError::UpdateWhereNotNamed.into());
        }

        let set = assoc
            .keys()
            .filter_map(|k| k.as_name())
            .map(|c| format!("{}=:{c}", self.dialect.quote(c)))
            .collect::<Vec<_>>()
            .join(", ");

        let mut data = assoc;
        for (key, value) in &self.params {
            if let Some(name) = key.as_name() {
                data.insert(ParamKey::Name(format!("__{name}")), value.clone());
            }
        }

        let sql = format!(
            "UPDATE {} SET {set} WHERE {}",
            self.dialect.quote(&self.table),
            placeholders::prefix_named(clause, "__")
        );
        self.db.exec(&sql, data, self.throw_on_fail)
    }

    /// `DELETE FROM table WHERE clause`.
    ///
    /// # Errors
    ///
    /// [`BuilderError::DeleteWithoutWhere`] without a WHERE clause, otherwise
    /// whatever [`Database::exec`] returns.
    pub fn delete(&self) -> Result<ExecutedQuery, QueryError> {
        let Some(clause) = self.restricting_clause() else {
            return Err(BuilderError::DeleteWithoutWhere.into());
        };
        let sql = format!("DELETE FROM {} WHERE {clause}", self.dialect.quote(&self.table));
        self.db.exec(&sql, self.params.clone(), self.throw_on_fail)
    }

    /// The SELECT statement [`fetch`](QueryBuilder::fetch) runs.
    pub fn select_sql(&self) -> String {
        let limit = match (self.start, self.limit) {
            (Some(start), Some(limit)) if start > 0 && limit > 0 => self.dialect.limit_offset(start, limit),
            (_, Some(limit)) if limit > 0 => self.dialect.limit(limit),
            _ => String::new(),
        };
        format!(
            "SELECT {} FROM {} WHERE {}{}{}{}",
            self.columns,
            self.dialect.quote(&self.table),
            self.condition(),
            self.order,
            limit,
            if self.lock { self.dialect.lock_clause() } else { "" }
        )
    }

    /// Run the SELECT.
    ///
    /// # Errors
    ///
    /// Whatever [`Database::fetch`] returns.
    pub fn fetch(&self) -> Result<ResultCursor<'db>, QueryError> {
        self.db.fetch(&self.select_sql(), self.params.clone(), self.throw_on_fail)
    }

    /// Count matching rows, then fetch one page of them (`start` defaults to
    /// 0, `limit` to 100 rows per page).
    ///
    /// The count query always returns its failure as an error; the page query
    /// honours `throw_on_fail`.
    ///
    /// # Errors
    ///
    /// Whatever [`Database::fetch`] or [`ResultCursor::all`] return.
    pub fn paginate(&self) -> Result<Paginated, QueryError> {
        let start = self.start.unwrap_or(0);
        let per_page = self.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_PER_PAGE);

        let count_sql = format!(
            "SELECT count(*) FROM {} WHERE {}",
            self.dialect.quote(&self.table),
            self.condition()
        );
        let counted = self.db.fetch(&count_sql, self.params.clone(), true)?.all()?;
        let total_rows = counted
            .first()
            .and_then(Row::first)
            .map_or(0, |v| v.to_integer().max(0) as u64);

        let mut rows = Vec::new();
        if total_rows > 0 {
            let sql = format!(
                "SELECT {} FROM {} WHERE {}{}{}",
                self.columns,
                self.dialect.quote(&self.table),
                self.condition(),
                self.order,
                self.dialect.limit_offset(start, per_page)
            );
            rows = self.db.fetch(&sql, self.params.clone(), self.throw_on_fail)?.all()?;
        }

        Ok(Paginated::new(rows, total_rows, start, per_page))
    }

    /// The WHERE clause, unless it is missing, blank or the always-true
    /// sentinel.
    fn restricting_clause(&self) -> Option<&str> {
        self.where_clause.as_deref().filter(|clause| {
            let clause = clause.trim();
            !clause.is_empty() && !clause.eq_ignore_ascii_case(self.dialect.always_true())
        })
    }

    fn condition(&self) -> &str {
        self.where_clause
            .as_deref()
            .unwrap_or_else(|| self.dialect.always_true())
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Current WHERE condition, the always-true sentinel when none was set.
    pub fn where_sql(&self) -> &str {
        self.condition()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

impl fmt::Debug for QueryBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("table", &self.table)
            .field("where", &self.where_clause)
            .field("params", &self.params)
            .field("throw_on_fail", &self.throw_on_fail)
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::params;
    use crate::value::Value;

    fn db() -> Database {
        let db = Database::open_sqlite(":memory:").unwrap();
        db.exec(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, age INTEGER)",
            params!(),
            true,
        )
        .unwrap();
        db
    }

    #[test]
    fn test_select_sql_rendering() {
        let db = db();
        let q = db
            .query()
            .table(" users ")
            .cols(&["id", "count(name) AS n"])
            .where_clause("age > ?", params![18])
            .desc(&["age", "id"])
            .start(10)
            .limit(5)
            .lock();
        assert_eq!(
            q.select_sql(),
            "SELECT `id`,count(name) AS n FROM `users` WHERE age > ? ORDER BY `age`,`id` DESC LIMIT 10,5"
        );
    }

    #[test]
    fn test_zero_start_renders_plain_limit() {
        let db = db();
        let q = db.query().table("users").start(0).limit(3);
        assert_eq!(q.select_sql(), "SELECT * FROM `users` WHERE 1 LIMIT 3");
        let q = db.query().table("users").start(4);
        assert_eq!(q.select_sql(), "SELECT * FROM `users` WHERE 1");
    }

    #[test]
    fn test_find_builds_and_clause() {
        let db = db();
        let q = db.query().table("users").find(params! { "id" => 7, "name" => "Bob" });
        assert_eq!(q.where_sql(), "`id`=:id AND `name`=:name");
        assert_eq!(q.params().len(), 2);

        let q = db.query().table("users").find(params![1, 2]);
        assert_eq!(q.where_sql(), "1");
    }

    #[test]
    fn test_contract_violations() {
        let db = db();
        let err = db.query().table("users").update(params! { "name" => "x" }).unwrap_err();
        assert_eq!(err.to_string(), "UPDATE query requires WHERE clause");

        let err = db.query().table("users").delete().unwrap_err();
        assert_eq!(err.to_string(), "DELETE query requires WHERE clause");

        let err = db.query().table("users").insert(params![1, "x"]).unwrap_err();
        assert_eq!(err.to_string(), "INSERT query cannot accept indexed array");

        let err = db
            .query()
            .table("users")
            .where_clause("id = ?", params![1])
            .update(params! { "name" => "x" })
            .unwrap_err();
        assert_eq!(err.to_string(), "WHERE clause for UPDATE query requires named parameters");

        let err = db
            .query()
            .table("users")
            .where_clause("id = :id", params! { "id" => 1 })
            .update(params![1])
            .unwrap_err();
        assert!(matches!(err, QueryError::Builder(BuilderError::UpdateIndexed)));

        // contract violations are not silenced by throw_on_fail
        let err = db.query().table("users").options(false).delete().unwrap_err();
        assert!(matches!(err, QueryError::Builder(_)));
    }

    #[test]
    fn test_always_true_clause_does_not_unlock_writes() {
        let db = db();
        db.query().table("users").insert(params! { "id" => 1, "name" => "Ann" }).unwrap();

        for clause in ["1", " 1 ", ""] {
            let q = db.query().table("users").where_clause(clause, params!());
            let err = q.update(params! { "name" => "x" }).unwrap_err();
            assert!(matches!(err, QueryError::Builder(BuilderError::UpdateWithoutWhere)));
            let err = q.delete().unwrap_err();
            assert!(matches!(err, QueryError::Builder(BuilderError::DeleteWithoutWhere)));
        }

        let rows = db.query().table("users").fetch().unwrap().all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&Value::from("Ann")));

        let deleted = db.query().table("users").where_clause("1 = 1", params!()).delete().unwrap();
        assert_eq!(deleted.rows(), 1);
    }

    #[test]
    fn test_update_prefixes_where_params() {
        let db = db();
        db.query()
            .table("users")
            .insert(params! { "id" => 1, "name" => "Ann", "age" => 30 })
            .unwrap();

        let executed = db
            .query()
            .table("users")
            .where_clause("`id`=:id", params! { "id" => 1 })
            .update(params! { "id" => 2, "name" => "Anne" })
            .unwrap();
        assert_eq!(executed.query_string(), "UPDATE `users` SET `id`=:id, `name`=:name WHERE `id`=:__id");
        assert_eq!(executed.bound_data().get_named("__id"), Some(&Value::Int(1)));
        assert_eq!(executed.rows(), 1);

        let row = db.query().table("users").find(params! { "id" => 2 }).fetch().unwrap().next().unwrap();
        assert_eq!(row.get("name"), Some(&Value::from("Anne")));
    }

    #[test]
    fn test_delete_and_throw_on_fail() {
        let db = db();
        db.query().table("users").insert(params! { "id" => 1, "name" => "Ann" }).unwrap();
        let deleted = db.query().table("users").find(params! { "id" => 1 }).delete().unwrap();
        assert_eq!(deleted.rows(), 1);

        let quiet = db
            .query()
            .table("missing")
            .options(false)
            .insert(params! { "id" => 1 });
        // prepare failures surface even with throw_on_fail disabled
        assert!(matches!(quiet, Err(QueryError::Execution(_))));
    }
}
