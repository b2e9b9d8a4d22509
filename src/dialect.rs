//! Per-driver SQL strings.
//!
//! The builders never inline caller values; the only text that varies by
//! backend is identifier quoting, the LIMIT/OFFSET form, row locking, the
//! always-true WHERE sentinel, upserts and duplicate-ignoring inserts.

use crate::connection::DriverKind;

/// SQL dialect of one driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    kind: DriverKind,
}

impl Dialect {
    pub fn new(kind: DriverKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> DriverKind {
        self.kind
    }

    /// Quote an identifier: backticks for MySQL and SQLite, double quotes for
    /// PostgreSQL. Embedded quote characters are doubled.
    pub fn quote(&self, ident: &str) -> String {
        let q = match self.kind {
            DriverKind::Pgsql => '"',
            DriverKind::Mysql | DriverKind::Sqlite => '`',
        };
        let mut out = String::with_capacity(ident.len() + 2);
        out.push(q);
        for c in ident.chars() {
            if c == q {
                out.push(q);
            }
            out.push(c);
        }
        out.push(q);
        out
    }

    /// Condition used when no WHERE clause was given.
    pub fn always_true(&self) -> &'static str {
        match self.kind {
            DriverKind::Pgsql => "TRUE",
            DriverKind::Mysql | DriverKind::Sqlite => "1",
        }
    }

    /// ` LIMIT ...` with an explicit offset.
    pub fn limit_offset(&self, start: u64, limit: u64) -> String {
        match self.kind {
            DriverKind::Pgsql => format!(" LIMIT {limit} OFFSET {start}"),
            DriverKind::Mysql | DriverKind::Sqlite => format!(" LIMIT {start},{limit}"),
        }
    }

    /// ` LIMIT n` without an offset.
    pub fn limit(&self, limit: u64) -> String {
        format!(" LIMIT {limit}")
    }

    /// Row lock suffix for SELECT. SQLite has no row locks.
    pub fn lock_clause(&self) -> &'static str {
        match self.kind {
            DriverKind::Sqlite => "",
            DriverKind::Mysql | DriverKind::Pgsql => " FOR UPDATE",
        }
    }

    /// `INSERT INTO t (cols) VALUES (:cols)`, optionally ignoring duplicate keys.
    pub fn insert(&self, table: &str, cols: &[&str], ignore_duplicate: bool) -> String {
        let head = match (ignore_duplicate, self.kind) {
            (true, DriverKind::Mysql) => "INSERT IGNORE",
            (true, DriverKind::Sqlite) => "INSERT OR IGNORE",
            _ => "INSERT",
        };
        let mut sql = format!(
            "{head} INTO {} ({}) VALUES ({})",
            self.quote(table),
            self.column_list(cols),
            placeholder_list(cols)
        );
        if ignore_duplicate && self.kind == DriverKind::Pgsql {
            sql.push_str(" ON CONFLICT DO NOTHING");
        }
        sql
    }

    /// Insert `insert_cols`, updating `update_cols` when `conflict_col` already exists.
    ///
    /// With nothing to update, MySQL rewrites the conflict column onto itself
    /// and the others do nothing.
    pub fn upsert(&self, table: &str, insert_cols: &[&str], update_cols: &[&str], conflict_col: &str) -> String {
        let insert = self.insert(table, insert_cols, false);
        match self.kind {
            DriverKind::Mysql => {
                let updates = if update_cols.is_empty() {
                    let q = self.quote(conflict_col);
                    format!("{q}={q}")
                } else {
                    update_cols
                        .iter()
                        .map(|c| format!("{}=:{c}", self.quote(c)))
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                format!("{insert} ON DUPLICATE KEY UPDATE {updates}")
            }
            DriverKind::Sqlite | DriverKind::Pgsql => {
                let target = self.quote(conflict_col);
                if update_cols.is_empty() {
                    format!("{insert} ON CONFLICT({target}) DO NOTHING")
                } else {
                    let updates = update_cols
                        .iter()
                        .map(|c| {
                            let q = self.quote(c);
                            format!("{q}=excluded.{q}")
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("{insert} ON CONFLICT({target}) DO UPDATE SET {updates}")
                }
            }
        }
    }

    /// `` `a`, `b` ``
    pub fn column_list(&self, cols: &[&str]) -> String {
        cols.iter().map(|c| self.quote(c)).collect::<Vec<_>>().join(", ")
    }
}

impl From<DriverKind> for Dialect {
    fn from(kind: DriverKind) -> Self {
        Self::new(kind)
    }
}

fn placeholder_list(cols: &[&str]) -> String {
    cols.iter().map(|c| format!(":{c}")).collect::<Vec<_>>().join(", ")
}
