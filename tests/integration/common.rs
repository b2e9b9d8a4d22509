//! Shared fixtures: the `users` table and a seeded connection.

use lifeline::schema::{Column, Migration, Schema, Table};
use lifeline::{params, Database, DriverKind, QueryObserver};
use lifeline::{ExecutedQuery, QueryExecutionFailure};
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn users_table() -> Table {
    Table::new("users")
        .column(Column::integer("id").auto_increment())
        .column(Column::string("name").length(64))
        .column(Column::string("email").nullable().unique())
        .column(Column::integer("age").nullable())
        .primary_key("id")
}

pub fn schema() -> Schema {
    let mut schema = Schema::new();
    schema.register(users_table()).unwrap();
    schema
}

/// Create `users` on `db` from the rendered DDL.
pub fn create_users(db: &Database) {
    let table = users_table();
    let ddl = Migration::new(&table, DriverKind::Sqlite).create_table().unwrap();
    db.exec(&ddl, params![], true).unwrap();
}

pub fn insert_user(db: &Database, id: i64, name: &str, age: Option<i64>) {
    db.query()
        .table("users")
        .insert(params! { "id" => id, "name" => name, "age" => age })
        .unwrap();
}

/// In-memory database with users 1..=10, named `user{id}`, aged `20 + id`,
/// plus Bob with id 7 replacing `user7`.
pub fn seeded() -> Database {
    let db = Database::open_sqlite(":memory:").unwrap();
    create_users(&db);
    for id in 1..=10 {
        let name = if id == 7 { "Bob".to_string() } else { format!("user{id}") };
        insert_user(&db, id, &name, Some(20 + id));
    }
    db
}

#[derive(Default)]
pub struct CountingObserver {
    pub exec_failures: AtomicUsize,
    pub model_failures: AtomicUsize,
}

impl CountingObserver {
    pub fn exec_failures(&self) -> usize {
        self.exec_failures.load(Ordering::SeqCst)
    }

    pub fn model_failures(&self) -> usize {
        self.model_failures.load(Ordering::SeqCst)
    }
}

impl QueryObserver for CountingObserver {
    fn on_query_exec_fail(&self, _failure: &QueryExecutionFailure) {
        self.exec_failures.fetch_add(1, Ordering::SeqCst);
    }

    fn on_model_query_fail(&self, _query: &ExecutedQuery) {
        self.model_failures.fetch_add(1, Ordering::SeqCst);
    }
}
