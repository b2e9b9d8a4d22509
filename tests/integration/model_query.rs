use crate::common::{create_users, schema, seeded, CountingObserver};
use lifeline::orm::{Model, Operation, OrmError, Record};
use lifeline::schema::{Column, Schema, Table};
use lifeline::{params, Database, Value};
use std::sync::Arc;

/// Typed model over the `users` table with hook counters.
struct User {
    record: Record,
    loads: u32,
    writes: u32,
}

impl User {
    fn name(&self) -> Option<&str> {
        self.record.get("name").and_then(Value::as_str)
    }
}

impl Model for User {
    fn from_record(record: Record) -> Self {
        User {
            record,
            loads: 0,
            writes: 0,
        }
    }

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn model_name(&self) -> String {
        "User".to_string()
    }

    fn on_load(&mut self) {
        self.loads += 1;
    }

    fn after_query(&mut self) {
        self.writes += 1;
    }
}

fn empty_db() -> Database {
    let db = Database::open_sqlite(":memory:").unwrap();
    create_users(&db);
    db
}

#[test]
fn test_insert_fills_auto_increment_key() {
    let db = empty_db();
    let schema = schema();
    let mut alice = Record::new(schema.table("users").unwrap());
    alice.set("name", "Alice").unwrap().set("age", 31).unwrap();

    let query = alice.query(&db).insert().unwrap();
    assert_eq!(query.rows(), 1);
    assert_eq!(query.query_string(), "INSERT INTO `users` (`name`, `age`) VALUES (:name, :age)");
    assert_eq!(alice.get("id"), Some(&Value::Int(1)));
    assert_eq!(alice.original("name"), Some(&Value::from("Alice")));
    assert!(alice.changes().unwrap().is_empty());

    let err = alice.query(&db).insert().unwrap_err();
    assert!(matches!(err, OrmError::AlreadyExists(_)));
}

#[test]
fn test_insert_without_changes() {
    let db = empty_db();
    let mut blank = Record::new(schema().table("users").unwrap());
    let err = blank.query(&db).insert().unwrap_err();
    assert!(matches!(
        err,
        OrmError::NoChanges {
            operation: Operation::Insert,
            ..
        }
    ));
    assert_eq!(err.to_string(), "No data to insert users row");
}

#[test]
fn test_insert_ignore_skips_duplicates() {
    let db = seeded();
    let mut dup = Record::new(schema().table("users").unwrap());
    dup.set("name", "Clone").unwrap().set("email", None::<String>).unwrap();
    dup.set("id", 7).unwrap();

    let query = dup.query(&db).insert_ignore().unwrap();
    assert_eq!(query.rows(), 0);
    assert!(!dup.is_persisted());
}

#[test]
fn test_update_writes_only_changes() {
    let db = seeded();
    let schema = schema();
    let users = schema.bind(&db, "users").unwrap();
    let mut bob: User = users.find().col("id", 7).first().unwrap();
    assert_eq!(bob.loads, 1);
    assert_eq!(bob.name(), Some("Bob"));

    bob.record_mut().set("name", "Robert").unwrap();
    let query = bob.query(&db).update().unwrap();
    assert_eq!(query.rows(), 1);
    assert_eq!(query.query_string(), "UPDATE `users` SET `name`=:name WHERE `id`=:p_id");
    assert_eq!(bob.writes, 1);

    let reloaded: User = users.find().col("id", 7).first().unwrap();
    assert_eq!(reloaded.name(), Some("Robert"));
    assert_eq!(reloaded.record().get("age"), Some(&Value::Int(27)));

    let err = bob.query(&db).update().unwrap_err();
    assert_eq!(err.to_string(), "ORM model User has no changes for update");
}

#[test]
fn test_query_runs_once() {
    let db = seeded();
    let schema = schema();
    let mut user: Record = schema.bind(&db, "users").unwrap().find().col("id", 3).first().unwrap();
    user.set("age", 99).unwrap();

    let mut query = user.query(&db);
    query.update().unwrap();
    assert!(query.is_executed());
    assert!(matches!(query.delete(), Err(OrmError::AlreadyExecuted)));
}

#[test]
fn test_save_inserts_then_updates() {
    let db = empty_db();
    let schema = schema();
    let mut carol = Record::new(schema.table("users").unwrap());
    carol.set("name", "Carol").unwrap();

    let err = carol.query(&db).save().unwrap_err();
    assert!(matches!(err, OrmError::NoMatchValue { .. }));

    carol.query(&db).where_column("id", 5).unwrap().save().unwrap();
    assert_eq!(carol.get("id"), Some(&Value::Int(5)));
    assert!(carol.is_persisted());

    carol.set("age", 40).unwrap();
    let query = carol.query(&db).save().unwrap();
    assert!(query.query_string().contains("ON CONFLICT(`id`) DO UPDATE SET `age`=excluded.`age`"));

    let rows = db.query().table("users").fetch().unwrap().all().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("age"), Some(&Value::Int(40)));
}

#[test]
fn test_where_column_must_identify_one_row() {
    let db = seeded();
    let mut user = Record::new(schema().table("users").unwrap());
    let err = user.query(&db).where_column("age", 20).unwrap_err();
    assert!(matches!(err, OrmError::NotPrimaryOrUnique(_)));

    let err = user.query(&db).where_column("nope", 1).unwrap_err();
    assert!(matches!(err, OrmError::ColumnNotFound { .. }));

    let err = user.query(&db).where_column("id", "seven").unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));

    let query = user.query(&db).where_column("email", "a@example.com").unwrap();
    assert_eq!(query.match_column(), Some("email"));
}

#[test]
fn test_delete_clears_originals() {
    let db = seeded();
    let schema = schema();
    let users = schema.bind(&db, "users").unwrap();
    let mut user: Record = users.find().col("id", 2).first().unwrap();

    user.query(&db).delete().unwrap();
    assert!(!user.is_persisted());
    assert!(matches!(
        users.find::<Record>().col("id", 2).first(),
        Err(OrmError::ModelNotFound(_))
    ));
}

#[test]
fn test_failed_write_reports_before_returning() {
    let observer = Arc::new(CountingObserver::default());
    let db = Database::open_sqlite(":memory:").unwrap().with_observer(observer.clone());
    create_users(&db);
    let schema = schema();

    // name is NOT NULL and left unset
    let mut nameless = Record::new(schema.table("users").unwrap());
    nameless.set("age", 3).unwrap();

    let mut seen = Vec::new();
    let err = nameless
        .query(&db)
        .on_fail(|q| seen.push(q.query_string().to_string()))
        .insert()
        .unwrap_err();

    assert_eq!(seen, vec!["INSERT INTO `users` (`age`) VALUES (:age)".to_string()]);
    assert_eq!(observer.model_failures(), 1);
    assert_eq!(observer.exec_failures(), 0);
    match &err {
        OrmError::Persistence { operation, message, .. } => {
            assert_eq!(*operation, Operation::Insert);
            assert_eq!(message, "Failed to insert users row");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.failed_query().and_then(|q| q.error()).is_some());
    assert!(!nameless.is_persisted());
}

#[test]
fn test_update_of_vanished_row_fails() {
    let db = seeded();
    let schema = schema();
    let mut user: Record = schema.bind(&db, "users").unwrap().find().col("id", 4).first().unwrap();
    db.exec("DELETE FROM users WHERE id = ?", params![4], true).unwrap();

    user.set("age", 50).unwrap();
    let err = user.query(&db).update().unwrap_err();
    assert!(matches!(err, OrmError::Persistence { .. }));
    assert_eq!(user.original("age"), Some(&Value::Int(24)));

    user.set("age", 51).unwrap();
    let query = user.query(&db).expect_positive_row_count(false).update().unwrap();
    assert_eq!(query.rows(), 0);
}

#[test]
fn test_invalid_values_are_rejected_before_writing() {
    let db = seeded();
    let schema = schema();
    let mut user: Record = schema.bind(&db, "users").unwrap().find().col("id", 1).first().unwrap();
    user.set("name", Value::Null).unwrap();
    let err = user.query(&db).update().unwrap_err();
    assert_eq!(err.to_string(), "Column \"users.name\" cannot be NULL");

    user.set("name", "ok").unwrap().set("age", "old").unwrap();
    let err = user.query(&db).update().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Column \"users.age\" expects value of type \"integer\", got \"string\""
    );
    assert!(matches!(user.set("nope", 1), Err(OrmError::ColumnNotFound { .. })));
}

#[test]
fn test_snapshot_survives_serialization() {
    let db = seeded();
    let schema = schema();
    let mut user: Record = schema.bind(&db, "users").unwrap().find().col("id", 9).first().unwrap();
    user.set("name", "Nina").unwrap();

    let json = serde_json::to_string(&user.snapshot().unwrap()).unwrap();
    let mut restored = Record::restore(schema.table("users").unwrap(), serde_json::from_str(&json).unwrap()).unwrap();
    assert_eq!(restored.original("name"), Some(&Value::from("user9")));

    restored.query(&db).update().unwrap();
    let row = db
        .query()
        .table("users")
        .find(params! { "id" => 9 })
        .fetch()
        .unwrap()
        .next()
        .unwrap();
    assert_eq!(row.get("name"), Some(&Value::from("Nina")));
}

#[test]
fn test_keyless_table_cannot_be_matched() {
    let db = empty_db();
    let mut schema = Schema::new();
    schema.register(Table::new("notes").column(Column::string("body"))).unwrap();

    let mut note = Record::new(schema.table("notes").unwrap());
    note.set("body", "hello").unwrap();
    assert_eq!(note.query(&db).match_column(), None);

    let err = note.query(&db).update().unwrap_err();
    assert!(matches!(
        err,
        OrmError::NoMatchColumn {
            operation: Operation::Update,
            ..
        }
    ));
    assert_eq!(err.to_string(), "UPDATE query on a notes model requires a PRIMARY or UNIQUE col");

    let err = note.query(&db).save().unwrap_err();
    assert_eq!(err.to_string(), "SAVE query on a notes model requires a PRIMARY or UNIQUE col");

    let err = note.query(&db).delete().unwrap_err();
    assert!(matches!(
        err,
        OrmError::NoMatchColumn {
            operation: Operation::Delete,
            ..
        }
    ));
    assert_eq!(db.query_count(), 1);
}
