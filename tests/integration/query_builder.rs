use crate::common::{seeded, CountingObserver};
use lifeline::{params, Database, QueryError, Value};
use std::sync::Arc;

#[test]
fn test_find_by_column() {
    let db = seeded();
    let rows = db
        .query()
        .table("users")
        .find(params! { "id" => 7 })
        .fetch()
        .unwrap()
        .all()
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&Value::from("Bob")));
    assert_eq!(rows[0].get("age"), Some(&Value::Int(27)));
}

#[test]
fn test_where_clause_with_limit() {
    let db = seeded();
    let builder = db
        .query()
        .table("users")
        .where_clause("id > ?", params![5])
        .asc(&["id"])
        .limit(2);
    assert_eq!(
        builder.select_sql(),
        "SELECT * FROM `users` WHERE id > ? ORDER BY `id` ASC LIMIT 2"
    );

    let ids: Vec<i64> = builder
        .fetch()
        .unwrap()
        .map(|row| row.get("id").and_then(Value::as_i64).unwrap())
        .collect();
    assert_eq!(ids, vec![6, 7]);
}

#[test]
fn test_projection_and_offset() {
    let db = seeded();
    let counted = db
        .query()
        .table("users")
        .cols(&["count(*)"])
        .where_clause("age >= :age", params! { "age" => 25 })
        .fetch()
        .unwrap()
        .next()
        .unwrap();
    assert_eq!(counted.first(), Some(&Value::Int(6)));

    let mut cursor = db
        .query()
        .table("users")
        .cols(&["name"])
        .desc(&["id"])
        .start(1)
        .limit(2)
        .fetch()
        .unwrap();
    assert_eq!(cursor.row_count(), 2);
    let first = cursor.next_row().unwrap();
    assert_eq!(first.names().collect::<Vec<_>>(), vec!["name"]);
    assert_eq!(first.get("name"), Some(&Value::from("user9")));
}

#[test]
fn test_update_and_delete() {
    let db = seeded();
    let updated = db
        .query()
        .table("users")
        .find(params! { "id" => 7 })
        .update(params! { "name" => "Robert" })
        .unwrap();
    assert_eq!(updated.rows(), 1);
    assert!(updated.query_string().contains("WHERE `id`=:__id"));

    let row = db
        .query()
        .table("users")
        .find(params! { "name" => "Robert" })
        .fetch()
        .unwrap()
        .next()
        .unwrap();
    assert_eq!(row.get("id"), Some(&Value::Int(7)));

    let deleted = db
        .query()
        .table("users")
        .where_clause("age > :age", params! { "age" => 28 })
        .delete()
        .unwrap();
    assert_eq!(deleted.rows(), 2);

    let remaining = db.query().table("users").paginate().unwrap();
    assert_eq!(remaining.total_rows(), 8);
}

#[test]
fn test_update_requires_where() {
    let db = seeded();
    let err = db.query().table("users").update(params! { "name" => "x" }).unwrap_err();
    assert!(matches!(err, QueryError::Builder(_)));
    let err = db.query().table("users").delete().unwrap_err();
    assert!(matches!(err, QueryError::Builder(_)));
}

#[test]
fn test_paginate() {
    let db = seeded();
    let page = db.query().table("users").asc(&["id"]).start(4).limit(4).paginate().unwrap();
    assert_eq!(page.total_rows(), 10);
    assert_eq!(page.page_count(), 3);
    assert_eq!(page.count(), 4);
    assert_eq!(page.pages().len(), 3);
    assert_eq!(page.pages()[2].start, 8);
    assert_eq!(page.rows()[0].get("id"), Some(&Value::Int(5)));

    let nav = page.compact_nav(1);
    assert_eq!(nav.current, 2);
    assert_eq!(nav.pages, vec![1, 2, 3]);
    assert_eq!(nav.prev, Some(1));
    assert_eq!(nav.next, Some(3));

    let json = page.to_json(false);
    assert_eq!(json["totalRows"], 10);
}

#[test]
fn test_paginate_empty_match() {
    let db = seeded();
    let page = db
        .query()
        .table("users")
        .where_clause("age > ?", params![100])
        .paginate()
        .unwrap();
    assert_eq!(page.total_rows(), 0);
    assert_eq!(page.page_count(), 0);
    assert!(page.rows().is_empty());
    assert!(page.pages().is_empty());
}

#[test]
fn test_failed_statement_notifies_observer() {
    let observer = Arc::new(CountingObserver::default());
    let db = Database::open_sqlite(":memory:").unwrap().with_observer(observer.clone());

    let err = db.exec("SELECT * FROM missing", params![], true).unwrap_err();
    assert!(matches!(err, QueryError::Execution(_)));
    assert_eq!(observer.exec_failures(), 1);

    db.exec("CREATE TABLE t (id INTEGER PRIMARY KEY)", params![], true).unwrap();
    db.exec("INSERT INTO t (id) VALUES (1)", params![], true).unwrap();

    // without throw_on_fail the failure is reported on the executed query
    let duplicate = db.exec("INSERT INTO t (id) VALUES (1)", params![], false).unwrap();
    assert!(!duplicate.is_success(false));
    assert_eq!(duplicate.error().map(|e| e.sql_state.as_str()), Some("23000"));
    assert_eq!(observer.exec_failures(), 1);

    assert_eq!(db.queries().count(), 3);
}

#[test]
fn test_composite_values_are_rejected() {
    let db = seeded();
    let err = db
        .exec(
            "SELECT * FROM users WHERE id = ?",
            params![Value::Array(vec![Value::Int(1)])],
            true,
        )
        .unwrap_err();
    assert!(matches!(err, QueryError::BindType(_)));
}

#[test]
fn test_query_log_snapshot_while_executing() {
    let db = seeded();
    let before = db.query_count();
    let log = db.queries();

    for entry in log.iter() {
        db.exec("UPDATE users SET age = age + 1 WHERE id = ?", params![1], true).unwrap();
        assert!(entry.is_success(false));
    }
    assert_eq!(log.count(), before);
    assert_eq!(db.query_count(), before * 2);
    assert_eq!(
        db.queries().last().map(|q| q.query_string().to_string()),
        Some("UPDATE users SET age = age + 1 WHERE id = ?".to_string())
    );

    db.flush_queries();
    assert_eq!(db.query_count(), 0);
    assert_eq!(log.count(), before);
}
