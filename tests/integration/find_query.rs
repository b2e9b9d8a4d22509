use crate::common::{insert_user, schema, seeded};
use lifeline::orm::{OrmError, Record};
use lifeline::schema::SchemaError;
use lifeline::{params, Value};

#[test]
fn test_first_and_all() {
    let db = seeded();
    let schema = schema();
    let users = schema.bind(&db, "users").unwrap();

    let bob: Record = users.find().col("id", 7).first().unwrap();
    assert_eq!(bob.get("name"), Some(&Value::from("Bob")));
    assert_eq!(bob.get("email"), Some(&Value::Null));
    assert!(bob.is_persisted());

    insert_user(&db, 11, "Bob", None);
    let bobs: Vec<Record> = users.find().col("name", "Bob").asc("id").all().unwrap();
    let ids: Vec<_> = bobs.iter().map(|r| r.get("id").cloned()).collect();
    assert_eq!(ids, vec![Some(Value::Int(7)), Some(Value::Int(11))]);

    let nameless_age: Vec<Record> = users.find().matching(params! { "age" => Value::Null }).all().unwrap();
    assert_eq!(nameless_age.len(), 1);
    assert_eq!(nameless_age[0].get("id"), Some(&Value::Int(11)));
}

#[test]
fn test_raw_condition_with_order_and_limit() {
    let db = seeded();
    let schema = schema();
    let users = schema.bind(&db, "users").unwrap();

    let oldest: Vec<Record> = users
        .find()
        .raw("WHERE age > ?", params![25])
        .desc("age")
        .limit(2)
        .all()
        .unwrap();
    let ages: Vec<_> = oldest.iter().filter_map(|r| r.get("age").and_then(Value::as_i64)).collect();
    assert_eq!(ages, vec![30, 29]);

    let err = users.find::<Record>().raw("age > 1", params![]).all().unwrap_err();
    assert_eq!(err.to_string(), "Query must start with \"WHERE\"");
}

#[test]
fn test_not_found() {
    let db = seeded();
    let schema = schema();
    let users = schema.bind(&db, "users").unwrap();
    let err = users.find::<Record>().col("id", 404).first().unwrap_err();
    assert!(matches!(err, OrmError::ModelNotFound(_)));
    assert_eq!(err.to_string(), "No matching row found in \":memory:.users\"");
}

#[test]
fn test_builder_errors_surface_on_fetch() {
    let db = seeded();
    let schema = schema();
    let users = schema.bind(&db, "users").unwrap();

    let err = users.find::<Record>().col("id", 1).limit(0).first().unwrap_err();
    assert_eq!(err.to_string(), "Invalid limit value");

    let err = users.find::<Record>().col("id", 1).asc("missing").all().unwrap_err();
    assert!(matches!(err, OrmError::ColumnNotFound { .. }));

    let err = users.find::<Record>().col("id", "1").all().unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));

    let err = users.find::<Record>().all().unwrap_err();
    assert_eq!(err.to_string(), "Cannot build query; No columns to match");

    assert!(matches!(
        schema.bind(&db, "orders"),
        Err(SchemaError::UnknownTable(_))
    ));
}
