use crate::common::{create_users, schema};
use lifeline::orm::{Model, Record};
use lifeline::{Credentials, Database, DatabaseConfig, DriverKind, Value};

#[test]
fn test_rows_survive_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.db");
    let path = path.to_str().unwrap();
    let schema = schema();

    {
        let db = Database::open_sqlite(path).unwrap();
        create_users(&db);
        let mut dave = Record::new(schema.table("users").unwrap());
        dave.set("name", "Dave").unwrap().set("email", "dave@example.com").unwrap();
        dave.query(&db).insert().unwrap();
    }

    let db = Database::connect(Credentials::new(DriverKind::Sqlite, path)).unwrap();
    let users = schema.bind(&db, "users").unwrap();
    let dave: Record = users.find().col("email", "dave@example.com").first().unwrap();
    assert_eq!(dave.get("id"), Some(&Value::Int(1)));
    assert_eq!(dave.get("name"), Some(&Value::from("Dave")));
}

#[test]
fn test_connect_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("configured.db");
    let toml = format!("[database]\ndriver = \"sqlite\"\ndbname = \"{}\"\n", path.display());

    let config = DatabaseConfig::from_toml_str(&toml).unwrap();
    let db = Database::connect(config.credentials().unwrap()).unwrap();
    assert_eq!(db.driver_kind(), DriverKind::Sqlite);
    assert_eq!(db.credentials().map(|c| c.dbname.as_str()), path.to_str());
    create_users(&db);
    assert!(path.exists());
}
