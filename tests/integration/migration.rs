use crate::common::{create_users, insert_user};
use lifeline::orm::{Model, OrmError, Record};
use lifeline::schema::{Column, Constraint, Migration, Schema, SchemaError, Table};
use lifeline::{params, Database, DriverKind, Value};

fn orders_table() -> Table {
    Table::new("orders")
        .column(Column::integer("id").auto_increment())
        .column(Column::integer("user_id"))
        .column(Column::enumeration("status", &["new", "paid"]).default("new"))
        .column(Column::decimal("total").precision(10, 2))
        .column(Column::text("note").nullable())
        .primary_key("id")
        .constraint(Constraint::unique_key("uniq_user_note", &["user_id", "note"]))
        .constraint(Constraint::foreign_key("user_id", "users", "id"))
}

#[test]
fn test_sqlite_ddl_executes() {
    let table = orders_table();
    let ddl = Migration::new(&table, DriverKind::Sqlite).create_table().unwrap();
    assert_eq!(
        ddl,
        "CREATE TABLE `orders` (\n\
         \x20 `id` integer PRIMARY KEY AUTOINCREMENT NOT NULL,\n\
         \x20 `user_id` integer NOT NULL,\n\
         \x20 `status` TEXT CHECK(`status` in ('new','paid')) NOT NULL default 'new',\n\
         \x20 `total` REAL NOT NULL default '0',\n\
         \x20 `note` TEXT default NULL,\n\
         \x20 CONSTRAINT `uniq_user_note` UNIQUE (`user_id`,`note`),\n\
         \x20 CONSTRAINT `cnstrnt_user_id_frgn` FOREIGN KEY (`user_id`) REFERENCES `users`(`id`)\n\
         );"
    );

    let db = Database::open_sqlite(":memory:").unwrap();
    create_users(&db);
    db.exec(&ddl, params![], true).unwrap();
    db.exec(
        "INSERT INTO orders (user_id, total) VALUES (?, ?)",
        params![1, "12.50"],
        true,
    )
    .unwrap();

    let row = db.query().table("orders").fetch().unwrap().next().unwrap();
    assert_eq!(row.get("status"), Some(&Value::from("new")));
    assert_eq!(row.get("note"), Some(&Value::Null));

    let err = db
        .exec("INSERT INTO orders (user_id, status) VALUES (1, 'void')", params![], true)
        .unwrap_err();
    assert!(err.execution().is_some());
}

#[test]
fn test_mysql_ddl() {
    let table = orders_table().with_engine("MyISAM");
    let ddl = Migration::new(&table, DriverKind::Mysql)
        .drop_existing()
        .eol("\r\n")
        .unwrap()
        .create_table()
        .unwrap();
    assert!(ddl.starts_with("DROP TABLE IF EXISTS `orders`;\r\nCREATE TABLE `orders` (\r\n"));
    assert!(ddl.contains("  `status` enum('new','paid') NOT NULL default 'new',\r\n"));
    assert!(ddl.contains("  `total` decimal(10,2) NOT NULL default '0',\r\n"));
    assert!(ddl.contains(
        "  `note` TEXT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci default NULL,\r\n"
    ));
    assert!(ddl.contains("  FOREIGN KEY (`user_id`) REFERENCES `users`(`id`)\r\n"));
    assert!(ddl.ends_with(") ENGINE=MyISAM;"));

    assert!(matches!(
        Migration::new(&table, DriverKind::Pgsql).create_table(),
        Err(SchemaError::UnsupportedDriver(DriverKind::Pgsql))
    ));
    assert!(matches!(Migration::new(&table, DriverKind::Mysql).eol("\t"), Err(SchemaError::InvalidEol)));
}

#[test]
fn test_bound_table_migration_and_decimal_hydration() {
    let db = Database::open_sqlite(":memory:").unwrap();
    create_users(&db);
    insert_user(&db, 1, "Ann", None);

    let mut schema = Schema::new();
    schema.register(orders_table()).unwrap();
    let orders = schema.bind(&db, "orders").unwrap();
    let ddl = orders.migration().create_if_not_exists().create_table().unwrap();
    assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS `orders`"));
    db.exec(&ddl, params![], true).unwrap();

    let mut order = Record::new(orders.table_arc());
    order.set("user_id", 1).unwrap().set("total", "12.50").unwrap();
    order.query(&db).insert().unwrap();
    assert_eq!(order.get("id"), Some(&Value::Int(1)));

    let loaded: Record = orders.find().col("id", 1).first().unwrap();
    assert_eq!(loaded.get("total"), Some(&Value::from("12.5")));
    assert_eq!(loaded.get("status"), Some(&Value::from("new")));

    let mut void = Record::new(orders.table_arc());
    void.set("user_id", 1).unwrap().set("status", "void").unwrap();
    let err = void.query(&db).insert().unwrap_err();
    assert!(matches!(err, OrmError::Persistence { .. }));
}

#[test]
fn test_register_rejects_invalid_tables() {
    let mut schema = Schema::new();
    let err = schema
        .register(Table::new("t").column(Column::integer("a")).primary_key("b"))
        .unwrap_err();
    assert_eq!(err.to_string(), "Column \"b\" not defined in table");

    let err = schema
        .register(Table::new("t").column(Column::integer("a").nullable()).primary_key("a"))
        .unwrap_err();
    assert_eq!(err.to_string(), "Primary key \"a\" cannot be nullable");

    schema.register(orders_table()).unwrap();
    assert!(matches!(
        schema.register(orders_table()),
        Err(SchemaError::DuplicateTable(_))
    ));
    assert_eq!(schema.len(), 1);
}
