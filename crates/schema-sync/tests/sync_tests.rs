//! Orchestrator scenarios against a scripted driver.

mod common;

use common::{props, synchronizer, MockDriver};
use schema_sync::error::EXIT_DEFINITION_ERROR;
use schema_sync::{
    CollectionOutcome, DropOptions, PropertyDescriptor, PropertyType, Row, SyncError, SyncOptions,
};

fn alter() -> SyncOptions {
    SyncOptions {
        alter_existing: true,
        ..SyncOptions::default()
    }
}

fn mysql_column(name: &str, column_type: &str, nullable: bool, key: &str, extra: &str) -> Row {
    Row::new()
        .with("COLUMN_NAME", name)
        .with("COLUMN_TYPE", column_type)
        .with("IS_NULLABLE", if nullable { "YES" } else { "NO" })
        .with("COLUMN_KEY", key)
        .with("EXTRA", extra)
}

fn mysql_users_exists() -> MockDriver {
    MockDriver::new("mysql").respond(
        "information_schema.tables",
        vec![Row::new().with("TABLE_NAME", "users")],
    )
}

// =============================================================================
// Create path
// =============================================================================

#[tokio::test]
async fn test_missing_collection_created_with_its_index() {
    let (driver, mut sync) = synchronizer(MockDriver::new("mysql"), SyncOptions::default());
    sync.define_collection(
        "users",
        props(vec![
            ("id", PropertyDescriptor::serial().key()),
            ("name", PropertyDescriptor::text().required()),
            ("email", PropertyDescriptor::text().unique()),
        ]),
    )
    .unwrap();

    let report = sync.sync().await.unwrap();
    assert_eq!(report.collections.len(), 1);
    assert_eq!(report.collections[0].outcome, CollectionOutcome::Created);
    assert_eq!(report.changes, 2);

    assert_eq!(
        driver.ddl(),
        vec![
            "CREATE TABLE `users` (`id` INT(11) AUTO_INCREMENT, `name` VARCHAR(255) NOT NULL, \
             `email` VARCHAR(255), PRIMARY KEY (`id`))"
                .to_string(),
            "CREATE UNIQUE INDEX `email_unique` ON `users` (`email`)".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_shared_group_becomes_one_composite_index() {
    let (driver, mut sync) = synchronizer(MockDriver::new("mysql"), SyncOptions::default());
    sync.define_collection(
        "people",
        props(vec![
            ("first", PropertyDescriptor::text().unique_in("full_name")),
            ("last", PropertyDescriptor::text().unique_in("full_name")),
            ("age", PropertyDescriptor::integer().index_in("by_age")),
        ]),
    )
    .unwrap();

    sync.sync().await.unwrap();

    let indexes: Vec<String> = driver
        .ddl()
        .into_iter()
        .filter(|s| s.contains("INDEX"))
        .collect();
    assert_eq!(
        indexes,
        vec![
            "CREATE UNIQUE INDEX `full_name` ON `people` (`first`, `last`)".to_string(),
            "CREATE INDEX `by_age` ON `people` (`age`)".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_unknown_type_aborts_before_any_ddl() {
    let (driver, mut sync) = synchronizer(MockDriver::new("postgres"), SyncOptions::default());
    sync.define_collection(
        "products",
        props(vec![
            ("id", PropertyDescriptor::serial().key()),
            ("price", PropertyDescriptor::new(PropertyType::Custom("money".into()))),
        ]),
    )
    .unwrap();

    let err = sync.sync().await.unwrap_err();
    assert!(matches!(err, SyncError::UnknownPropertyType { .. }));
    assert_eq!(err.to_string(), "Unknown type for property 'price'");
    assert_eq!(err.exit_code(), EXIT_DEFINITION_ERROR);
    assert!(driver.ddl().is_empty());
}

#[tokio::test]
async fn test_failure_stops_the_run() {
    let driver = MockDriver::new("mysql").fail_on("CREATE TABLE `first`", "disk full");
    let (driver, mut sync) = synchronizer(driver, SyncOptions::default());
    for name in ["first", "second"] {
        sync.define_collection(name, props(vec![("a", PropertyDescriptor::text())]))
            .unwrap();
    }

    let err = sync.sync().await.unwrap_err();
    assert!(matches!(err, SyncError::Driver(_)));
    assert_eq!(err.to_string(), "disk full");
    assert!(driver.statements().iter().all(|s| !s.contains("second")));
}

#[tokio::test]
async fn test_failed_prerequisite_skips_table() {
    let driver = MockDriver::new("postgres").fail_on("CREATE TYPE", "permission denied");
    let (driver, mut sync) = synchronizer(driver, SyncOptions::default());
    sync.define_collection(
        "tickets",
        props(vec![("state", PropertyDescriptor::enumeration(["open", "closed"]))]),
    )
    .unwrap();

    let err = sync.sync().await.unwrap_err();
    assert_eq!(err.to_string(), "permission denied");
    assert!(driver.ddl().iter().all(|s| !s.starts_with("CREATE TABLE")));
}

fn postgres_enum_exists(type_name: &str, labels: &[&str]) -> MockDriver {
    MockDriver::new("postgres")
        .respond(
            "pg_catalog.pg_type",
            vec![Row::new().with("typname", type_name)],
        )
        .respond(
            "pg_enum",
            labels.iter().map(|l| Row::new().with("enumlabel", *l)).collect(),
        )
}

#[tokio::test]
async fn test_existing_enum_type_not_recreated() {
    let driver = postgres_enum_exists("tickets_enum_state", &["open", "closed"]);
    let (driver, mut sync) = synchronizer(driver, SyncOptions::default());
    sync.define_collection(
        "tickets",
        props(vec![("state", PropertyDescriptor::enumeration(["open", "closed"]))]),
    )
    .unwrap();

    let report = sync.sync().await.unwrap();
    assert_eq!(
        driver.ddl(),
        vec!["CREATE TABLE \"tickets\" (\"state\" \"tickets_enum_state\")".to_string()]
    );
    // only the table counts; the enum type was already there
    assert_eq!(report.changes, 1);
}

#[tokio::test]
async fn test_fresh_enum_type_counted_with_table() {
    let (_, mut sync) = synchronizer(MockDriver::new("postgres"), SyncOptions::default());
    sync.define_collection(
        "tickets",
        props(vec![("state", PropertyDescriptor::enumeration(["open", "closed"]))]),
    )
    .unwrap();

    let report = sync.sync().await.unwrap();
    assert_eq!(report.changes, 2);
}

#[tokio::test]
async fn test_redshift_rejects_declared_indexes_before_any_ddl() {
    let (driver, mut sync) = synchronizer(MockDriver::new("redshift"), SyncOptions::default());
    let err = sync
        .define_collection(
            "events",
            props(vec![
                ("id", PropertyDescriptor::serial().key()),
                ("kind", PropertyDescriptor::text().indexed()),
            ]),
        )
        .unwrap_err();
    assert!(matches!(err, SyncError::Unsupported { dialect: "redshift", .. }));
    assert!(sync.collections().is_empty());

    sync.define_collection(
        "events",
        props(vec![
            ("id", PropertyDescriptor::serial().key()),
            ("kind", PropertyDescriptor::text()),
        ]),
    )
    .unwrap();
    let report = sync.sync().await.unwrap();
    assert_eq!(report.changes, 1);
    assert_eq!(
        driver.ddl(),
        vec![
            "CREATE TABLE \"events\" (\"id\" INTEGER IDENTITY(1,1), \"kind\" VARCHAR(255), \
             PRIMARY KEY (\"id\"))"
                .to_string()
        ]
    );
    assert!(driver.statements().iter().all(|s| !s.contains("pg_index")));
}

#[tokio::test]
async fn test_required_serial_key_equivalent_across_dialects() {
    let expected = [
        (
            "mysql",
            "CREATE TABLE `t` (`id` INT(11) NOT NULL AUTO_INCREMENT, PRIMARY KEY (`id`))",
        ),
        (
            "postgres",
            "CREATE TABLE \"t\" (\"id\" SERIAL NOT NULL, PRIMARY KEY (\"id\"))",
        ),
        (
            "sqlite",
            "CREATE TABLE \"t\" (\"id\" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT)",
        ),
    ];

    for (dialect, create) in expected {
        let (driver, mut sync) = synchronizer(MockDriver::new(dialect), SyncOptions::default());
        sync.define_collection(
            "t",
            props(vec![("id", PropertyDescriptor::serial().key().required())]),
        )
        .unwrap();
        sync.sync().await.unwrap();
        assert_eq!(driver.ddl(), vec![create.to_string()], "{}", dialect);
    }
}

// =============================================================================
// Alter path
// =============================================================================

#[tokio::test]
async fn test_existing_collection_untouched_by_default() {
    let (driver, mut sync) = synchronizer(mysql_users_exists(), SyncOptions::default());
    sync.define_collection("users", props(vec![("name", PropertyDescriptor::text())]))
        .unwrap();

    let report = sync.sync().await.unwrap();
    assert_eq!(report.collections[0].outcome, CollectionOutcome::Unchanged);
    assert!(driver.ddl().is_empty());
    assert!(driver
        .statements()
        .iter()
        .all(|s| !s.contains("information_schema.columns")));
}

#[tokio::test]
async fn test_serial_column_matches_live_auto_increment() {
    let driver = mysql_users_exists()
        .respond(
            "information_schema.columns",
            vec![
                mysql_column("id", "int(11)", false, "PRI", "auto_increment"),
                mysql_column("name", "varchar(255)", false, "", ""),
            ],
        )
        .respond(
            "information_schema.statistics",
            vec![Row::new()
                .with("INDEX_NAME", "PRIMARY")
                .with("NON_UNIQUE", 0)
                .with("COLUMN_NAME", "id")],
        );
    let (driver, mut sync) = synchronizer(driver, alter());
    sync.define_collection(
        "users",
        props(vec![
            ("id", PropertyDescriptor::serial().key()),
            ("name", PropertyDescriptor::text().required()),
        ]),
    )
    .unwrap();

    let report = sync.sync().await.unwrap();
    assert_eq!(report.collections[0].outcome, CollectionOutcome::Unchanged);
    assert_eq!(report.changes, 0);
    assert!(driver.ddl().is_empty());
}

#[tokio::test]
async fn test_first_missing_column_placed_first() {
    let driver = mysql_users_exists().respond(
        "information_schema.columns",
        vec![mysql_column("name", "varchar(255)", true, "", "")],
    );
    let (driver, mut sync) = synchronizer(driver, alter());
    sync.define_collection(
        "users",
        props(vec![
            ("code", PropertyDescriptor::text().size(8)),
            ("name", PropertyDescriptor::text()),
        ]),
    )
    .unwrap();

    sync.sync().await.unwrap();
    assert_eq!(
        driver.ddl(),
        vec!["ALTER TABLE `users` ADD `code` VARCHAR(8) FIRST".to_string()]
    );
}

#[tokio::test]
async fn test_undeclared_column_dropped_only_when_allowed() {
    let columns = vec![
        mysql_column("name", "varchar(255)", true, "", ""),
        mysql_column("legacy", "int(11)", true, "", ""),
    ];
    let props_users = || props(vec![("name", PropertyDescriptor::text())]);

    let driver = mysql_users_exists().respond("information_schema.columns", columns.clone());
    let (driver, mut sync) = synchronizer(driver, alter());
    sync.define_collection("users", props_users()).unwrap();
    sync.sync().await.unwrap();
    assert!(driver.ddl().is_empty());

    let driver = mysql_users_exists().respond("information_schema.columns", columns);
    let options = SyncOptions {
        alter_existing: true,
        suppress_column_drop: false,
    };
    let (driver, mut sync) = synchronizer(driver, options);
    sync.define_collection("users", props_users()).unwrap();
    sync.sync().await.unwrap();
    assert_eq!(
        driver.ddl(),
        vec!["ALTER TABLE `users` DROP COLUMN `legacy`".to_string()]
    );
}

#[tokio::test]
async fn test_index_uniqueness_change_recreates_and_stale_index_removed() {
    let driver = mysql_users_exists()
        .respond(
            "information_schema.columns",
            vec![mysql_column("email", "varchar(255)", true, "", "")],
        )
        .respond(
            "information_schema.statistics",
            vec![
                Row::new()
                    .with("INDEX_NAME", "email_unique")
                    .with("NON_UNIQUE", 1)
                    .with("COLUMN_NAME", "email"),
                Row::new()
                    .with("INDEX_NAME", "old_index")
                    .with("NON_UNIQUE", 1)
                    .with("COLUMN_NAME", "email"),
            ],
        );
    let (driver, mut sync) = synchronizer(driver, alter());
    sync.define_collection("users", props(vec![("email", PropertyDescriptor::text().unique())]))
        .unwrap();

    let report = sync.sync().await.unwrap();
    assert_eq!(
        report.collections[0].outcome,
        CollectionOutcome::Altered { changes: 3 }
    );
    assert_eq!(
        driver.ddl(),
        vec![
            "DROP INDEX `email_unique` ON `users`".to_string(),
            "CREATE UNIQUE INDEX `email_unique` ON `users` (`email`)".to_string(),
            "DROP INDEX `old_index` ON `users`".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_postgres_changed_column_modified() {
    let driver = postgres_table_exists("users")
        .respond(
            "information_schema.columns",
            vec![Row::new()
                .with("column_name", "age")
                .with("data_type", "text")
                .with("is_nullable", "YES")],
        );
    let (driver, mut sync) = synchronizer(driver, alter());
    sync.define_collection("users", props(vec![("age", PropertyDescriptor::integer())]))
        .unwrap();

    sync.sync().await.unwrap();
    assert_eq!(
        driver.ddl(),
        vec![
            "ALTER TABLE \"users\" ALTER COLUMN \"age\" TYPE INTEGER".to_string(),
            "ALTER TABLE \"users\" ALTER COLUMN \"age\" DROP NOT NULL".to_string(),
            "ALTER TABLE \"users\" ALTER COLUMN \"age\" DROP DEFAULT".to_string(),
        ]
    );
}

fn postgres_table_exists(table: &str) -> MockDriver {
    MockDriver::new("postgres").respond(
        "information_schema.tables",
        vec![Row::new().with("table_name", table)],
    )
}

#[tokio::test]
async fn test_postgres_key_column_resize_keeps_not_null() {
    let driver = postgres_table_exists("items")
        .respond(
            "information_schema.columns",
            vec![Row::new()
                .with("column_name", "id")
                .with("data_type", "integer")
                .with("is_nullable", "NO")],
        )
        .respond(
            "AND i.indisprimary",
            vec![Row::new().with("column_name", "id")],
        );
    let (driver, mut sync) = synchronizer(driver, alter());
    sync.define_collection(
        "items",
        props(vec![("id", PropertyDescriptor::integer().key().size(8))]),
    )
    .unwrap();

    sync.sync().await.unwrap();
    let ddl = driver.ddl();
    assert_eq!(
        ddl,
        vec![
            "ALTER TABLE \"items\" ALTER COLUMN \"id\" TYPE BIGINT".to_string(),
            "ALTER TABLE \"items\" ALTER COLUMN \"id\" SET NOT NULL".to_string(),
            "ALTER TABLE \"items\" ALTER COLUMN \"id\" DROP DEFAULT".to_string(),
        ]
    );
    assert!(ddl.iter().all(|s| !s.contains("DROP NOT NULL")));
}

#[tokio::test]
async fn test_postgres_enum_gains_value_on_alter() {
    let driver = postgres_enum_exists("tickets_enum_state", &["open", "closed"])
        .respond(
            "information_schema.tables",
            vec![Row::new().with("table_name", "tickets")],
        )
        .respond(
            "information_schema.columns",
            vec![Row::new()
                .with("column_name", "state")
                .with("data_type", "USER-DEFINED")
                .with("udt_name", "tickets_enum_state")
                .with("is_nullable", "YES")],
        );
    let (driver, mut sync) = synchronizer(driver, alter());
    sync.define_collection(
        "tickets",
        props(vec![(
            "state",
            PropertyDescriptor::enumeration(["open", "pending", "closed"]),
        )]),
    )
    .unwrap();

    let report = sync.sync().await.unwrap();
    let ddl = driver.ddl();
    assert_eq!(
        ddl[0],
        "ALTER TYPE \"tickets_enum_state\" ADD VALUE 'pending' AFTER 'open'"
    );
    assert!(ddl[1].contains("TYPE \"tickets_enum_state\" USING \"state\"::text::"));
    assert_eq!(
        report.collections[0].outcome,
        CollectionOutcome::Altered { changes: 2 }
    );
}

#[tokio::test]
async fn test_postgres_enum_value_removal_is_unsupported() {
    let driver = postgres_enum_exists("tickets_enum_state", &["open", "closed"])
        .respond(
            "information_schema.tables",
            vec![Row::new().with("table_name", "tickets")],
        )
        .respond(
            "information_schema.columns",
            vec![Row::new()
                .with("column_name", "state")
                .with("data_type", "USER-DEFINED")
                .with("udt_name", "tickets_enum_state")
                .with("is_nullable", "YES")],
        );
    let (driver, mut sync) = synchronizer(driver, alter());
    sync.define_collection(
        "tickets",
        props(vec![("state", PropertyDescriptor::enumeration(["open"]))]),
    )
    .unwrap();

    let err = sync.sync().await.unwrap_err();
    assert!(matches!(err, SyncError::Unsupported { dialect: "postgres", .. }));
    assert!(driver.ddl().is_empty());
}

#[tokio::test]
async fn test_sqlite_modify_reports_unsupported() {
    let driver = MockDriver::new("sqlite")
        .respond(
            "SELECT name FROM sqlite_master",
            vec![Row::new().with("name", "users")],
        )
        .respond(
            "PRAGMA table_info",
            vec![Row::new()
                .with("name", "age")
                .with("type", "TEXT")
                .with("notnull", 0)
                .with("pk", 0)],
        );
    let (_, mut sync) = synchronizer(driver, alter());
    sync.define_collection("users", props(vec![("age", PropertyDescriptor::integer())]))
        .unwrap();

    let err = sync.sync().await.unwrap_err();
    assert!(matches!(err, SyncError::Unsupported { dialect: "sqlite", .. }));
}

// =============================================================================
// Drop
// =============================================================================

#[tokio::test]
async fn test_drop_includes_join_tables() {
    let (driver, mut sync) = synchronizer(MockDriver::new("mysql"), SyncOptions::default());
    sync.define_collection("posts", props(vec![("title", PropertyDescriptor::text())]))
        .unwrap();
    sync.define_join_tables("posts", ["posts_tags", "posts_authors"])
        .unwrap();

    let report = sync.drop(&DropOptions::default()).await.unwrap();
    assert_eq!(report.tables, vec!["posts", "posts_tags", "posts_authors"]);
    assert_eq!(
        driver.ddl(),
        vec![
            "DROP TABLE IF EXISTS `posts`".to_string(),
            "DROP TABLE IF EXISTS `posts_tags`".to_string(),
            "DROP TABLE IF EXISTS `posts_authors`".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_drop_attempts_every_table_and_reports_first_error() {
    let driver = MockDriver::new("mysql")
        .fail_on("`posts_tags`", "locked")
        .fail_on("`posts_authors`", "also locked");
    let (driver, mut sync) = synchronizer(driver, SyncOptions::default());
    sync.define_collection("posts", props(vec![("title", PropertyDescriptor::text())]))
        .unwrap();
    sync.define_join_tables("posts", ["posts_tags", "posts_authors"])
        .unwrap();

    let err = sync.drop(&DropOptions::default()).await.unwrap_err();
    assert_eq!(err.to_string(), "locked");
    assert_eq!(driver.ddl().len(), 3);
}
