//! Relational store and catalog behaviour against the scripted driver.

use tandem_common::{ErrorCode, TandemError};
use tandem_pool::Row;
use tandem_record::{Deletable, Gettable, RelationalRecord, Savable};
use tandem_sql::Value;
use tandem_test::{Event, Harness};

fn catalog_row(column: &str, constraint: Option<&str>) -> Row {
    Row::from_pairs([
        ("column_name", Value::from(column)),
        ("constraint_type", Value::from(constraint)),
    ])
}

#[test]
fn test_get_missing_row_is_not_found() {
    let h = Harness::new();
    let err = h.relational().get(&Value::Int(9)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert!(err.is_not_found());
}

#[test]
fn test_get_duplicate_rows_is_data_integrity() {
    let h = Harness::new();
    let row = Row::from_pairs([("id", 9), ("age", 40)]);
    h.driver.push_rows(vec![row.clone(), row]);

    let err = h.relational().get(&Value::Int(9)).unwrap_err();
    assert!(matches!(err, TandemError::DataIntegrity { rows: 2, .. }));
}

#[test]
fn test_insert_skips_null_columns_and_takes_defaults() {
    let h = Harness::new();
    let store = h.relational();
    let mut entity = store.new_entity().with("name", "Ryan").unwrap();

    h.driver.push_row([
        ("id", Value::Int(7)),
        ("name", Value::from("Ryan")),
        ("age", Value::Int(18)),
    ]);
    store.save(&mut entity).unwrap();

    assert_eq!(
        h.journal.statements()[0],
        r#"INSERT INTO "public"."users" ("name") VALUES (?) RETURNING *"#
    );
    assert_eq!(entity.get("age"), Some(&Value::Int(18)));
    assert_eq!(entity.primary_key(), &Value::Int(7));
}

#[test]
fn test_update_assigns_every_column() {
    let h = Harness::new();
    let store = h.relational();
    let mut entity = store
        .new_entity()
        .with("id", 5)
        .unwrap()
        .with("name", "Kroon")
        .unwrap();

    h.driver.push_row([
        ("id", Value::Int(5)),
        ("name", Value::from("Kroon")),
        ("age", Value::Null),
    ]);
    store.save(&mut entity).unwrap();

    let events = h.journal.events();
    assert_eq!(
        events[0].sql(),
        Some(r#"UPDATE "public"."users" SET "name" = ?, "age" = ? WHERE "id" = ? RETURNING *"#)
    );
    assert_eq!(
        events[0].params(),
        Some(&[Value::from("Kroon"), Value::Null, Value::Int(5)][..])
    );
}

#[test]
fn test_update_of_missing_row_is_not_found() {
    let h = Harness::new();
    let store = h.relational();
    let mut entity = store.new_entity().with("id", 5).unwrap();

    h.driver.push_rows(Vec::new());
    let err = store.save(&mut entity).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[test]
fn test_driver_error_rolls_back_and_propagates() {
    let h = Harness::new();
    let store = h.relational();
    let mut entity = store.new_entity().with("name", "Ryan").unwrap();

    h.driver
        .push_error(TandemError::execution("duplicate key value"));
    let err = store.save(&mut entity).unwrap_err();

    assert_eq!(err.code(), ErrorCode::ExecutionFailed);
    assert_eq!(h.journal.events().last(), Some(&Event::Rollback));
    assert!(entity.primary_key().is_null());
    assert_eq!(h.pool.available(), 1);
}

#[test]
fn test_broken_connection_is_discarded() {
    let h = Harness::new();
    h.driver.push_error(TandemError::connection("reset by peer"));

    let err = h.relational().get(&Value::Int(1)).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(h.pool.size(), 0);
}

#[test]
fn test_delete_reports_row_existence() {
    let h = Harness::new();
    let store = h.relational();

    h.driver.push_affected(0);
    assert!(!store.delete_id(&Value::Int(5)).unwrap());

    let unsaved = store.new_entity();
    assert!(!store.delete(&unsaved).unwrap());
    assert_eq!(h.journal.statements().len(), 1);
}

#[test]
fn test_table_from_catalog() {
    let h = Harness::new();
    h.driver.push_rows(vec![
        catalog_row("id", Some("FOREIGN KEY")),
        catalog_row("id", Some("PRIMARY KEY")),
        catalog_row("name", None),
        catalog_row("age", None),
    ]);

    let store = RelationalRecord::from_catalog(h.pool.clone(), "public", "users").unwrap();
    assert_eq!(
        store.table().column_names().collect::<Vec<_>>(),
        vec!["id", "name", "age"]
    );
    assert_eq!(store.layout().primary_key(), "id");

    let events = h.journal.events();
    assert!(events[0]
        .sql()
        .unwrap()
        .contains("FROM information_schema.columns"));
    assert_eq!(
        events[0].params(),
        Some(&[Value::from("public"), Value::from("users")][..])
    );
}

#[test]
fn test_catalog_rejections() {
    let h = Harness::new();

    h.driver.push_rows(Vec::new());
    let err = RelationalRecord::from_catalog(h.pool.clone(), "public", "ghosts").unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnknownTable);

    h.driver
        .push_rows(vec![catalog_row("a", None), catalog_row("b", None)]);
    let err = RelationalRecord::from_catalog(h.pool.clone(), "public", "log").unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidConfig);

    h.driver.push_rows(vec![
        catalog_row("a", Some("PRIMARY KEY")),
        catalog_row("b", Some("PRIMARY KEY")),
    ]);
    let err = RelationalRecord::from_catalog(h.pool.clone(), "public", "pairs").unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidConfig);
}
