mod common;

use common::{timestamp, Account, Book};
use rust_sqlite_orm::mapper::{coerce, map, map_all};
use rust_sqlite_orm::{describe, FieldType, OrmError, Record, Row, Value};

fn book_row(id: i64, title: &str, year: i64) -> Row {
    Row::new()
        .with_value("id", id)
        .with_value("title", title)
        .with_value("year", year)
}

#[test]
fn test_book_row_maps_to_instance() {
    let descriptor = describe::<Book>().unwrap();
    let book: Book = map(&descriptor, &book_row(7, "Dune", 1965)).unwrap();
    assert_eq!(book, Book::new("Dune", 1965).with_id(7));
}

#[test]
fn test_sqlite_storage_classes_coerce_to_field_types() {
    let descriptor = describe::<Account>().unwrap();
    let row = Row::new()
        .with_value("user_id", "12")
        .with_value("display_name", "ada")
        .with_value("active", 1)
        .with_value("created_at", "2024-03-01 08:30:00")
        .with_value("balance", 10)
        .with_value("avatar", Value::Null);

    let account: Account = map(&descriptor, &row).unwrap();
    assert_eq!(account.user_id, Some(12));
    assert!(account.active);
    assert_eq!(account.created_at, timestamp("2024-03-01 08:30:00"));
    assert_eq!(account.balance, Some(10.0));
    assert_eq!(account.avatar, None);
}

#[test]
fn test_unconvertible_column_names_field_and_types() {
    let descriptor = describe::<Book>().unwrap();
    let row = Row::new()
        .with_value("id", 1)
        .with_value("title", "Dune")
        .with_value("year", "nineteen sixty-five");

    match map::<Book>(&descriptor, &row) {
        Err(OrmError::TypeMismatch {
            field,
            expected,
            found,
        }) => {
            assert_eq!(field, "year");
            assert_eq!(expected, "INTEGER");
            assert_eq!(found, "TEXT");
        }
        other => panic!("expected TypeMismatch, got {other:?}"),
    }
}

#[test]
fn test_null_and_missing_columns() {
    let descriptor = describe::<Book>().unwrap();

    let null_title = book_row(1, "x", 2000).with_value("title", Value::Null);
    assert!(matches!(
        map::<Book>(&descriptor, &null_title),
        Err(OrmError::TypeMismatch { found, .. }) if found == "NULL"
    ));

    let missing_year = Row::new().with_value("id", 1).with_value("title", "x");
    assert!(matches!(
        map::<Book>(&descriptor, &missing_year),
        Err(OrmError::TypeMismatch { field, .. }) if field == "year"
    ));
}

#[test]
fn test_map_all() {
    let descriptor = describe::<Book>().unwrap();

    let none: Vec<Book> = map_all(&descriptor, &[]).unwrap();
    assert!(none.is_empty());

    let rows = vec![book_row(1, "Dune", 1965), book_row(2, "Emma", 1815)];
    let books: Vec<Book> = map_all(&descriptor, &rows).unwrap();
    assert_eq!(books.len(), 2);
    assert_eq!(books[1].title, "Emma");

    let rows = vec![
        book_row(1, "Dune", 1965),
        book_row(2, "Emma", 1815).with_value("year", 3.5),
        book_row(3, "Ulysses", 1922),
    ];
    assert!(map_all::<Book>(&descriptor, &rows).is_err());
}

#[test]
fn test_field_type_conversions() {
    assert_eq!(
        FieldType::Integer.convert(Value::Real(4.0)),
        Ok(Value::Integer(4))
    );
    assert_eq!(
        FieldType::Integer.convert(Value::Real(4.5)),
        Err(Value::Real(4.5))
    );
    assert_eq!(
        FieldType::Boolean.convert(Value::Text("TRUE".into())),
        Ok(Value::Boolean(true))
    );
    assert_eq!(
        FieldType::Boolean.convert(Value::Integer(2)),
        Err(Value::Integer(2))
    );
    assert_eq!(
        FieldType::Text.convert(Value::Integer(42)),
        Ok(Value::Text("42".into()))
    );
    assert_eq!(
        FieldType::Timestamp.convert(Value::Text("2024-03-01T08:30:00.250".into())),
        Ok(Value::Timestamp(
            timestamp("2024-03-01 08:30:00") + chrono::Duration::milliseconds(250)
        ))
    );
    assert_eq!(
        FieldType::Timestamp.convert(Value::Integer(0)),
        Ok(Value::Timestamp(timestamp("1970-01-01 00:00:00")))
    );
    assert_eq!(
        FieldType::Blob.convert(Value::Boolean(true)),
        Err(Value::Boolean(true))
    );
}

#[test]
fn test_coerce_respects_nullability() {
    let descriptor = describe::<Account>().unwrap();
    let balance = descriptor.field("balance").unwrap();
    let name = descriptor.field("display_name").unwrap();

    assert_eq!(coerce(balance, Value::Null).unwrap(), Value::Null);
    assert!(coerce(name, Value::Null).is_err());
}

#[test]
fn test_record_take() {
    let mut record = Record::new()
        .with_value("count", 3)
        .with_value("label", "x")
        .with_value("big", i64::MAX);

    assert_eq!(record.take::<i32>("count").unwrap(), 3);
    assert_eq!(record.take::<Option<String>>("absent").unwrap(), None);
    assert!(!record.contains("count"));

    match record.take::<i32>("big") {
        Err(OrmError::TypeMismatch { field, expected, .. }) => {
            assert_eq!(field, "big");
            assert_eq!(expected, "INTEGER");
        }
        other => panic!("expected TypeMismatch, got {other:?}"),
    }
    match record.take::<Option<bool>>("label") {
        Err(OrmError::TypeMismatch { expected, found, .. }) => {
            assert_eq!(expected, "BOOLEAN");
            assert_eq!(found, "TEXT");
        }
        other => panic!("expected TypeMismatch, got {other:?}"),
    }
    assert_eq!(record.take_or_default::<String>("gone").unwrap(), "");
}
