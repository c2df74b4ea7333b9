//! Conversion between result rows, field values and entity instances.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime};

use crate::error::{OrmError, Result};
use crate::metadata::{Entity, EntityDescriptor, FieldDescriptor, FieldType};
use crate::sqlite::{Row, Value, TIMESTAMP_FORMAT};

/// Field name to value view of one entity instance
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Record {
    values: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.values.insert(field.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Removes `field` and converts it to `T`. A missing field reads as NULL,
    /// so it only succeeds for `Option` targets.
    pub fn take<T: FromValue>(&mut self, field: &str) -> Result<T> {
        let value = self.values.remove(field).unwrap_or(Value::Null);
        T::from_value(value).map_err(|found| OrmError::TypeMismatch {
            field: field.to_string(),
            expected: T::EXPECTED.to_string(),
            found: found.type_name().to_string(),
        })
    }

    /// Like [`Record::take`], falling back to `T::default()` for a missing
    /// or NULL field. Meant for transient fields.
    pub fn take_or_default<T: FromValue + Default>(&mut self, field: &str) -> Result<T> {
        match self.values.get(field) {
            None | Some(Value::Null) => {
                self.values.remove(field);
                Ok(T::default())
            }
            Some(_) => self.take(field),
        }
    }
}

/// Extraction of a native Rust value from a [`Value`].
///
/// On failure the original value is handed back for error reporting.
pub trait FromValue: Sized {
    /// Column type name reported when extraction fails
    const EXPECTED: &'static str;

    fn from_value(value: Value) -> std::result::Result<Self, Value>;
}

impl FromValue for Value {
    const EXPECTED: &'static str = "ANY";

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        Ok(value)
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "INTEGER";

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Integer(i) => Ok(i),
            other => Err(other),
        }
    }
}

impl FromValue for i32 {
    const EXPECTED: &'static str = "INTEGER";

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Integer(i) => i32::try_from(i).map_err(|_| Value::Integer(i)),
            other => Err(other),
        }
    }
}

impl FromValue for u32 {
    const EXPECTED: &'static str = "INTEGER";

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Integer(i) => u32::try_from(i).map_err(|_| Value::Integer(i)),
            other => Err(other),
        }
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "REAL";

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Real(f) => Ok(f),
            Value::Integer(i) => Ok(i as f64),
            other => Err(other),
        }
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "BOOLEAN";

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Boolean(b) => Ok(b),
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            other => Err(other),
        }
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "TEXT";

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl FromValue for Vec<u8> {
    const EXPECTED: &'static str = "BLOB";

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Blob(b) => Ok(b),
            other => Err(other),
        }
    }
}

impl FromValue for NaiveDateTime {
    const EXPECTED: &'static str = "TIMESTAMP";

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Timestamp(ts) => Ok(ts),
            other => Err(other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FieldType {
    /// Converts a non-NULL column value into this type's canonical [`Value`]
    /// variant, or hands the value back when no conversion applies.
    pub fn convert(self, value: Value) -> std::result::Result<Value, Value> {
        match (self, value) {
            (Self::Integer, Value::Integer(i)) => Ok(Value::Integer(i)),
            (Self::Integer, Value::Boolean(b)) => Ok(Value::Integer(i64::from(b))),
            (Self::Integer, Value::Real(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Ok(Value::Integer(f as i64))
            }
            (Self::Integer, Value::Text(s)) => {
                s.trim().parse().map(Value::Integer).map_err(|_| Value::Text(s))
            }

            (Self::Real, Value::Real(f)) => Ok(Value::Real(f)),
            (Self::Real, Value::Integer(i)) => Ok(Value::Real(i as f64)),
            (Self::Real, Value::Text(s)) => {
                s.trim().parse().map(Value::Real).map_err(|_| Value::Text(s))
            }

            (Self::Text, Value::Text(s)) => Ok(Value::Text(s)),
            (Self::Text, Value::Integer(i)) => Ok(Value::Text(i.to_string())),
            (Self::Text, Value::Real(f)) => Ok(Value::Text(f.to_string())),
            (Self::Text, Value::Blob(b)) => String::from_utf8(b)
                .map(Value::Text)
                .map_err(|e| Value::Blob(e.into_bytes())),

            (Self::Boolean, Value::Boolean(b)) => Ok(Value::Boolean(b)),
            (Self::Boolean, Value::Integer(i @ (0 | 1))) => Ok(Value::Boolean(i == 1)),
            (Self::Boolean, Value::Text(s)) => parse_bool(&s).map(Value::Boolean).ok_or(Value::Text(s)),

            (Self::Timestamp, Value::Timestamp(ts)) => Ok(Value::Timestamp(ts)),
            (Self::Timestamp, Value::Text(s)) => {
                parse_timestamp(&s).map(Value::Timestamp).ok_or(Value::Text(s))
            }
            (Self::Timestamp, Value::Integer(secs)) => DateTime::from_timestamp(secs, 0)
                .map(|dt| Value::Timestamp(dt.naive_utc()))
                .ok_or(Value::Integer(secs)),

            (Self::Blob, Value::Blob(b)) => Ok(Value::Blob(b)),
            (Self::Blob, Value::Text(s)) => Ok(Value::Blob(s.into_bytes())),

            (_, other) => Err(other),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "1" => Some(true),
        "0" => Some(false),
        t if t.eq_ignore_ascii_case("true") => Some(true),
        t if t.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

/// Converts `value` to the declared type of `field`
pub fn coerce(field: &FieldDescriptor, value: Value) -> Result<Value> {
    if value.is_null() {
        return if field.nullable {
            Ok(Value::Null)
        } else {
            Err(mismatch(field, "NULL"))
        };
    }
    field
        .field_type
        .convert(value)
        .map_err(|found| mismatch(field, found.type_name()))
}

fn mismatch(field: &FieldDescriptor, found: &str) -> OrmError {
    OrmError::TypeMismatch {
        field: field.name.clone(),
        expected: field.field_type.to_string(),
        found: found.to_string(),
    }
}

/// Builds one `T` from a result row
pub fn map<T: Entity>(descriptor: &EntityDescriptor, row: &Row) -> Result<T> {
    let mut record = Record::new();
    for field in descriptor.fields() {
        let raw = row
            .get(&field.column)
            .cloned()
            .ok_or_else(|| mismatch(field, &format!("missing column `{}`", field.column)))?;
        record.insert(field.name.clone(), coerce(field, raw)?);
    }
    T::from_record(record)
}

/// Maps every row, stopping at the first failure
pub fn map_all<T: Entity>(descriptor: &EntityDescriptor, rows: &[Row]) -> Result<Vec<T>> {
    rows.iter().map(|row| map(descriptor, row)).collect()
}
