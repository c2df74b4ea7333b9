use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures::lock::{Mutex, MutexGuard};
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, ops::Deref, path::PathBuf, time::Duration};

use crate::error::{OrmError, Result};

/// Text layout used when a timestamp travels through a SQLite TEXT column
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Core value types for SQLite operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Real(_) => "REAL",
            Self::Text(_) => "TEXT",
            Self::Blob(_) => "BLOB",
            Self::Boolean(_) => "BOOLEAN",
            Self::Timestamp(_) => "TIMESTAMP",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(f) => Self::Real(f),
            ValueRef::Text(bytes) => Self::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => Self::Blob(bytes.to_vec()),
        }
    }
}

// SQLite has no native boolean or timestamp storage class: booleans bind as
// 0/1 and timestamps as TIMESTAMP_FORMAT text.
impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as Sql;
        let out = match self {
            Self::Null => ToSqlOutput::Owned(Sql::Null),
            Self::Integer(i) => ToSqlOutput::Owned(Sql::Integer(*i)),
            Self::Real(f) => ToSqlOutput::Owned(Sql::Real(*f)),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Self::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b.as_slice())),
            Self::Boolean(b) => ToSqlOutput::Owned(Sql::Integer(i64::from(*b))),
            Self::Timestamp(ts) => {
                ToSqlOutput::Owned(Sql::Text(ts.format(TIMESTAMP_FORMAT).to_string()))
            }
        };
        Ok(out)
    }
}

/// Parameter bindings for SQL queries
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Params {
    pub values: HashMap<String, Value>,
}

impl Params {
    /// Create a new Params object
    pub fn new() -> Self {
        Self::default()
    }
    /// Add a named value
    pub fn with_value(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

impl FromIterator<(String, Value)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// One result record, addressed by column name
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Row {
    values: HashMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_value(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.values.insert(column.to_string(), value.into());
        self
    }
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// SQLite connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Path to the SQLite database file
    pub db_path: PathBuf,
    /// How long a connection waits on a locked database, in milliseconds
    pub busy_timeout_ms: u64,
    /// Create the database file when it does not exist yet
    pub create_if_missing: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("runar.db"),
            busy_timeout_ms: 5_000,
            create_if_missing: true,
        }
    }
}

impl SqliteConfig {
    /// Create a new SQLite config for the given database file
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }
    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    fn open_flags(&self) -> OpenFlags {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        flags
    }
}

/// A live connection lent out by a [`ConnectionProvider`].
///
/// Dropping the handle gives the connection back (or closes it), so release
/// happens on every exit path of the borrowing operation.
pub enum ConnectionHandle<'a> {
    Owned(Connection),
    Shared(MutexGuard<'a, Connection>),
}

impl Deref for ConnectionHandle<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        match self {
            Self::Owned(conn) => conn,
            Self::Shared(guard) => &**guard,
        }
    }
}

/// Source of database connections for the entity manager.
///
/// Implementations must tolerate concurrent `acquire` calls when the
/// manager is shared between tasks.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn acquire(&self) -> Result<ConnectionHandle<'_>>;
}

/// Opens a fresh connection to the configured file on every acquire
#[derive(Debug, Clone)]
pub struct FileConnectionProvider {
    config: SqliteConfig,
}

impl FileConnectionProvider {
    pub fn new(config: SqliteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }
}

#[async_trait]
impl ConnectionProvider for FileConnectionProvider {
    async fn acquire(&self) -> Result<ConnectionHandle<'_>> {
        let conn = Connection::open_with_flags(&self.config.db_path, self.config.open_flags())
            .map_err(OrmError::Connection)?;
        conn.busy_timeout(Duration::from_millis(self.config.busy_timeout_ms))
            .map_err(OrmError::Connection)?;
        Ok(ConnectionHandle::Owned(conn))
    }
}

/// Hands out one shared connection, one caller at a time.
///
/// Needed for in-memory databases, whose contents live only as long as
/// their single connection.
pub struct SharedConnectionProvider {
    connection: Mutex<Connection>,
}

impl SharedConnectionProvider {
    pub fn new(connection: Connection) -> Self {
        Self {
            connection: Mutex::new(connection),
        }
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(OrmError::Connection)?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl ConnectionProvider for SharedConnectionProvider {
    async fn acquire(&self) -> Result<ConnectionHandle<'_>> {
        Ok(ConnectionHandle::Shared(self.connection.lock().await))
    }
}
