// Entity fixtures and database helpers shared by the integration tests.
#![allow(dead_code)]

use chrono::NaiveDateTime;
use rusqlite::Connection;
use rust_sqlite_orm::{
    Entity, FieldMeta, FieldType, FileConnectionProvider, Record, Result, SharedConnectionProvider,
    SqliteConfig, TypeMetadata,
};
use tempfile::NamedTempFile;

pub const SCHEMA: &str = r#"
    CREATE TABLE book (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        year INTEGER NOT NULL
    );
    CREATE TABLE account (
        user_id INTEGER PRIMARY KEY,
        display_name TEXT NOT NULL,
        active INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        balance REAL,
        avatar BLOB
    );
    CREATE TABLE tag (
        code TEXT PRIMARY KEY,
        label TEXT NOT NULL
    );
    CREATE TABLE note (
        id INTEGER PRIMARY KEY,
        "current_date" TEXT
    );
"#;

#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: Option<i64>,
    pub title: String,
    pub year: i64,
    pub cover_cache: Option<String>,
}

impl Book {
    pub fn new(title: &str, year: i64) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            year,
            cover_cache: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

impl Entity for Book {
    fn metadata() -> TypeMetadata {
        TypeMetadata::new()
            .entity("book")
            .field(FieldMeta::new("id", FieldType::Integer).identity())
            .field(FieldMeta::new("title", FieldType::Text))
            .field(FieldMeta::new("year", FieldType::Integer))
            .field(FieldMeta::new("cover_cache", FieldType::Text).transient())
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with_value("id", self.id)
            .with_value("title", self.title.as_str())
            .with_value("year", self.year)
            .with_value("cover_cache", self.cover_cache.clone())
    }

    fn from_record(mut record: Record) -> Result<Self> {
        Ok(Self {
            id: record.take("id")?,
            title: record.take("title")?,
            year: record.take("year")?,
            cover_cache: record.take_or_default("cover_cache")?,
        })
    }
}

/// Identity field whose logical name differs from its column
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub user_id: Option<i64>,
    pub display_name: String,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub balance: Option<f64>,
    pub avatar: Option<Vec<u8>>,
}

impl Entity for Account {
    fn metadata() -> TypeMetadata {
        TypeMetadata::new()
            .entity("account")
            .field(FieldMeta::new("userId", FieldType::Integer).column("user_id").identity())
            .field(FieldMeta::new("display_name", FieldType::Text))
            .field(FieldMeta::new("active", FieldType::Boolean))
            .field(FieldMeta::new("created_at", FieldType::Timestamp))
            .field(FieldMeta::new("balance", FieldType::Real).nullable())
            .field(FieldMeta::new("avatar", FieldType::Blob).nullable())
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with_value("userId", self.user_id)
            .with_value("display_name", self.display_name.as_str())
            .with_value("active", self.active)
            .with_value("created_at", self.created_at)
            .with_value("balance", self.balance)
            .with_value("avatar", self.avatar.clone())
    }

    fn from_record(mut record: Record) -> Result<Self> {
        Ok(Self {
            user_id: record.take("userId")?,
            display_name: record.take("display_name")?,
            active: record.take("active")?,
            created_at: record.take("created_at")?,
            balance: record.take("balance")?,
            avatar: record.take("avatar")?,
        })
    }
}

/// Identity with no rowid behind it: the caller must supply the key
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub code: Option<String>,
    pub label: String,
}

impl Entity for Tag {
    fn metadata() -> TypeMetadata {
        TypeMetadata::new()
            .entity("tag")
            .field(FieldMeta::new("code", FieldType::Text).identity())
            .field(FieldMeta::new("label", FieldType::Text))
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with_value("code", self.code.clone())
            .with_value("label", self.label.as_str())
    }

    fn from_record(mut record: Record) -> Result<Self> {
        Ok(Self {
            code: record.take("code")?,
            label: record.take("label")?,
        })
    }
}

/// Column named after an SQL keyword
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: Option<i64>,
    pub current_date: Option<String>,
}

impl Entity for Note {
    fn metadata() -> TypeMetadata {
        TypeMetadata::new()
            .entity("note")
            .field(FieldMeta::new("id", FieldType::Integer).identity())
            .field(FieldMeta::new("current_date", FieldType::Text).nullable())
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with_value("id", self.id)
            .with_value("current_date", self.current_date.clone())
    }

    fn from_record(mut record: Record) -> Result<Self> {
        Ok(Self {
            id: record.take("id")?,
            current_date: record.take("current_date")?,
        })
    }
}

pub fn timestamp(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

/// Declares fields but carries no entity marker
#[derive(Debug)]
pub struct Unmarked;

impl Entity for Unmarked {
    fn metadata() -> TypeMetadata {
        TypeMetadata::new().field(FieldMeta::new("id", FieldType::Integer).identity())
    }
    fn to_record(&self) -> Record {
        Record::new()
    }
    fn from_record(_: Record) -> Result<Self> {
        Ok(Self)
    }
}

#[derive(Debug)]
pub struct NoIdentity;

impl Entity for NoIdentity {
    fn metadata() -> TypeMetadata {
        TypeMetadata::new()
            .entity("no_identity")
            .field(FieldMeta::new("name", FieldType::Text))
    }
    fn to_record(&self) -> Record {
        Record::new()
    }
    fn from_record(_: Record) -> Result<Self> {
        Ok(Self)
    }
}

#[derive(Debug)]
pub struct TwoIdentities;

impl Entity for TwoIdentities {
    fn metadata() -> TypeMetadata {
        TypeMetadata::new()
            .entity("two_identities")
            .field(FieldMeta::new("left_id", FieldType::Integer).identity())
            .field(FieldMeta::new("right_id", FieldType::Integer).identity())
    }
    fn to_record(&self) -> Record {
        Record::new()
    }
    fn from_record(_: Record) -> Result<Self> {
        Ok(Self)
    }
}

// Helper function to create an in-memory database for testing
pub fn create_test_db() -> anyhow::Result<SharedConnectionProvider> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(SCHEMA)?;
    Ok(SharedConnectionProvider::new(conn))
}

// Helper function to create a temporary file-based database
pub fn create_temp_db() -> anyhow::Result<(FileConnectionProvider, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let conn = Connection::open(temp_file.path())?;
    conn.execute_batch(SCHEMA)?;
    drop(conn);
    let provider = FileConnectionProvider::new(SqliteConfig::new(temp_file.path()));
    Ok((provider, temp_file))
}
