//! Metadata-driven entity mapping over SQLite for the Runar ecosystem.
//!
//! # Intention
//!
//! - Describe plain Rust types as persistable entities (table, fields,
//!   identity, transient fields) and validate those declarations once.
//! - Derive parameterized SQL from the descriptions, bind named parameters
//!   positionally, and rebuild typed instances from result rows.
//!
//! # Architectural Boundaries
//!
//! - Only single-table, single-key operations: no migrations, joins,
//!   transactions or instance caching.
//! - Connections come from a [`ConnectionProvider`]; pooling policy belongs
//!   to the provider.
//!
//! # Layout
//!
//! - [`metadata`]: entity declarations and their validation
//! - [`sql`]: SELECT / INSERT / DELETE generation
//! - [`statement`]: `:name` placeholder parsing and binding
//! - [`mapper`]: row to instance conversion
//! - [`manager`]: the [`EntityManager`] façade
//! - [`sqlite`]: values, rows, configuration and connection providers

pub mod error;
pub mod manager;
pub mod mapper;
pub mod metadata;
pub mod sql;
pub mod sqlite;
pub mod statement;

pub use error::{OrmError, Result};
pub use manager::{EntityManager, ManagedTypes};
pub use mapper::{FromValue, Record};
pub use metadata::{
    describe, fields_of, identity_field_of, Entity, EntityDescriptor, FieldDescriptor, FieldMeta,
    FieldType, TypeMetadata,
};
pub use sqlite::{
    ConnectionHandle, ConnectionProvider, FileConnectionProvider, Params, Row,
    SharedConnectionProvider, SqliteConfig, Value,
};
pub use statement::{GeneratedSql, NamedStatement};
