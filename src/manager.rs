//! The entity manager: find / find_all / save / delete over managed types.
//!
//! Every operation acquires one connection from the [`ConnectionProvider`],
//! runs exactly one statement, and drops the connection before returning.
//! Descriptors are computed once in [`EntityManager::create`] and never
//! change afterwards.

use std::any::{type_name, TypeId};
use std::collections::HashMap;

use log::{debug, info};
use rusqlite::Connection;

use crate::error::{OrmError, Result};
use crate::mapper::{self, coerce};
use crate::metadata::{describe, Entity, EntityDescriptor, FieldType};
use crate::sql;
use crate::sqlite::{ConnectionProvider, Params, Row, Value};
use crate::statement::{GeneratedSql, NamedStatement};

/// The set of types an [`EntityManager`] is allowed to persist
#[derive(Default)]
pub struct ManagedTypes {
    entries: Vec<ManagedType>,
}

struct ManagedType {
    type_id: TypeId,
    describe: fn() -> Result<EntityDescriptor>,
}

impl ManagedTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Entity>(mut self) -> Self {
        let type_id = TypeId::of::<T>();
        if !self.entries.iter().any(|e| e.type_id == type_id) {
            self.entries.push(ManagedType {
                type_id,
                describe: describe::<T>,
            });
        }
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct EntityManager<P> {
    provider: P,
    descriptors: HashMap<TypeId, EntityDescriptor>,
}

impl<P: ConnectionProvider> EntityManager<P> {
    /// Validates every managed type and builds the manager.
    ///
    /// Registration is all or nothing: the first type with broken metadata
    /// aborts construction with its `InvalidMapping` error.
    pub fn create(provider: P, types: ManagedTypes) -> Result<Self> {
        let descriptors = types
            .entries
            .iter()
            .map(|entry| -> Result<_> { Ok((entry.type_id, (entry.describe)()?)) })
            .collect::<Result<HashMap<_, _>>>()?;
        info!("entity manager ready with {} managed type(s)", descriptors.len());
        Ok(Self {
            provider,
            descriptors,
        })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn is_managed<T: Entity>(&self) -> bool {
        self.descriptors.contains_key(&TypeId::of::<T>())
    }

    pub fn descriptor<T: Entity>(&self) -> Result<&EntityDescriptor> {
        self.descriptors
            .get(&TypeId::of::<T>())
            .ok_or_else(|| OrmError::UnmanagedType(type_name::<T>().to_string()))
    }

    /// Looks up the `T` whose identity equals `id`
    pub async fn find<T: Entity>(&self, id: impl Into<Value>) -> Result<Option<T>> {
        let descriptor = self.descriptor::<T>()?;
        let sql = sql::generate_select(descriptor);
        let params = Params::new().with_value(sql::ID_PARAMETER, id);

        let conn = self.provider.acquire().await?;
        let rows = query(&conn, sql, &params)?;
        drop(conn);

        rows.first()
            .map(|row| mapper::map(descriptor, row))
            .transpose()
    }

    /// Every `T` in its table; an empty table gives an empty vector
    pub async fn find_all<T: Entity>(&self) -> Result<Vec<T>> {
        let descriptor = self.descriptor::<T>()?;
        let sql = sql::generate_select_all(descriptor);

        let conn = self.provider.acquire().await?;
        let rows = query(&conn, sql, &Params::new())?;
        drop(conn);

        mapper::map_all(descriptor, &rows)
    }

    /// Inserts `entity` and returns the stored instance.
    ///
    /// A NULL `INTEGER` identity is left out of the INSERT so the database
    /// assigns it; the returned instance carries the assigned rowid. Any
    /// other identity type has no rowid to fall back on, so a NULL value is
    /// a `TypeMismatch` and nothing is written.
    pub async fn save<T: Entity>(&self, entity: &T) -> Result<T> {
        let descriptor = self.descriptor::<T>()?;
        let mut record = entity.to_record();
        let identity = descriptor.identity();
        let generated_identity = record.get(&identity.name).map_or(true, Value::is_null);
        if generated_identity && identity.field_type != FieldType::Integer {
            return Err(OrmError::TypeMismatch {
                field: identity.name.clone(),
                expected: identity.field_type.to_string(),
                found: "NULL".to_string(),
            });
        }

        let mut params = Params::new();
        let mut field_names = Vec::new();
        for field in descriptor.fields() {
            if field.name == identity.name && generated_identity {
                continue;
            }
            let value = record.get(&field.name).cloned().unwrap_or(Value::Null);
            params.insert(field.name.clone(), coerce(field, value)?);
            field_names.push(field.name.as_str());
        }
        let sql = sql::generate_insert(descriptor, &field_names)?;

        let conn = self.provider.acquire().await?;
        update(&conn, sql, &params)?;
        let rowid = conn.last_insert_rowid();
        drop(conn);

        if generated_identity {
            debug!("{} assigned identity {}", descriptor.type_name(), rowid);
            record.insert(identity.name.clone(), rowid);
        }
        T::from_record(record)
    }

    /// Deletes the row matching the identity of `entity`; true when a row
    /// was removed
    pub async fn delete<T: Entity>(&self, entity: &T) -> Result<bool> {
        let descriptor = self.descriptor::<T>()?;
        let identity = descriptor.identity();
        let id = entity
            .to_record()
            .get(&identity.name)
            .cloned()
            .unwrap_or(Value::Null);
        let sql = sql::generate_delete(descriptor);
        let params = Params::new().with_value(&identity.name, id);

        let conn = self.provider.acquire().await?;
        let affected = update(&conn, sql, &params)?;
        Ok(affected > 0)
    }
}

fn query(conn: &Connection, sql: GeneratedSql, params: &Params) -> Result<Vec<Row>> {
    let mut statement = NamedStatement::from_generated(conn, sql)?;
    statement.set_parameters(params)?;
    statement.execute_query()
}

fn update(conn: &Connection, sql: GeneratedSql, params: &Params) -> Result<usize> {
    let mut statement = NamedStatement::from_generated(conn, sql)?;
    statement.set_parameters(params)?;
    statement.execute_update()
}
