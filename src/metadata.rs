//! Declared entity metadata and its validation.
//!
//! A persistable type describes itself through [`Entity::metadata`]: an
//! entity marker carrying the table name, plus one [`FieldMeta`] per field
//! with identity / transient / nullable markers. [`describe`] checks those
//! declarations and turns them into an immutable [`EntityDescriptor`].

use std::any::type_name;
use std::collections::HashSet;
use std::fmt;

use crate::error::{OrmError, Result};
use crate::mapper::Record;

/// Native value type of an entity field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    Real,
    Text,
    Boolean,
    Timestamp,
    Blob,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Boolean => "BOOLEAN",
            Self::Timestamp => "TIMESTAMP",
            Self::Blob => "BLOB",
        };
        f.write_str(name)
    }
}

/// A type whose values can be persisted by the entity manager.
///
/// `to_record` and `from_record` are the field accessor tables: the first
/// reads every declared field into a [`Record`], the second rebuilds a value
/// from one. Transient fields may be absent from the record handed to
/// `from_record`.
///
/// ```ignore
/// impl Entity for Book {
///     fn metadata() -> TypeMetadata {
///         TypeMetadata::new()
///             .entity("book")
///             .field(FieldMeta::new("id", FieldType::Integer).identity())
///             .field(FieldMeta::new("title", FieldType::Text))
///     }
///     fn to_record(&self) -> Record {
///         Record::new().with_value("id", self.id).with_value("title", self.title.as_str())
///     }
///     fn from_record(mut record: Record) -> Result<Self> {
///         Ok(Self { id: record.take("id")?, title: record.take("title")? })
///     }
/// }
/// ```
pub trait Entity: Sized + Send + 'static {
    fn metadata() -> TypeMetadata;
    fn to_record(&self) -> Record;
    fn from_record(record: Record) -> Result<Self>;
}

/// Declaration of one field, as written on the entity type
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMeta {
    name: String,
    column: Option<String>,
    field_type: FieldType,
    identity: bool,
    transient: bool,
    nullable: bool,
}

impl FieldMeta {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            column: None,
            field_type,
            identity: false,
            transient: false,
            nullable: false,
        }
    }
    /// Map the field onto a column with a different name
    pub fn column(mut self, column: &str) -> Self {
        self.column = Some(column.to_string());
        self
    }
    /// Mark the field as the primary key
    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }
    /// Exclude the field from SQL and row mapping
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }
    /// Accept NULL column values for the field
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Everything a type declares about its persistence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeMetadata {
    table: Option<String>,
    fields: Vec<FieldMeta>,
}

impl TypeMetadata {
    pub fn new() -> Self {
        Self::default()
    }
    /// Entity marker: the type is persistable and lives in `table`
    pub fn entity(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }
    pub fn field(mut self, field: FieldMeta) -> Self {
        self.fields.push(field);
        self
    }
}

/// Validated description of one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub column: String,
    pub field_type: FieldType,
    pub transient: bool,
    pub nullable: bool,
}

/// Validated, immutable mapping of a managed type onto its table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    type_name: String,
    table: String,
    fields: Vec<FieldDescriptor>,
    identity: usize,
}

impl EntityDescriptor {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Persistable fields, in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.transient)
    }

    pub fn transient_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.transient)
    }

    pub fn identity(&self) -> &FieldDescriptor {
        &self.fields[self.identity]
    }

    /// Looks up a persistable field by logical name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields().find(|f| f.name == name)
    }
}

/// Builds the descriptor for `T`, validating its declarations.
pub fn describe<T: Entity>() -> Result<EntityDescriptor> {
    describe_metadata(type_name::<T>(), T::metadata())
}

/// Persistable fields of `T` in declaration order
pub fn fields_of<T: Entity>() -> Result<Vec<FieldDescriptor>> {
    Ok(describe::<T>()?.fields().cloned().collect())
}

pub fn identity_field_of<T: Entity>() -> Result<FieldDescriptor> {
    Ok(describe::<T>()?.identity().clone())
}

pub fn describe_metadata(type_name: &str, metadata: TypeMetadata) -> Result<EntityDescriptor> {
    let invalid = |reason: String| OrmError::invalid_mapping(type_name, reason);

    let table = match metadata.table {
        Some(table) if !table.trim().is_empty() => table,
        Some(_) => return Err(invalid("entity table name is empty".into())),
        None => return Err(invalid("type is not marked as an entity".into())),
    };

    let mut seen = HashSet::new();
    let mut identities = Vec::new();
    let mut fields = Vec::with_capacity(metadata.fields.len());
    for (index, meta) in metadata.fields.into_iter().enumerate() {
        if !is_plain_identifier(&meta.name) {
            return Err(invalid(format!("field name `{}` is not an identifier", meta.name)));
        }
        if !seen.insert(meta.name.clone()) {
            return Err(invalid(format!("field `{}` is declared twice", meta.name)));
        }
        if meta.identity {
            if meta.transient {
                return Err(invalid(format!("identity field `{}` cannot be transient", meta.name)));
            }
            identities.push(index);
        }
        let column = meta.column.unwrap_or_else(|| meta.name.clone());
        if column.is_empty() {
            return Err(invalid(format!("field `{}` maps to an empty column name", meta.name)));
        }
        fields.push(FieldDescriptor {
            name: meta.name,
            column,
            field_type: meta.field_type,
            transient: meta.transient,
            nullable: meta.nullable,
        });
    }

    let identity = match identities.as_slice() {
        [index] => *index,
        [] => return Err(invalid("no identity field declared".into())),
        many => {
            let names: Vec<&str> = many.iter().map(|i| fields[*i].name.as_str()).collect();
            return Err(invalid(format!(
                "exactly one identity field allowed, found {}: {}",
                many.len(),
                names.join(", ")
            )))
        }
    };

    Ok(EntityDescriptor {
        type_name: type_name.to_string(),
        table,
        fields,
        identity,
    })
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
