//! SQL text generation from entity descriptors.
//!
//! Generated statements only ever reference values through `:name`
//! placeholders; nothing from an entity instance is spliced into the text.

use crate::error::{OrmError, Result};
use crate::metadata::{is_plain_identifier, EntityDescriptor};
use crate::statement::GeneratedSql;

/// Placeholder used by [`generate_select`] for the looked-up identity
pub const ID_PARAMETER: &str = "id";

// SQLite's keyword list, sorted for binary search. Any of these used bare
// as a column name may be read as the keyword (CURRENT_DATE evaluates to
// today's date rather than failing).
const SQLITE_KEYWORDS: &[&str] = &[
    "ABORT", "ACTION", "ADD", "AFTER", "ALL", "ALTER", "ALWAYS", "ANALYZE", "AND", "AS", "ASC",
    "ATTACH", "AUTOINCREMENT", "BEFORE", "BEGIN", "BETWEEN", "BY", "CASCADE", "CASE", "CAST",
    "CHECK", "COLLATE", "COLUMN", "COMMIT", "CONFLICT", "CONSTRAINT", "CREATE", "CROSS",
    "CURRENT", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "DATABASE", "DEFAULT",
    "DEFERRABLE", "DEFERRED", "DELETE", "DESC", "DETACH", "DISTINCT", "DO", "DROP", "EACH",
    "ELSE", "END", "ESCAPE", "EXCEPT", "EXCLUDE", "EXCLUSIVE", "EXISTS", "EXPLAIN", "FAIL",
    "FILTER", "FIRST", "FOLLOWING", "FOR", "FOREIGN", "FROM", "FULL", "GENERATED", "GLOB",
    "GROUP", "GROUPS", "HAVING", "IF", "IGNORE", "IMMEDIATE", "IN", "INDEX", "INDEXED",
    "INITIALLY", "INNER", "INSERT", "INSTEAD", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN",
    "KEY", "LAST", "LEFT", "LIKE", "LIMIT", "MATCH", "MATERIALIZED", "NATURAL", "NO", "NOT",
    "NOTHING", "NOTNULL", "NULL", "NULLS", "OF", "OFFSET", "ON", "OR", "ORDER", "OTHERS",
    "OUTER", "OVER", "PARTITION", "PLAN", "PRAGMA", "PRECEDING", "PRIMARY", "QUERY", "RAISE",
    "RANGE", "RECURSIVE", "REFERENCES", "REGEXP", "REINDEX", "RELEASE", "RENAME", "REPLACE",
    "RESTRICT", "RETURNING", "RIGHT", "ROLLBACK", "ROW", "ROWS", "SAVEPOINT", "SELECT", "SET",
    "TABLE", "TEMP", "TEMPORARY", "THEN", "TIES", "TO", "TRANSACTION", "TRIGGER", "UNBOUNDED",
    "UNION", "UNIQUE", "UPDATE", "USING", "VACUUM", "VALUES", "VIEW", "VIRTUAL", "WHEN",
    "WHERE", "WINDOW", "WITH", "WITHOUT",
];

/// Whether `word` is an SQLite keyword, ignoring case
pub fn is_keyword(word: &str) -> bool {
    SQLITE_KEYWORDS
        .binary_search(&word.to_ascii_uppercase().as_str())
        .is_ok()
}

/// Emits `ident` bare when it is a plain identifier that is not a keyword,
/// double-quoted otherwise.
pub fn quote_identifier(ident: &str) -> String {
    if is_plain_identifier(ident) && !is_keyword(ident) {
        ident.to_string()
    } else {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}

fn column_list(descriptor: &EntityDescriptor) -> String {
    descriptor
        .fields()
        .map(|f| quote_identifier(&f.column))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `SELECT <columns> FROM <table> WHERE <identity column> = :id`
pub fn generate_select(descriptor: &EntityDescriptor) -> GeneratedSql {
    GeneratedSql::parse(&format!(
        "{} WHERE {} = :{}",
        select_all_text(descriptor),
        quote_identifier(&descriptor.identity().column),
        ID_PARAMETER
    ))
}

/// `SELECT <columns> FROM <table>`
pub fn generate_select_all(descriptor: &EntityDescriptor) -> GeneratedSql {
    GeneratedSql::parse(&select_all_text(descriptor))
}

fn select_all_text(descriptor: &EntityDescriptor) -> String {
    format!(
        "SELECT {} FROM {}",
        column_list(descriptor),
        quote_identifier(descriptor.table())
    )
}

/// `INSERT INTO <table> (<columns>) VALUES (:<field>, ...)`, one placeholder
/// per name in the order given.
pub fn generate_insert<S: AsRef<str>>(
    descriptor: &EntityDescriptor,
    field_names: &[S],
) -> Result<GeneratedSql> {
    let table = quote_identifier(descriptor.table());
    if field_names.is_empty() {
        return Ok(GeneratedSql::parse(&format!(
            "INSERT INTO {table} DEFAULT VALUES"
        )));
    }

    let mut columns = Vec::with_capacity(field_names.len());
    let mut placeholders = Vec::with_capacity(field_names.len());
    for name in field_names {
        let name = name.as_ref();
        let field = descriptor.field(name).ok_or_else(|| {
            OrmError::invalid_mapping(
                descriptor.type_name(),
                format!("`{name}` is not a persistable field of table `{}`", descriptor.table()),
            )
        })?;
        columns.push(quote_identifier(&field.column));
        placeholders.push(format!(":{}", field.name));
    }

    Ok(GeneratedSql::parse(&format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    )))
}

/// `DELETE FROM <table> WHERE <identity column> = :<identity field>`
pub fn generate_delete(descriptor: &EntityDescriptor) -> GeneratedSql {
    let identity = descriptor.identity();
    GeneratedSql::parse(&format!(
        "DELETE FROM {} WHERE {} = :{}",
        quote_identifier(descriptor.table()),
        quote_identifier(&identity.column),
        identity.name
    ))
}
