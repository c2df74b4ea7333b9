//! Named-parameter statements on top of rusqlite's positional binding.
//!
//! SQL is written with `:name` placeholders. [`GeneratedSql::parse`] scans
//! the text once, rewriting every placeholder occurrence into a positional
//! `?` and recording the names in text order; [`NamedStatement`] then binds
//! a [`Params`] map onto those positions and can be re-bound and re-run
//! without parsing again.

use std::iter::Peekable;
use std::str::Chars;

use log::debug;
use rusqlite::{params_from_iter, Connection, Statement};

use crate::error::{OrmError, Result};
use crate::sqlite::{Params, Row, Value};

/// SQL text with named placeholders, together with its positional rewrite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSql {
    text: String,
    positional: String,
    parameters: Vec<String>,
}

impl GeneratedSql {
    /// Tokenizes `sql`, recognizing `:identifier` placeholders.
    ///
    /// Placeholder names take the longest run of identifier characters, so
    /// `:identity` never matches `:id`. Colons inside string literals,
    /// quoted identifiers, comments and `::` casts are left alone.
    pub fn parse(sql: &str) -> Self {
        let mut positional = String::with_capacity(sql.len());
        let mut parameters = Vec::new();
        let mut chars = sql.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\'' | '"' => {
                    positional.push(c);
                    copy_quoted(c, &mut chars, &mut positional);
                }
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    positional.push_str("--");
                    copy_until(&mut chars, &mut positional, "\n");
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    positional.push_str("/*");
                    copy_until(&mut chars, &mut positional, "*/");
                }
                ':' if chars.peek() == Some(&':') => {
                    chars.next();
                    positional.push_str("::");
                }
                ':' if chars.peek().is_some_and(|n| n.is_ascii_alphabetic() || *n == '_') => {
                    let mut name = String::new();
                    while let Some(&n) = chars.peek() {
                        if !(n.is_ascii_alphanumeric() || n == '_') {
                            break;
                        }
                        name.push(n);
                        chars.next();
                    }
                    parameters.push(name);
                    positional.push('?');
                }
                _ => positional.push(c),
            }
        }

        Self {
            text: sql.to_string(),
            positional,
            parameters,
        }
    }

    /// The SQL as written, with named placeholders
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn positional(&self) -> &str {
        &self.positional
    }

    /// Placeholder names in text order, one entry per occurrence
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }
}

/// Copies a quoted section up to and including its closing quote. A doubled
/// quote is an escaped quote, not the end of the section.
fn copy_quoted(quote: char, chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    while let Some(c) = chars.next() {
        out.push(c);
        if c == quote {
            if chars.peek() == Some(&quote) {
                out.push(quote);
                chars.next();
            } else {
                return;
            }
        }
    }
}

/// Copies a comment body up to and including `terminator`
fn copy_until(chars: &mut Peekable<Chars<'_>>, out: &mut String, terminator: &str) {
    let mut body = String::new();
    for c in chars.by_ref() {
        body.push(c);
        if body.ends_with(terminator) {
            break;
        }
    }
    out.push_str(&body);
}

/// A prepared statement addressed by placeholder name
pub struct NamedStatement<'conn> {
    statement: Statement<'conn>,
    sql: GeneratedSql,
    bound: Option<Vec<Value>>,
}

impl<'conn> NamedStatement<'conn> {
    pub fn prepare(conn: &'conn Connection, sql: &str) -> Result<Self> {
        Self::from_generated(conn, GeneratedSql::parse(sql))
    }

    pub fn from_generated(conn: &'conn Connection, sql: GeneratedSql) -> Result<Self> {
        debug!("preparing `{}`", sql.as_str());
        let statement = conn
            .prepare(sql.positional())
            .map_err(|e| OrmError::execution(sql.as_str(), e))?;
        Ok(Self {
            statement,
            sql,
            bound: None,
        })
    }

    pub fn sql(&self) -> &GeneratedSql {
        &self.sql
    }

    /// Binds every placeholder occurrence from `params`.
    ///
    /// Keys not used by the statement are ignored. A placeholder without an
    /// entry fails immediately and leaves the statement unbound.
    pub fn set_parameters(&mut self, params: &Params) -> Result<()> {
        self.bound = None;
        let values = self
            .sql
            .parameters()
            .iter()
            .map(|name| {
                params
                    .get(name)
                    .cloned()
                    .ok_or_else(|| OrmError::MissingParameter {
                        name: name.clone(),
                        sql: self.sql.as_str().to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        self.bound = Some(values);
        Ok(())
    }

    pub fn execute_query(&mut self) -> Result<Vec<Row>> {
        let Self {
            statement,
            sql,
            bound,
        } = self;
        let sql: &GeneratedSql = sql;
        let values = bound_values(sql, bound.as_deref())?;
        let failed = |e| OrmError::execution(sql.as_str(), e);

        let columns: Vec<String> = statement
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let mut rows = statement
            .query(params_from_iter(values.iter()))
            .map_err(failed)?;

        let mut result = Vec::new();
        while let Some(row) = rows.next().map_err(failed)? {
            let mapped = columns
                .iter()
                .enumerate()
                .map(|(i, column)| -> rusqlite::Result<(String, Value)> {
                    Ok((column.clone(), Value::from(row.get_ref(i)?)))
                })
                .collect::<rusqlite::Result<Row>>()
                .map_err(failed)?;
            result.push(mapped);
        }
        debug!("`{}` returned {} row(s)", sql.as_str(), result.len());
        Ok(result)
    }

    /// Runs the statement, returning the number of affected rows
    pub fn execute_update(&mut self) -> Result<usize> {
        let values = bound_values(&self.sql, self.bound.as_deref())?;
        let affected = self
            .statement
            .execute(params_from_iter(values.iter()))
            .map_err(|e| OrmError::execution(self.sql.as_str(), e))?;
        debug!("`{}` affected {} row(s)", self.sql.as_str(), affected);
        Ok(affected)
    }
}

fn bound_values<'a>(sql: &GeneratedSql, bound: Option<&'a [Value]>) -> Result<&'a [Value]> {
    match (bound, sql.parameters().first()) {
        (Some(values), _) => Ok(values),
        (None, None) => Ok(&[]),
        (None, Some(name)) => Err(OrmError::MissingParameter {
            name: name.clone(),
            sql: sql.as_str().to_string(),
        }),
    }
}
