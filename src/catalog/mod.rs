//! Raw catalog metadata as delivered by an introspection source.
//!
//! This module provides:
//! - Plain serde structs for tables, views, routines, events and triggers
//! - The [`Introspector`] trait every catalog source implements
//! - Source selection from a DSN or file path
//! - Snapshot, DDL dump and live DuckDB sources
//!
//! The raw structs double as the on-disk snapshot format, so their field
//! names are part of the public file format.

pub mod ddl;
pub mod dsn;
pub mod live;
pub mod snapshot;

pub use self::ddl::DdlIntrospector;
pub use self::dsn::{ConnectionParams, Environment};
pub use self::live::DuckDbIntrospector;
pub use self::snapshot::SnapshotIntrospector;

use crate::error::{DescribeError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Index flag marking an index the engine created on its own
pub const IMPLICIT_FLAG: &str = "implicit";

/// Name of the primary key index
pub const PRIMARY_INDEX: &str = "PRIMARY";

/// Raw column metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RawColumn {
    pub name: String,
    /// Type name (e.g. `integer`, `string`)
    #[serde(rename = "type")]
    pub col_type: String,
    /// Full type declaration as written in DDL (e.g. `varchar(64)`)
    pub type_declaration: Option<String>,
    pub not_null: bool,
    pub default: Option<String>,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub unsigned: bool,
    pub collation: Option<String>,
    /// Expression of a generated column
    pub generated: Option<String>,
    pub comment: Option<String>,
}

/// Raw index metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RawIndex {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub primary: bool,
    /// Engine flags such as `implicit`, `fulltext`, `spatial`
    pub flags: Vec<String>,
    pub options: BTreeMap<String, String>,
}

impl RawIndex {
    pub fn is_implicit(&self) -> bool {
        self.flags.iter().any(|f| f == IMPLICIT_FLAG)
    }
}

/// Raw foreign key constraint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RawForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub foreign_table: String,
    pub foreign_columns: Vec<String>,
    pub on_update: Option<String>,
    pub on_delete: Option<String>,
}

/// Raw table metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RawTable {
    pub name: String,
    pub comment: Option<String>,
    pub engine: Option<String>,
    pub collation: Option<String>,
    pub row_format: Option<String>,
    pub columns: Vec<RawColumn>,
    pub indexes: Vec<RawIndex>,
    pub foreign_keys: Vec<RawForeignKey>,
}

impl RawTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Option<&RawColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get a mutable column by name
    pub fn column_mut(&mut self, name: &str) -> Option<&mut RawColumn> {
        self.columns.iter_mut().find(|c| c.name == name)
    }
}

/// Raw view metadata; columns and indexes share the table shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RawView {
    pub name: String,
    pub sql: String,
    pub comment: Option<String>,
    pub check_option: Option<String>,
    pub updatable: bool,
    pub columns: Vec<RawColumn>,
    pub indexes: Vec<RawIndex>,
}

/// Routine parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RawParameter {
    /// `IN`, `OUT`, `INOUT` or empty
    pub mode: String,
    pub name: String,
    pub type_declaration: String,
}

/// Raw stored routine (procedure or function)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RawRoutine {
    pub name: String,
    /// `PROCEDURE` or `FUNCTION`
    pub kind: String,
    pub parameters: Vec<RawParameter>,
    pub return_type: Option<String>,
    pub statement: String,
    pub comment: Option<String>,
}

/// Raw scheduled event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RawEvent {
    pub name: String,
    pub statement: String,
    /// ISO-8601 duration such as `P1DT12H`
    pub interval: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub comment: Option<String>,
}

/// Raw trigger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RawTrigger {
    pub name: String,
    pub table: String,
    pub statement: String,
    /// `INSERT`, `UPDATE` or `DELETE`
    pub event: String,
    /// `BEFORE` or `AFTER`
    pub timing: String,
}

/// Everything one introspection pass returns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Catalog {
    /// Database name used for output file names and titles
    pub database: String,
    pub tables: Vec<RawTable>,
    pub views: Vec<RawView>,
    pub routines: Vec<RawRoutine>,
    pub events: Vec<RawEvent>,
    pub triggers: Vec<RawTrigger>,
}

impl Catalog {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Default::default()
        }
    }

    /// Get a table by name
    pub fn table(&self, name: &str) -> Option<&RawTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Get a mutable table by name
    pub fn table_mut(&mut self, name: &str) -> Option<&mut RawTable> {
        self.tables.iter_mut().find(|t| t.name == name)
    }
}

/// A source of raw catalog metadata
pub trait Introspector {
    /// Run one read-only introspection pass
    fn introspect(&self) -> Result<Catalog>;
}

/// Pick the introspector for a DSN (`duckdb:///file.duckdb`) or a catalog file path
pub fn introspector_for(source: &str) -> Result<Box<dyn Introspector>> {
    if source.contains("://") {
        let params = ConnectionParams::resolve(source, &Environment::current())?;
        return match params.driver.as_str() {
            "duckdb" => Ok(Box::new(DuckDbIntrospector::new(params))),
            other => Err(DescribeError::UnsupportedDriver {
                scheme: other.to_string(),
            }),
        };
    }

    let path = Path::new(source);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("yaml" | "yml" | "json") => Ok(Box::new(SnapshotIntrospector::new(path))),
        _ => Ok(Box::new(DdlIntrospector::new(path))),
    }
}

/// Derive a database name from a file path (`dumps/blog.sql.gz` -> `blog`)
pub fn database_name_from_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("schema");
    file_name
        .split('.')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("schema")
        .to_string()
}
