//! Normalized schema object graph.
//!
//! This module provides:
//! - Data models for tables, columns, indexes, foreign keys, views, routines,
//!   events and triggers after filtering and comment splitting
//! - The [`SchemaBuilder`] that normalizes a raw [`Catalog`](crate::catalog::Catalog)
//! - Relationship resolution (foreign/reference keys) and rank computation
//!
//! A [`Schema`] is immutable once [`SchemaBuilder::build`] returns; renderers
//! only ever borrow it.

mod builder;
mod hooks;
mod relation;
mod resolve;

pub use builder::{humanize_interval, reindex, SchemaBuilder, DEFAULT_DELIMITER};
pub use hooks::{Hook, HookOutcome, Hooks};
pub use relation::{ColumnPairs, RelationMap};
pub use resolve::{compute_ranks, link_foreign_keys};

use std::collections::BTreeMap;
use std::fmt;

/// Constraint label for NOT NULL columns outside the primary key
pub const NOT_NULL_LABEL: &str = "NotNull";

/// Identifies a foreign key across the whole schema: declaring table plus constraint name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConstraintKey {
    pub table: String,
    pub name: String,
}

impl ConstraintKey {
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ConstraintKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.name)
    }
}

/// Column with split comment and constraint labels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Column {
    pub name: String,
    pub logical_name: String,
    pub summary: String,
    pub col_type: String,
    pub type_declaration: Option<String>,
    pub not_null: bool,
    pub default: Option<String>,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub unsigned: bool,
    pub collation: Option<String>,
    pub generated: Option<String>,
    /// `NotNull` and `<index>-<position>` labels, in index order
    pub constraints: Vec<String>,
}

impl Column {
    /// Type as written in DDL when known, else the type name
    pub fn display_type(&self) -> &str {
        self.type_declaration.as_deref().unwrap_or(&self.col_type)
    }
}

/// Index after implicit-index removal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub primary: bool,
    pub flags: Vec<String>,
    pub options: BTreeMap<String, String>,
}

/// Foreign key constraint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForeignKey {
    pub name: String,
    pub local_table: String,
    pub local_columns: Vec<String>,
    pub foreign_table: String,
    pub foreign_columns: Vec<String>,
    pub on_update: Option<String>,
    pub on_delete: Option<String>,
}

impl ForeignKey {
    pub fn key(&self) -> ConstraintKey {
        ConstraintKey::new(&self.local_table, &self.name)
    }

    /// Positionally paired `(local, foreign)` columns
    pub fn column_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.local_columns
            .iter()
            .zip(&self.foreign_columns)
            .map(|(l, f)| (l.as_str(), f.as_str()))
    }
}

/// Trigger attached to a table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trigger {
    pub name: String,
    pub table: String,
    pub statement: String,
    pub event: String,
    pub timing: String,
}

/// Normalized table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub name: String,
    pub logical_name: String,
    pub summary: String,
    pub collation: Option<String>,
    pub engine: Option<String>,
    pub row_format: Option<String>,
    pub columns: Vec<Column>,
    /// Primary key first, then by name; implicit indexes removed
    pub indexes: Vec<Index>,
    /// Declared foreign keys whose target survived filtering, by constraint name
    pub foreign_keys: BTreeMap<String, ForeignKey>,
    /// Foreign keys of other tables (or this one) pointing here
    pub reference_keys: BTreeMap<ConstraintKey, ForeignKey>,
    pub triggers: Vec<Trigger>,
    /// Rank per foreign key name
    pub ranks: BTreeMap<String, u32>,
}

impl Table {
    /// Get a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The primary key index, if any
    pub fn primary_key(&self) -> Option<&Index> {
        self.indexes.iter().find(|i| i.primary)
    }

    /// Whether `column` belongs to the primary key
    pub fn is_primary_column(&self, column: &str) -> bool {
        self.primary_key()
            .map(|pk| pk.columns.iter().any(|c| c == column))
            .unwrap_or(false)
    }

    /// Smallest foreign key rank, 0 when the table has none
    pub fn min_rank(&self) -> u32 {
        self.ranks.values().min().copied().unwrap_or(0)
    }

    /// Rank of a foreign key; missing entries (cycle back-edges) count as 0
    pub fn rank(&self, constraint: &str) -> u32 {
        self.ranks.get(constraint).copied().unwrap_or(0)
    }

    /// Whether the table takes part in any relationship
    pub fn has_relations(&self) -> bool {
        !self.foreign_keys.is_empty() || !self.reference_keys.is_empty()
    }
}

/// Normalized view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct View {
    pub name: String,
    pub logical_name: String,
    pub summary: String,
    pub sql: String,
    pub check_option: Option<String>,
    pub updatable: bool,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
}

/// Stored procedure or function
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Routine {
    pub name: String,
    pub logical_name: String,
    pub summary: String,
    pub kind: String,
    /// `"<MODE> <name> <type>"` entries joined by `", "`
    pub parameters: String,
    pub return_type: Option<String>,
    pub statement: String,
}

/// Scheduled event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    pub name: String,
    pub logical_name: String,
    pub summary: String,
    pub statement: String,
    /// Human-readable interval such as `1d 2h`
    pub interval: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
}

/// The resolved schema object graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub database: String,
    /// Sorted by name
    pub tables: Vec<Table>,
    pub views: Vec<View>,
    pub routines: Vec<Routine>,
    pub events: Vec<Event>,
    /// Triggers of all included tables, sorted by name
    pub triggers: Vec<Trigger>,
}

impl Schema {
    /// Get a table by name
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.iter().find(|v| v.name == name)
    }

    pub fn routine(&self, name: &str) -> Option<&Routine> {
        self.routines.iter().find(|r| r.name == name)
    }

    pub fn event(&self, name: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.name == name)
    }

    /// Tables shown in a diagram; isolated tables dropped when `skip_no_relation`
    pub fn diagram_tables(&self, skip_no_relation: bool) -> impl Iterator<Item = &Table> {
        self.tables
            .iter()
            .filter(move |t| !skip_no_relation || t.has_relations())
    }

    /// Total number of resolved foreign keys
    pub fn foreign_key_count(&self) -> usize {
        self.tables.iter().map(|t| t.foreign_keys.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> Table {
        Table {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_min_rank_defaults_to_zero() {
        let mut t = table("t_comment");
        assert_eq!(t.min_rank(), 0);
        t.ranks.insert("fk_a".to_string(), 2);
        t.ranks.insert("fk_b".to_string(), 1);
        assert_eq!(t.min_rank(), 1);
        assert_eq!(t.rank("fk_a"), 2);
        assert_eq!(t.rank("missing"), 0);
    }

    #[test]
    fn test_primary_column() {
        let mut t = table("t_article");
        t.indexes.push(Index {
            name: "PRIMARY".to_string(),
            columns: vec!["article_id".to_string()],
            unique: true,
            primary: true,
            ..Default::default()
        });
        assert!(t.is_primary_column("article_id"));
        assert!(!t.is_primary_column("title"));
    }

    #[test]
    fn test_diagram_tables() {
        let mut linked = table("a");
        linked.foreign_keys.insert(
            "fk".to_string(),
            ForeignKey {
                name: "fk".to_string(),
                local_table: "a".to_string(),
                foreign_table: "b".to_string(),
                ..Default::default()
            },
        );
        let schema = Schema {
            tables: vec![linked, table("lonely")],
            ..Default::default()
        };
        assert_eq!(schema.diagram_tables(false).count(), 2);
        let names: Vec<_> = schema.diagram_tables(true).map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn test_constraint_key_display() {
        assert_eq!(
            ConstraintKey::new("t_comment", "fk_comment_article").to_string(),
            "t_comment.fk_comment_article"
        );
    }
}
