//! Renderer-agnostic ER diagram description.
//!
//! One cluster per visible table, one node per visible column and one edge
//! per foreign key column pair. Text syntaxes (DOT) and rasterization live in
//! [`crate::render`].

mod attrs;
mod layout;

pub use attrs::{
    default_edge_attrs, default_graph_attrs, default_node_attrs, AttrOverrides, AttrValue,
    Attributes, CLUSTER_ATTRS, DEFAULT_FONTSIZE, NODE_ATTRS,
};
pub use layout::{build_diagram, edge_color, visible_columns};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which columns of a table become diagram nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ColumnMode {
    /// Primary key columns and columns on either end of a foreign key
    #[default]
    Related,
    /// Every column
    All,
}

impl FromStr for ColumnMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "related" => Ok(ColumnMode::Related),
            "all" => Ok(ColumnMode::All),
            _ => Err(format!(
                "Unknown column mode: {}. Valid options: related, all",
                s
            )),
        }
    }
}

impl fmt::Display for ColumnMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnMode::Related => write!(f, "related"),
            ColumnMode::All => write!(f, "all"),
        }
    }
}

/// Options for [`build_diagram`]
#[derive(Debug, Clone, Default)]
pub struct DiagramOptions {
    pub columns: ColumnMode,
    /// Hide tables without foreign or reference keys
    pub skip_no_relation: bool,
    pub graph: AttrOverrides,
    pub node: AttrOverrides,
    pub edge: AttrOverrides,
}

/// A table rendered as a cluster
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub table: String,
    /// Graph identifier, `cluster_<table>`
    pub name: String,
    /// DOM id, `relationship:table-<table>`
    pub id: String,
    pub class: String,
    pub label: String,
    pub nodes: Vec<Node>,
}

/// A column rendered as a node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Graph identifier, `column_<table>_<column>`
    pub name: String,
    pub table: String,
    pub column: String,
    /// DOM id, `relationship:column-<table>.<column>`
    pub id: String,
    pub class: String,
    pub label: String,
    /// Fixed width in inches, shared by all tables of one rank
    pub width: f64,
}

/// One foreign key column pair, drawn from the referenced column to the referencing one
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub local_table: String,
    pub foreign_table: String,
    pub constraint_name: String,
    /// DOM id, `relationship:fkey-<constraint>`
    pub id: String,
    pub class: String,
    pub color: String,
    /// Whether the edge takes part in rank assignment
    pub constraint: bool,
}

impl Edge {
    /// `<local> -> <foreign>`, the key edges are grouped under
    pub fn group(&self) -> String {
        format!("{} -> {}", self.local_table, self.foreign_table)
    }
}

/// The complete diagram description
#[derive(Debug, Clone, PartialEq)]
pub struct Diagram {
    pub name: String,
    pub graph: Attributes,
    pub node: Attributes,
    pub edge: Attributes,
    pub clusters: Vec<Cluster>,
    pub edges: Vec<Edge>,
}

impl Diagram {
    pub fn cluster(&self, table: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.table == table)
    }

    pub fn node(&self, table: &str, column: &str) -> Option<&Node> {
        self.cluster(table)?
            .nodes
            .iter()
            .find(|n| n.column == column)
    }

    pub fn node_count(&self) -> usize {
        self.clusters.iter().map(|c| c.nodes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_mode_from_str() {
        assert_eq!("related".parse::<ColumnMode>().unwrap(), ColumnMode::Related);
        assert_eq!("ALL".parse::<ColumnMode>().unwrap(), ColumnMode::All);
        assert!("some".parse::<ColumnMode>().is_err());
    }

    #[test]
    fn test_column_mode_display_and_serde() {
        assert_eq!(ColumnMode::All.to_string(), "all");
        let mode: ColumnMode = serde_yaml_ng::from_str("related").unwrap();
        assert_eq!(mode, ColumnMode::Related);
    }
}
