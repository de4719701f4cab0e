//! Diagram layout: visible columns, rank-bucketed node widths and edge styling.

use super::attrs::{default_edge_attrs, default_graph_attrs, default_node_attrs, DEFAULT_FONTSIZE};
use super::{Cluster, ColumnMode, Diagram, DiagramOptions, Edge, Node};
use crate::schema::{Schema, Table};
use ahash::{AHashMap, AHashSet};
use sha2::{Digest, Sha256};
use unicode_width::UnicodeWidthStr;

/// Build the diagram description of a schema
pub fn build_diagram(schema: &Schema, options: &DiagramOptions) -> Diagram {
    let mut graph = default_graph_attrs();
    graph.merge(&options.graph);
    let mut node = default_node_attrs();
    node.merge(&options.node);
    let mut edge = default_edge_attrs();
    edge.merge(&options.edge);

    let fontsize = graph
        .get("fontsize")
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(DEFAULT_FONTSIZE);

    let columns: AHashMap<&str, Vec<&str>> = schema
        .tables
        .iter()
        .map(|t| (t.name.as_str(), visible_columns(t, options.columns)))
        .collect();

    // widest label per rank bucket, over every table
    let mut widths: AHashMap<u32, usize> = AHashMap::new();
    for table in &schema.tables {
        let widest = columns[table.name.as_str()]
            .iter()
            .filter_map(|c| table.column(c))
            .map(|c| label_width(&c.name, &c.logical_name))
            .chain(std::iter::once(label_width(&table.name, &table.logical_name)))
            .max()
            .unwrap_or(0);
        let bucket = widths.entry(table.min_rank()).or_insert(0);
        *bucket = (*bucket).max(widest);
    }

    let mut clusters = Vec::new();
    let mut edges = Vec::new();

    for table in schema.diagram_tables(options.skip_no_relation) {
        let visible = &columns[table.name.as_str()];
        let width = fontsize / 2.0 * (widths[&table.min_rank()] + 4) as f64 / 72.0;

        let nodes = visible
            .iter()
            .filter_map(|c| table.column(c))
            .map(|column| Node {
                name: format!("column_{}_{}", table.name, column.name),
                table: table.name.clone(),
                column: column.name.clone(),
                id: format!("relationship:column-{}.{}", table.name, column.name),
                class: format!("table-{} column-{}-{}", table.name, table.name, column.name),
                label: label(&column.name, &column.logical_name),
                width,
            })
            .collect();

        let class = std::iter::once(format!("table-{}", table.name))
            .chain(visible.iter().map(|c| format!("column-{}-{}", table.name, c)))
            .collect::<Vec<_>>()
            .join(" ");

        clusters.push(Cluster {
            table: table.name.clone(),
            name: format!("cluster_{}", table.name),
            id: format!("relationship:table-{}", table.name),
            class,
            label: label(&table.name, &table.logical_name),
            nodes,
        });

        let min_rank = table.min_rank();
        for (name, fk) in &table.foreign_keys {
            let constraint = table.rank(name) <= min_rank;
            for (local, foreign) in fk.column_pairs() {
                edges.push(Edge {
                    from: format!("column_{}_{}", fk.foreign_table, foreign),
                    to: format!("column_{}_{}", fk.local_table, local),
                    local_table: fk.local_table.clone(),
                    foreign_table: fk.foreign_table.clone(),
                    constraint_name: name.clone(),
                    id: format!("relationship:fkey-{}", name),
                    class: format!(
                        "fkey-{} table-{} table-{} column-{}-{} column-{}-{}",
                        name,
                        fk.local_table,
                        fk.foreign_table,
                        fk.foreign_table,
                        foreign,
                        fk.local_table,
                        local
                    ),
                    color: edge_color(&format!("{}.{}", fk.foreign_table, foreign)),
                    constraint,
                });
            }
        }
    }

    Diagram {
        name: "erd".to_string(),
        graph,
        node,
        edge,
        clusters,
        edges,
    }
}

/// Columns shown for `table`, in definition order
pub fn visible_columns(table: &Table, mode: ColumnMode) -> Vec<&str> {
    if mode == ColumnMode::All {
        return table.columns.iter().map(|c| c.name.as_str()).collect();
    }

    let mut related: AHashSet<&str> = AHashSet::new();
    if let Some(pk) = table.primary_key() {
        related.extend(pk.columns.iter().map(String::as_str));
    }
    for fk in table.foreign_keys.values() {
        related.extend(fk.local_columns.iter().map(String::as_str));
    }
    for fk in table.reference_keys.values() {
        related.extend(fk.foreign_columns.iter().map(String::as_str));
    }

    table
        .columns
        .iter()
        .map(|c| c.name.as_str())
        .filter(|c| related.contains(c))
        .collect()
}

/// Stable, legible color for a `<table>.<column>` source: each channel stays below 160
pub fn edge_color(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    let rgb = [digest[0] % 160, digest[1] % 160, digest[2] % 160];
    format!("#{}", hex::encode(rgb))
}

fn label(name: &str, logical_name: &str) -> String {
    if logical_name.is_empty() {
        name.to_string()
    } else {
        format!("{}: {}", name, logical_name)
    }
}

/// Display width of the widest line of a name/logical-name label
fn label_width(name: &str, logical_name: &str) -> usize {
    format!("{}{}", name, logical_name)
        .lines()
        .map(UnicodeWidthStr::width)
        .max()
        .unwrap_or(0)
}
