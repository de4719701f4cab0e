//! Graphviz DOT serialization of a [`Diagram`].
//!
//! Each cluster and each `<local> -> <foreign>` edge group is wrapped in
//! `# subgraph-begin:` / `# edge-begin:` comment lines so consumers can cut
//! the source into per-table pieces.

use crate::diagram::{Attributes, Diagram, Edge, CLUSTER_ATTRS, NODE_ATTRS};

/// Generate DOT source for the diagram
pub fn to_dot(diagram: &Diagram) -> String {
    let mut output = String::new();

    output.push_str(&format!("digraph {} {{\n", escape_dot_id(&diagram.name)));
    write_attr_stmt(&mut output, "graph", &diagram.graph);
    write_attr_stmt(&mut output, "node", &diagram.node);
    write_attr_stmt(&mut output, "edge", &diagram.edge);

    for cluster in &diagram.clusters {
        output.push_str(&format!("# subgraph-begin: {}\n", cluster.table));
        output.push_str(&format!("  subgraph {} {{\n", escape_dot_id(&cluster.name)));

        let mut attrs = Attributes::new();
        attrs.set("id", &cluster.id);
        attrs.set("class", &cluster.class);
        for (k, v) in CLUSTER_ATTRS {
            attrs.set(k, v);
        }
        attrs.set("label", &cluster.label);
        output.push_str(&format!("    graph [{}];\n", attr_list(&attrs)));

        for node in &cluster.nodes {
            let mut attrs = Attributes::new();
            attrs.set("id", &node.id);
            attrs.set("class", &node.class);
            attrs.set("width", format!("{:.4}", node.width));
            for (k, v) in NODE_ATTRS {
                attrs.set(k, v);
            }
            output.push_str(&format!(
                "    {} [{}, label=\"{}\\l\"];\n",
                escape_dot_id(&node.name),
                attr_list(&attrs),
                escape_quotes(&node.label)
            ));
        }

        output.push_str("  }\n");
        output.push_str(&format!("# subgraph-end: {}\n", cluster.table));
    }

    for (group, edges) in edge_groups(&diagram.edges) {
        output.push_str(&format!("# edge-begin: {}\n", group));
        for edge in edges {
            let mut attrs = Attributes::new();
            attrs.set("id", &edge.id);
            attrs.set("class", &edge.class);
            attrs.set("color", &edge.color);
            attrs.set("constraint", edge.constraint);
            output.push_str(&format!(
                "  {} -> {} [{}];\n",
                escape_dot_id(&edge.from),
                escape_dot_id(&edge.to),
                attr_list(&attrs)
            ));
        }
        output.push_str(&format!("# edge-end: {}\n", group));
    }

    output.push_str("}\n");
    output
}

/// Edges grouped by `<local> -> <foreign>`, groups in first-seen order
fn edge_groups(edges: &[Edge]) -> Vec<(String, Vec<&Edge>)> {
    let mut groups: Vec<(String, Vec<&Edge>)> = Vec::new();
    for edge in edges {
        let key = edge.group();
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(edge),
            None => groups.push((key, vec![edge])),
        }
    }
    groups
}

fn write_attr_stmt(output: &mut String, kind: &str, attrs: &Attributes) {
    if !attrs.is_empty() {
        output.push_str(&format!("  {} [{}];\n", kind, attr_list(attrs)));
    }
}

fn attr_list(attrs: &Attributes) -> String {
    attrs
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", escape_dot_id(k), escape_quotes(v)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Escape double quotes; other escapes (`\l`, `\n`) pass through to Graphviz
fn escape_quotes(s: &str) -> String {
    s.replace('"', "\\\"")
}

/// Escape a string for use as a DOT identifier
fn escape_dot_id(s: &str) -> String {
    if !s.is_empty()
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !s.starts_with(|c: char| c.is_ascii_digit())
    {
        s.to_string()
    } else {
        format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::{
        default_edge_attrs, default_graph_attrs, default_node_attrs, Cluster, Node,
    };

    fn edge(local: &str, foreign: &str, name: &str) -> Edge {
        Edge {
            from: format!("column_{}_id", foreign),
            to: format!("column_{}_{}_id", local, foreign),
            local_table: local.to_string(),
            foreign_table: foreign.to_string(),
            constraint_name: name.to_string(),
            id: format!("relationship:fkey-{}", name),
            class: format!("fkey-{}", name),
            color: "#102030".to_string(),
            constraint: true,
        }
    }

    fn diagram() -> Diagram {
        Diagram {
            name: "erd".to_string(),
            graph: default_graph_attrs(),
            node: default_node_attrs(),
            edge: default_edge_attrs(),
            clusters: vec![Cluster {
                table: "t_article".to_string(),
                name: "cluster_t_article".to_string(),
                id: "relationship:table-t_article".to_string(),
                class: "table-t_article column-t_article-article_id".to_string(),
                label: "t_article: \"Article\"".to_string(),
                nodes: vec![Node {
                    name: "column_t_article_article_id".to_string(),
                    table: "t_article".to_string(),
                    column: "article_id".to_string(),
                    id: "relationship:column-t_article.article_id".to_string(),
                    class: "table-t_article column-t_article-article_id".to_string(),
                    label: "article_id: ArticleID".to_string(),
                    width: 1.5,
                }],
            }],
            edges: vec![
                edge("t_comment", "t_article", "fk_a"),
                edge("t_tag", "t_article", "fk_b"),
                edge("t_comment", "t_article", "fk_c"),
            ],
        }
    }

    #[test]
    fn test_header_and_defaults() {
        let dot = to_dot(&diagram());
        assert!(dot.starts_with("digraph erd {\n"));
        assert!(dot.contains("  graph [charset=\"UTF-8\", rankdir=\"LR\""));
        assert!(dot.contains("  edge [dir=\"back\", arrowtail=\"vee\", arrowsize=\"1\"];"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn test_cluster_block() {
        let dot = to_dot(&diagram());
        assert!(dot.contains("# subgraph-begin: t_article\n  subgraph cluster_t_article {\n"));
        assert!(dot.contains("id=\"relationship:table-t_article\""));
        assert!(dot.contains("labelloc=\"t\", labeljust=\"l\", margin=\"1\", bgcolor=\"#eeeeee\""));
        assert!(dot.contains("label=\"t_article: \\\"Article\\\"\""));
        assert!(dot.contains("# subgraph-end: t_article\n"));
    }

    #[test]
    fn test_node_line() {
        let dot = to_dot(&diagram());
        assert!(dot.contains(
            "    column_t_article_article_id [id=\"relationship:column-t_article.article_id\""
        ));
        assert!(dot.contains("width=\"1.5000\", fixedsize=\"true\", height=\"0.36\""));
        assert!(dot.contains("label=\"article_id: ArticleID\\l\"];"));
    }

    #[test]
    fn test_edges_grouped_by_table_pair() {
        let dot = to_dot(&diagram());
        assert_eq!(dot.matches("# edge-begin: t_comment -> t_article\n").count(), 1);
        assert_eq!(dot.matches("# edge-begin: t_tag -> t_article\n").count(), 1);
        // all three edges survive, not just the last per pair
        assert_eq!(dot.matches(" -> column_").count(), 3);

        let block_start = dot.find("# edge-begin: t_comment -> t_article").unwrap();
        let block_end = dot.find("# edge-end: t_comment -> t_article").unwrap();
        let block = &dot[block_start..block_end];
        assert!(block.contains("fkey-fk_a"));
        assert!(block.contains("fkey-fk_c"));
        assert!(dot.contains("constraint=\"true\""));
    }

    #[test]
    fn test_escape_dot_id() {
        assert_eq!(escape_dot_id("column_t_a"), "column_t_a");
        assert_eq!(escape_dot_id("column_t-a"), "\"column_t-a\"");
        assert_eq!(escape_dot_id("1abc"), "\"1abc\"");
        assert_eq!(escape_dot_id("a\"b"), "\"a\\\"b\"");
    }
}
