//! Graphviz attribute lists with built-in defaults.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A scalar attribute value as written in configuration (`ranksep: 2`, `rankdir: TB`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Number(n) => write!(f, "{}", n),
            AttrValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

/// Attribute overrides keyed by attribute name
pub type AttrOverrides = BTreeMap<String, AttrValue>;

/// Ordered attribute list; setting an existing key replaces it in place
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Apply overrides on top of the current values
    pub fn merge(&mut self, overrides: &AttrOverrides) {
        for (key, value) in overrides {
            self.set(key, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Attributes {
    fn from(pairs: [(&str, &str); N]) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in pairs {
            attrs.set(k, v);
        }
        attrs
    }
}

/// Font size the node width factor falls back to
pub const DEFAULT_FONTSIZE: f64 = 15.0;

pub fn default_graph_attrs() -> Attributes {
    Attributes::from([
        ("charset", "UTF-8"),
        ("rankdir", "LR"),
        ("ranksep", "1.5"),
        ("nodesep", "0"),
        ("splines", "ortho"),
        ("fontname", "IPAGothic"),
        ("fontsize", "15"),
        ("dpi", "72"),
    ])
}

pub fn default_node_attrs() -> Attributes {
    Attributes::from([
        ("shape", "box"),
        ("style", "filled"),
        ("fillcolor", "white"),
        ("color", "#aaaaaa"),
        ("fontname", "IPAGothic"),
        ("fontsize", "12"),
    ])
}

pub fn default_edge_attrs() -> Attributes {
    Attributes::from([("dir", "back"), ("arrowtail", "vee"), ("arrowsize", "1")])
}

/// Fixed attributes of every table cluster
pub const CLUSTER_ATTRS: [(&str, &str); 6] = [
    ("labelloc", "t"),
    ("labeljust", "l"),
    ("margin", "1"),
    ("bgcolor", "#eeeeee"),
    ("color", "#606060"),
    ("style", "bold"),
];

/// Fixed attributes of every column node
pub const NODE_ATTRS: [(&str, &str); 2] = [("fixedsize", "true"), ("height", "0.36")];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_replaces_in_place() {
        let mut attrs = default_graph_attrs();
        let overrides: AttrOverrides = serde_yaml_ng::from_str("rankdir: TB\nranksep: 2\nconcentrate: true\n").unwrap();
        attrs.merge(&overrides);

        let keys: Vec<_> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys[1], "rankdir");
        assert_eq!(keys.last(), Some(&"concentrate"));
        assert_eq!(attrs.get("rankdir"), Some("TB"));
        assert_eq!(attrs.get("ranksep"), Some("2"));
        assert_eq!(attrs.get("concentrate"), Some("true"));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(default_node_attrs().get("color"), Some("#aaaaaa"));
        assert_eq!(default_edge_attrs().get("dir"), Some("back"));
        assert_eq!(default_graph_attrs().get("fontsize"), Some("15"));
    }
}
