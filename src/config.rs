//! YAML configuration for the describe and dot commands.
//!
//! Command-line values are merged on top of the file: scalar options given on
//! the command line win, include/exclude entries are appended.

use crate::diagram::{AttrOverrides, ColumnMode, DiagramOptions};
use crate::error::{DescribeError, Result};
use crate::filter::ObjectFilter;
use crate::schema::{Hooks, RelationMap, SchemaBuilder, DEFAULT_DELIMITER};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Complete configuration of one describe run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct DescribeConfig {
    /// Include patterns; each entry is a comma-separated list of regexes
    pub include: Vec<String>,
    /// Exclude patterns, same shape as `include`
    pub exclude: Vec<String>,
    /// Splits comments into logical name and summary
    pub delimiter: String,
    /// Extra foreign keys: table -> foreign table -> constraint -> {column: foreign column}
    pub relation: RelationMap,
    /// Diagram column visibility
    pub columns: ColumnMode,
    /// Graphviz graph attribute overrides
    pub graph: AttrOverrides,
    /// Graphviz node attribute overrides
    pub node: AttrOverrides,
    /// Graphviz edge attribute overrides
    pub edge: AttrOverrides,
    /// Key/value pairs printed in the HTML header
    pub vars: BTreeMap<String, String>,
    /// Page title; the database name when absent
    pub title: Option<String>,
}

impl Default for DescribeConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            relation: RelationMap::new(),
            columns: ColumnMode::default(),
            graph: AttrOverrides::new(),
            node: AttrOverrides::new(),
            edge: AttrOverrides::new(),
            vars: BTreeMap::new(),
            title: None,
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub delimiter: Option<String>,
    pub columns: Option<ColumnMode>,
    pub title: Option<String>,
}

impl DescribeConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(content)?)
    }

    /// Apply command-line values on top of this configuration
    pub fn merge(&mut self, overrides: ConfigOverrides) {
        self.include.extend(overrides.include);
        self.exclude.extend(overrides.exclude);
        if let Some(delimiter) = overrides.delimiter {
            self.delimiter = delimiter;
        }
        if let Some(columns) = overrides.columns {
            self.columns = columns;
        }
        if overrides.title.is_some() {
            self.title = overrides.title;
        }
    }

    /// Reject settings that can never work, before any catalog access
    pub fn validate(&self) -> Result<()> {
        if self.delimiter.is_empty() {
            return Err(DescribeError::EmptyDelimiter);
        }
        self.filter()?;
        Ok(())
    }

    /// Compile the include/exclude filter
    pub fn filter(&self) -> Result<ObjectFilter> {
        ObjectFilter::new(&self.include, &self.exclude)
    }

    /// A schema builder configured from this file, with the given hooks
    pub fn schema_builder(&self, hooks: Hooks) -> Result<SchemaBuilder> {
        self.validate()?;
        Ok(SchemaBuilder::new()
            .delimiter(self.delimiter.clone())
            .filter(self.filter()?)
            .relation(self.relation.clone())
            .hooks(hooks))
    }

    pub fn diagram_options(&self, skip_no_relation: bool) -> DiagramOptions {
        DiagramOptions {
            columns: self.columns,
            skip_no_relation,
            graph: self.graph.clone(),
            node: self.node.clone(),
            edge: self.edge.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::AttrValue;

    const SAMPLE: &str = r#"
include: ["t_.*"]
exclude: ["tmp_.*, bak_.*"]
delimiter: ":"
columns: all
relation:
  t_comment:
    t_article:
      fk_comment_article: { article_id: article_id }
graph: { rankdir: TB, ranksep: 2 }
vars: { Project: blog }
"#;

    #[test]
    fn test_parse_sample() {
        let config = DescribeConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.include, vec!["t_.*"]);
        assert_eq!(config.delimiter, ":");
        assert_eq!(config.columns, ColumnMode::All);
        assert_eq!(config.relation.foreign_keys_for("t_comment").len(), 1);
        assert_eq!(config.graph.get("rankdir"), Some(&AttrValue::Text("TB".to_string())));
        assert_eq!(config.graph["ranksep"].to_string(), "2");
        assert_eq!(config.vars["Project"], "blog");
        assert!(config.node.is_empty());
    }

    #[test]
    fn test_defaults() {
        let config = DescribeConfig::from_yaml("").unwrap();
        assert_eq!(config, DescribeConfig::default());
        assert_eq!(config.delimiter, "\n");
        assert_eq!(config.columns, ColumnMode::Related);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(DescribeConfig::from_yaml("colums: all\n").is_err());
    }

    #[test]
    fn test_merge_cli_wins() {
        let mut config = DescribeConfig::from_yaml(SAMPLE).unwrap();
        config.merge(ConfigOverrides {
            include: vec!["v_.*".to_string()],
            delimiter: Some("|".to_string()),
            columns: Some(ColumnMode::Related),
            ..Default::default()
        });
        assert_eq!(config.include, vec!["t_.*", "v_.*"]);
        assert_eq!(config.exclude, vec!["tmp_.*, bak_.*"]);
        assert_eq!(config.delimiter, "|");
        assert_eq!(config.columns, ColumnMode::Related);
        assert_eq!(config.title, None);
    }

    #[test]
    fn test_validate() {
        let mut config = DescribeConfig::default();
        assert!(config.validate().is_ok());

        config.delimiter = String::new();
        assert!(matches!(config.validate(), Err(DescribeError::EmptyDelimiter)));

        let config = DescribeConfig {
            exclude: vec!["ok, (broken".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DescribeError::InvalidPattern { ref pattern, .. }) if pattern == "(broken"
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("describe.yaml");
        fs::write(&path, SAMPLE).unwrap();
        let config = DescribeConfig::load(&path).unwrap();
        assert_eq!(config.title, None);
        assert_eq!(config.diagram_options(true).columns, ColumnMode::All);
        assert!(config.diagram_options(true).skip_no_relation);
    }
}
