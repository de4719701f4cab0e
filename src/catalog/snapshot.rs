//! Catalog snapshots stored as YAML or JSON files.

use super::{database_name_from_path, Catalog, Introspector};
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads a previously captured [`Catalog`] from disk
#[derive(Debug, Clone)]
pub struct SnapshotIntrospector {
    path: PathBuf,
}

impl SnapshotIntrospector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse snapshot text; JSON when `is_json`, YAML otherwise
    pub fn parse(content: &str, is_json: bool) -> Result<Catalog> {
        let catalog = if is_json {
            serde_json::from_str(content)?
        } else {
            serde_yaml_ng::from_str(content)?
        };
        Ok(catalog)
    }
}

impl Introspector for SnapshotIntrospector {
    fn introspect(&self) -> Result<Catalog> {
        let content = fs::read_to_string(&self.path)?;
        let mut catalog = Self::parse(&content, is_json_path(&self.path))?;
        if catalog.database.is_empty() {
            catalog.database = database_name_from_path(&self.path);
        }
        debug!(
            path = %self.path.display(),
            tables = catalog.tables.len(),
            views = catalog.views.len(),
            "loaded catalog snapshot"
        );
        Ok(catalog)
    }
}

fn is_json_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const YAML: &str = r#"
tables:
  - name: t_article
    comment: "Article\nBlog posts"
    columns:
      - { name: article_id, type: integer, not_null: true }
      - { name: title, type: string, comment: "Title" }
    indexes:
      - { name: PRIMARY, columns: [article_id], unique: true, primary: true }
  - name: t_comment
    columns:
      - { name: comment_id, type: integer, not_null: true }
      - { name: article_id, type: integer, not_null: true }
    indexes:
      - { name: PRIMARY, columns: [comment_id], unique: true, primary: true }
    foreign_keys:
      - name: fk_comment_article
        columns: [article_id]
        foreign_table: t_article
        foreign_columns: [article_id]
        on_delete: CASCADE
"#;

    #[test]
    fn test_parse_yaml() {
        let catalog = SnapshotIntrospector::parse(YAML, false).unwrap();
        assert_eq!(catalog.tables.len(), 2);
        let comment = catalog.table("t_comment").unwrap();
        assert_eq!(comment.foreign_keys[0].foreign_table, "t_article");
        assert_eq!(comment.foreign_keys[0].on_delete.as_deref(), Some("CASCADE"));
        assert_eq!(
            catalog.table("t_article").unwrap().comment.as_deref(),
            Some("Article\nBlog posts")
        );
    }

    #[test]
    fn test_introspect_defaults_database_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blog.yaml");
        fs::write(&path, YAML).unwrap();

        let catalog = SnapshotIntrospector::new(&path).introspect().unwrap();
        assert_eq!(catalog.database, "blog");
    }

    #[test]
    fn test_json_snapshot() {
        let json = r#"{"database":"shop","tables":[{"name":"users","columns":[{"name":"id","type":"integer"}]}]}"#;
        let catalog = SnapshotIntrospector::parse(json, true).unwrap();
        assert_eq!(catalog.database, "shop");
        assert_eq!(catalog.tables[0].columns[0].col_type, "integer");
    }
}
