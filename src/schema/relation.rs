//! Static relation map: foreign keys the catalog does not declare.
//!
//! Shape: local table -> foreign table -> constraint name -> {local column: foreign column}.

use crate::catalog::{Catalog, RawForeignKey};
use crate::error::{DescribeError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `{local column: foreign column}` pairs of one constraint
pub type ColumnPairs = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RelationMap(BTreeMap<String, BTreeMap<String, BTreeMap<String, ColumnPairs>>>);

impl RelationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Add or replace one constraint
    pub fn insert(
        &mut self,
        table: impl Into<String>,
        foreign_table: impl Into<String>,
        constraint: impl Into<String>,
        pairs: ColumnPairs,
    ) {
        self.0
            .entry(table.into())
            .or_default()
            .entry(foreign_table.into())
            .or_default()
            .insert(constraint.into(), pairs);
    }

    /// Local tables with entries
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Merge `other` into this map; entries of `other` win
    pub fn extend(&mut self, other: RelationMap) {
        for (table, foreign) in other.0 {
            for (foreign_table, constraints) in foreign {
                for (constraint, pairs) in constraints {
                    self.insert(table.clone(), foreign_table.clone(), constraint, pairs);
                }
            }
        }
    }

    /// Check entry shapes against the unfiltered catalog.
    ///
    /// Every local table must exist in the catalog and every local column in
    /// that table; each constraint needs at least one column pair.
    pub fn validate(&self, catalog: &Catalog) -> Result<()> {
        for (table_name, foreign) in &self.0 {
            let table = catalog
                .table(table_name)
                .ok_or_else(|| DescribeError::UnknownRelationTable {
                    table: table_name.clone(),
                })?;
            for constraints in foreign.values() {
                for (constraint, pairs) in constraints {
                    if pairs.is_empty() {
                        return Err(DescribeError::EmptyRelation {
                            table: table_name.clone(),
                            constraint: constraint.clone(),
                        });
                    }
                    if let Some(column) = pairs.keys().find(|c| table.column(c).is_none()) {
                        return Err(DescribeError::UnknownRelationColumn {
                            table: table_name.clone(),
                            column: column.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Raw foreign keys declared for `table`
    pub fn foreign_keys_for(&self, table: &str) -> Vec<RawForeignKey> {
        let Some(foreign) = self.0.get(table) else {
            return Vec::new();
        };
        foreign
            .iter()
            .flat_map(|(foreign_table, constraints)| {
                constraints.iter().map(move |(name, pairs)| RawForeignKey {
                    name: name.clone(),
                    columns: pairs.keys().cloned().collect(),
                    foreign_table: foreign_table.clone(),
                    foreign_columns: pairs.values().cloned().collect(),
                    ..Default::default()
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{RawColumn, RawTable};

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new("blog");
        let mut comment = RawTable::new("t_comment");
        comment.columns.push(RawColumn {
            name: "article_id".to_string(),
            ..Default::default()
        });
        catalog.tables.push(comment);
        catalog
    }

    fn pairs(local: &str, foreign: &str) -> ColumnPairs {
        BTreeMap::from([(local.to_string(), foreign.to_string())])
    }

    #[test]
    fn test_parse_yaml_shape() {
        let yaml = "t_comment:\n  t_article:\n    fk_comment_article: { article_id: article_id }\n";
        let map: RelationMap = serde_yaml_ng::from_str(yaml).unwrap();
        let fks = map.foreign_keys_for("t_comment");
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].name, "fk_comment_article");
        assert_eq!(fks[0].foreign_table, "t_article");
        assert_eq!(fks[0].columns, vec!["article_id"]);
        assert!(map.foreign_keys_for("t_article").is_empty());
    }

    #[test]
    fn test_validate_ok() {
        let mut map = RelationMap::new();
        map.insert("t_comment", "t_article", "fk", pairs("article_id", "article_id"));
        assert!(map.validate(&catalog()).is_ok());
    }

    #[test]
    fn test_unknown_table_fails() {
        let mut map = RelationMap::new();
        map.insert("t_missing", "t_article", "fk", pairs("article_id", "article_id"));
        let err = map.validate(&catalog()).unwrap_err();
        assert!(matches!(err, DescribeError::UnknownRelationTable { ref table } if table == "t_missing"));
    }

    #[test]
    fn test_unknown_column_and_empty_pairs_fail() {
        let mut map = RelationMap::new();
        map.insert("t_comment", "t_article", "fk", pairs("nope", "article_id"));
        assert!(matches!(
            map.validate(&catalog()),
            Err(DescribeError::UnknownRelationColumn { .. })
        ));

        let mut map = RelationMap::new();
        map.insert("t_comment", "t_article", "fk", ColumnPairs::new());
        assert!(matches!(
            map.validate(&catalog()),
            Err(DescribeError::EmptyRelation { .. })
        ));
    }

    #[test]
    fn test_extend_overrides() {
        let mut base = RelationMap::new();
        base.insert("t_comment", "t_article", "fk", pairs("a", "b"));
        let mut other = RelationMap::new();
        other.insert("t_comment", "t_article", "fk", pairs("article_id", "article_id"));
        base.extend(other);
        assert_eq!(base.foreign_keys_for("t_comment")[0].columns, vec!["article_id"]);
    }
}
