//! Foreign key linking and rank computation.
//!
//! Linking registers each declared foreign key on its declaring table and,
//! as a reference key, on its target table. Foreign keys whose target did not
//! survive filtering are dropped here and nowhere else.
//!
//! The rank of a foreign key is one more than the smallest rank found on the
//! table it references. Recursion follows an immutable path of visited
//! tables; a foreign key back into the path gets no rank entry.

use super::{ForeignKey, Table};
use crate::error::{DescribeError, Result};
use ahash::{AHashMap, AHashSet};
use std::collections::BTreeMap;
use tracing::debug;

/// Register `declared` foreign keys (one list per table, same order as `tables`).
///
/// Returns the number of foreign keys pruned because their target is absent.
pub fn link_foreign_keys(tables: &mut [Table], declared: Vec<Vec<ForeignKey>>) -> Result<usize> {
    let positions: AHashMap<String, usize> = tables
        .iter()
        .enumerate()
        .map(|(i, t)| (t.name.clone(), i))
        .collect();
    let mut pruned = 0;

    for (local, fks) in declared.into_iter().enumerate() {
        let mut seen = AHashSet::new();
        for fk in fks {
            if !seen.insert(fk.name.clone()) {
                return Err(DescribeError::DuplicateConstraint {
                    table: fk.local_table,
                    name: fk.name,
                });
            }

            let Some(&foreign) = positions.get(&fk.foreign_table) else {
                debug!(
                    table = %fk.local_table,
                    constraint = %fk.name,
                    foreign_table = %fk.foreign_table,
                    "dropping foreign key to excluded table"
                );
                pruned += 1;
                continue;
            };

            tables[foreign]
                .reference_keys
                .insert(fk.key(), fk.clone());
            tables[local].foreign_keys.insert(fk.name.clone(), fk);
        }
    }

    Ok(pruned)
}

/// Immutable linked list of tables on the current resolution path
struct Path<'a> {
    table: &'a str,
    parent: Option<&'a Path<'a>>,
}

impl Path<'_> {
    fn contains(&self, table: &str) -> bool {
        let mut node = Some(self);
        while let Some(current) = node {
            if current.table == table {
                return true;
            }
            node = current.parent;
        }
        false
    }
}

/// Compute `ranks` of every table over the linked foreign keys
pub fn compute_ranks(tables: &mut [Table]) {
    let ranks: Vec<BTreeMap<String, u32>> = {
        let graph: AHashMap<&str, &Table> = tables.iter().map(|t| (t.name.as_str(), t)).collect();
        tables
            .iter()
            .map(|t| {
                let root = Path {
                    table: &t.name,
                    parent: None,
                };
                ranks_of(&graph, t, &root)
            })
            .collect()
    };

    for (table, ranks) in tables.iter_mut().zip(ranks) {
        if !ranks.is_empty() {
            debug!(table = %table.name, ?ranks, "computed ranks");
        }
        table.ranks = ranks;
    }
}

fn ranks_of(graph: &AHashMap<&str, &Table>, table: &Table, path: &Path<'_>) -> BTreeMap<String, u32> {
    let mut ranks = BTreeMap::new();

    for (name, fk) in &table.foreign_keys {
        if path.contains(&fk.foreign_table) {
            continue;
        }
        let Some(foreign) = graph.get(fk.foreign_table.as_str()) else {
            continue;
        };
        let child = Path {
            table: &fk.foreign_table,
            parent: Some(path),
        };
        let floor = ranks_of(graph, foreign, &child)
            .values()
            .min()
            .copied()
            .unwrap_or(0);
        ranks.insert(name.clone(), floor + 1);
    }

    ranks
}
