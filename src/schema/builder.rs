//! Schema normalization: raw catalog in, resolved [`Schema`] out.

use super::hooks::Hooks;
use super::relation::RelationMap;
use super::resolve::{compute_ranks, link_foreign_keys};
use super::{
    Column, Event, ForeignKey, Index, Routine, Schema, Table, Trigger, View, NOT_NULL_LABEL,
};
use crate::catalog::{
    Catalog, RawColumn, RawEvent, RawForeignKey, RawIndex, RawRoutine, RawTable, RawTrigger,
    RawView,
};
use crate::comment::SplitComment;
use crate::error::{DescribeError, Result};
use crate::filter::ObjectFilter;
use ahash::AHashSet;
use tracing::{debug, info, warn};

/// Default comment delimiter
pub const DEFAULT_DELIMITER: &str = "\n";

/// Builds a [`Schema`] from one [`Catalog`].
///
/// ```ignore
/// let schema = SchemaBuilder::new()
///     .filter(ObjectFilter::new(&["t_.*"], &[] as &[&str])?)
///     .build(catalog)?;
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
    delimiter: String,
    filter: ObjectFilter,
    relation: RelationMap,
    hooks: Hooks,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            filter: ObjectFilter::keep_all(),
            relation: RelationMap::new(),
            hooks: Hooks::new(),
        }
    }

    /// Comment delimiter; must not be empty
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn filter(mut self, filter: ObjectFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Extra foreign keys not declared in the catalog
    pub fn relation(mut self, relation: RelationMap) -> Self {
        self.relation = relation;
        self
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Normalize, filter, link and rank the catalog
    pub fn build(self, catalog: Catalog) -> Result<Schema> {
        if self.delimiter.is_empty() {
            return Err(DescribeError::EmptyDelimiter);
        }
        self.relation.validate(&catalog)?;

        let Catalog {
            database,
            tables,
            views,
            routines,
            events,
            triggers,
        } = catalog;

        let (mut tables, declared) = self.build_tables(tables);
        let included: AHashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();

        for name in self.relation.tables() {
            if !included.contains(name) {
                warn!(table = name, "ignoring relation map entries for excluded table");
            }
        }

        let mut triggers: Vec<Trigger> = triggers
            .into_iter()
            .filter(|t| included.contains(t.table.as_str()))
            .map(Trigger::from)
            .collect();
        triggers.sort_by(|a, b| a.name.cmp(&b.name));

        for table in &mut tables {
            table.triggers = triggers
                .iter()
                .filter(|t| t.table == table.name)
                .cloned()
                .collect();
        }

        let pruned = link_foreign_keys(&mut tables, declared)?;
        compute_ranks(&mut tables);

        let schema = Schema {
            database,
            tables,
            views: self.build_views(views),
            routines: self.build_routines(routines),
            events: self.build_events(events),
            triggers,
        };

        info!(
            database = %schema.database,
            tables = schema.tables.len(),
            views = schema.views.len(),
            routines = schema.routines.len(),
            events = schema.events.len(),
            foreign_keys = schema.foreign_key_count(),
            pruned,
            "built schema"
        );
        Ok(schema)
    }

    fn skip(&self, kind: &str, name: &str) -> bool {
        let skip = self.filter.should_skip(name);
        if skip {
            debug!(kind, name, "excluded by filter");
        }
        skip
    }

    /// Tables plus their declared foreign keys (catalog + relation map)
    fn build_tables(&self, mut raw_tables: Vec<RawTable>) -> (Vec<Table>, Vec<Vec<ForeignKey>>) {
        raw_tables.sort_by(|a, b| a.name.cmp(&b.name));

        let mut tables = Vec::new();
        let mut declared = Vec::new();

        for raw in raw_tables {
            if self.skip("table", &raw.name) {
                continue;
            }
            let name = raw.name.clone();
            let Some(mut raw) = self.hooks.table(raw) else {
                debug!(table = %name, "excluded by hook");
                continue;
            };

            raw.foreign_keys
                .extend(self.relation.foreign_keys_for(&raw.name));
            let fks = raw
                .foreign_keys
                .iter()
                .map(|fk| foreign_key(&raw.name, fk))
                .collect();

            tables.push(self.normalize_table(raw));
            declared.push(fks);
        }

        (tables, declared)
    }

    fn normalize_table(&self, raw: RawTable) -> Table {
        let comment = SplitComment::new(raw.comment.as_deref(), &self.delimiter);
        let indexes = reindex(raw.indexes);
        let columns = self.normalize_columns(raw.columns, &indexes);

        Table {
            name: raw.name,
            logical_name: comment.logical_name,
            summary: comment.summary,
            collation: raw.collation,
            engine: raw.engine,
            row_format: raw.row_format,
            columns,
            indexes,
            ..Default::default()
        }
    }

    fn normalize_columns(&self, raw: Vec<RawColumn>, indexes: &[Index]) -> Vec<Column> {
        let primary: Vec<&str> = indexes
            .iter()
            .find(|i| i.primary)
            .map(|pk| pk.columns.iter().map(String::as_str).collect())
            .unwrap_or_default();

        raw.into_iter()
            .map(|col| {
                let comment = SplitComment::new(col.comment.as_deref(), &self.delimiter);
                let constraints =
                    constraint_labels(&col, indexes, primary.contains(&col.name.as_str()));
                Column {
                    name: col.name,
                    logical_name: comment.logical_name,
                    summary: comment.summary,
                    col_type: col.col_type,
                    type_declaration: col.type_declaration,
                    not_null: col.not_null,
                    default: col.default,
                    length: col.length,
                    precision: col.precision,
                    scale: col.scale,
                    unsigned: col.unsigned,
                    collation: col.collation,
                    generated: col.generated,
                    constraints,
                }
            })
            .collect()
    }

    fn build_views(&self, mut raw_views: Vec<RawView>) -> Vec<View> {
        raw_views.sort_by(|a, b| a.name.cmp(&b.name));
        raw_views
            .into_iter()
            .filter(|v| !self.skip("view", &v.name))
            .filter_map(|raw| {
                let name = raw.name.clone();
                let raw = self.hooks.view(raw);
                if raw.is_none() {
                    debug!(view = %name, "excluded by hook");
                }
                raw
            })
            .map(|raw| {
                let comment = SplitComment::new(raw.comment.as_deref(), &self.delimiter);
                let indexes = reindex(raw.indexes);
                View {
                    name: raw.name,
                    logical_name: comment.logical_name,
                    summary: comment.summary,
                    sql: raw.sql,
                    check_option: raw.check_option,
                    updatable: raw.updatable,
                    columns: self.normalize_columns(raw.columns, &indexes),
                    indexes,
                }
            })
            .collect()
    }

    fn build_routines(&self, mut raw_routines: Vec<RawRoutine>) -> Vec<Routine> {
        raw_routines.sort_by(|a, b| a.name.cmp(&b.name));
        raw_routines
            .into_iter()
            .filter(|r| !self.skip("routine", &r.name))
            .filter_map(|raw| {
                let name = raw.name.clone();
                let raw = self.hooks.routine(raw);
                if raw.is_none() {
                    debug!(routine = %name, "excluded by hook");
                }
                raw
            })
            .map(|raw| {
                let comment = SplitComment::new(raw.comment.as_deref(), &self.delimiter);
                let parameters = raw
                    .parameters
                    .iter()
                    .map(|p| {
                        format!("{} {} {}", p.mode, p.name, p.type_declaration)
                            .trim()
                            .to_string()
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                Routine {
                    name: raw.name,
                    logical_name: comment.logical_name,
                    summary: comment.summary,
                    kind: raw.kind,
                    parameters,
                    return_type: raw.return_type,
                    statement: raw.statement,
                }
            })
            .collect()
    }

    fn build_events(&self, mut raw_events: Vec<RawEvent>) -> Vec<Event> {
        raw_events.sort_by(|a, b| a.name.cmp(&b.name));
        raw_events
            .into_iter()
            .filter(|e| !self.skip("event", &e.name))
            .filter_map(|raw| {
                let name = raw.name.clone();
                let raw = self.hooks.event(raw);
                if raw.is_none() {
                    debug!(event = %name, "excluded by hook");
                }
                raw
            })
            .map(|raw| {
                let comment = SplitComment::new(raw.comment.as_deref(), &self.delimiter);
                Event {
                    name: raw.name,
                    logical_name: comment.logical_name,
                    summary: comment.summary,
                    statement: raw.statement,
                    interval: raw.interval.as_deref().map(humanize_interval),
                    since: raw.since,
                    until: raw.until,
                }
            })
            .collect()
    }
}

fn foreign_key(table: &str, raw: &RawForeignKey) -> ForeignKey {
    ForeignKey {
        name: raw.name.clone(),
        local_table: table.to_string(),
        local_columns: raw.columns.clone(),
        foreign_table: raw.foreign_table.clone(),
        foreign_columns: raw.foreign_columns.clone(),
        on_update: raw.on_update.clone(),
        on_delete: raw.on_delete.clone(),
    }
}

impl From<RawTrigger> for Trigger {
    fn from(raw: RawTrigger) -> Self {
        Trigger {
            name: raw.name,
            table: raw.table,
            statement: raw.statement,
            event: raw.event,
            timing: raw.timing,
        }
    }
}

/// Drop implicit and duplicate indexes; primary key first, the rest by name
pub fn reindex(raw: Vec<RawIndex>) -> Vec<Index> {
    let mut seen = AHashSet::new();
    let mut indexes: Vec<Index> = raw
        .into_iter()
        .filter(|i| !i.is_implicit())
        .filter(|i| seen.insert(i.name.clone()))
        .map(|i| Index {
            name: i.name,
            columns: i.columns,
            unique: i.unique || i.primary,
            primary: i.primary,
            flags: i.flags,
            options: i.options,
        })
        .collect();
    indexes.sort_by(|a, b| b.primary.cmp(&a.primary).then_with(|| a.name.cmp(&b.name)));
    indexes
}

/// `NotNull` (outside the primary key) plus `<index>-<position>` per unique index
fn constraint_labels(column: &RawColumn, indexes: &[Index], in_primary_key: bool) -> Vec<String> {
    let mut labels = Vec::new();
    if column.not_null && !in_primary_key {
        labels.push(NOT_NULL_LABEL.to_string());
    }
    for index in indexes.iter().filter(|i| i.unique) {
        if let Some(pos) = index.columns.iter().position(|c| *c == column.name) {
            labels.push(format!("{}-{}", index.name, pos + 1));
        }
    }
    labels
}

/// Render an ISO-8601 duration (`P1DT2H30M`) as `1d 2h 30m`.
///
/// Strings that are not ISO-8601 durations are returned unchanged.
pub fn humanize_interval(iso: &str) -> String {
    parse_iso_duration(iso).unwrap_or_else(|| iso.to_string())
}

fn parse_iso_duration(iso: &str) -> Option<String> {
    let rest = iso.trim().strip_prefix('P')?;
    let (date, time) = match rest.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (rest, None),
    };

    let mut parts = Vec::new();
    collect_units(date, &[('Y', "y"), ('M', "mo"), ('W', "w"), ('D', "d")], &mut parts)?;
    if let Some(time) = time {
        if time.is_empty() {
            return None;
        }
        collect_units(time, &[('H', "h"), ('M', "m"), ('S', "s")], &mut parts)?;
    }
    if date.is_empty() && time.is_none() {
        return None;
    }

    if parts.is_empty() {
        return Some("0s".to_string());
    }
    Some(parts.join(" "))
}

/// Append `<n><suffix>` for each non-zero designator; units must appear in order
fn collect_units(section: &str, units: &[(char, &str)], parts: &mut Vec<String>) -> Option<()> {
    let mut number = String::new();
    let mut next_unit = 0;

    for ch in section.chars() {
        if ch.is_ascii_digit() || ch == '.' {
            number.push(ch);
            continue;
        }
        let offset = units[next_unit..].iter().position(|(u, _)| *u == ch)?;
        let (_, suffix) = units[next_unit + offset];
        next_unit += offset + 1;

        if number.is_empty() {
            return None;
        }
        let value: f64 = number.parse().ok()?;
        if value != 0.0 {
            parts.push(format!("{}{}", trim_number(&number), suffix));
        }
        number.clear();
    }

    number.is_empty().then_some(())
}

fn trim_number(number: &str) -> String {
    let trimmed = number.trim_start_matches('0');
    if trimmed.is_empty() || trimmed.starts_with('.') {
        format!("0{trimmed}")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{RawParameter, IMPLICIT_FLAG, PRIMARY_INDEX};
    use crate::schema::{ConstraintKey, HookOutcome};

    fn column(name: &str, not_null: bool, comment: Option<&str>) -> RawColumn {
        RawColumn {
            name: name.to_string(),
            col_type: "integer".to_string(),
            not_null,
            comment: comment.map(str::to_string),
            ..Default::default()
        }
    }

    fn primary(columns: &[&str]) -> RawIndex {
        RawIndex {
            name: PRIMARY_INDEX.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: true,
            primary: true,
            ..Default::default()
        }
    }

    fn blog_catalog() -> Catalog {
        let mut catalog = Catalog::new("blog");

        let mut article = RawTable::new("t_article");
        article.comment = Some("Article\nBlog posts".to_string());
        article.columns = vec![
            column("article_id", true, Some("ArticleID\nSurrogate key")),
            column("title", true, Some("Title")),
            column("body", false, None),
        ];
        article.indexes = vec![primary(&["article_id"])];

        let mut comment = RawTable::new("t_comment");
        comment.columns = vec![
            column("comment_id", true, None),
            column("article_id", true, None),
        ];
        comment.indexes = vec![
            primary(&["comment_id"]),
            RawIndex {
                name: "fk_comment_article".to_string(),
                columns: vec!["article_id".to_string()],
                flags: vec![IMPLICIT_FLAG.to_string()],
                ..Default::default()
            },
        ];
        comment.foreign_keys = vec![RawForeignKey {
            name: "fk_comment_article".to_string(),
            columns: vec!["article_id".to_string()],
            foreign_table: "t_article".to_string(),
            foreign_columns: vec!["article_id".to_string()],
            on_delete: Some("CASCADE".to_string()),
            ..Default::default()
        }];

        // enumeration order must not matter
        catalog.tables = vec![comment, article];
        catalog.triggers.push(RawTrigger {
            name: "trg_comment".to_string(),
            table: "t_comment".to_string(),
            event: "INSERT".to_string(),
            timing: "AFTER".to_string(),
            statement: "BEGIN END".to_string(),
        });
        catalog
    }

    #[test]
    fn test_blog_scenario() {
        let schema = SchemaBuilder::new().build(blog_catalog()).unwrap();
        assert_eq!(schema.tables.len(), 2);
        assert_eq!(schema.tables[0].name, "t_article");

        let article = schema.table("t_article").unwrap();
        assert_eq!(article.reference_keys.len(), 1);
        assert!(article
            .reference_keys
            .contains_key(&ConstraintKey::new("t_comment", "fk_comment_article")));
        assert_eq!(article.logical_name, "Article");
        assert_eq!(article.summary, "Blog posts");

        let comment = schema.table("t_comment").unwrap();
        assert_eq!(comment.foreign_keys.len(), 1);
        assert_eq!(comment.ranks.get("fk_comment_article"), Some(&1));
        assert_eq!(comment.triggers.len(), 1);
        assert_eq!(schema.triggers.len(), 1);
    }

    #[test]
    fn test_exclude_prunes_reference_keys() {
        let filter = ObjectFilter::new(&[] as &[&str], &["t_comment"]).unwrap();
        let schema = SchemaBuilder::new()
            .filter(filter)
            .build(blog_catalog())
            .unwrap();
        assert_eq!(schema.tables.len(), 1);
        assert!(schema.tables[0].reference_keys.is_empty());
        assert!(schema.triggers.is_empty());
    }

    #[test]
    fn test_include_drops_dangling_foreign_key() {
        let filter = ObjectFilter::new(&["comment"], &[] as &[&str]).unwrap();
        let schema = SchemaBuilder::new()
            .filter(filter)
            .build(blog_catalog())
            .unwrap();
        assert_eq!(schema.tables.len(), 1);
        assert!(schema.tables[0].foreign_keys.is_empty());
        assert!(schema.tables[0].ranks.is_empty());
    }

    #[test]
    fn test_column_comments_and_labels() {
        let schema = SchemaBuilder::new().build(blog_catalog()).unwrap();
        let article = schema.table("t_article").unwrap();

        let id = article.column("article_id").unwrap();
        assert_eq!(id.logical_name, "ArticleID");
        assert_eq!(id.summary, "Surrogate key");
        assert_eq!(id.constraints, vec!["PRIMARY-1"]);

        let title = article.column("title").unwrap();
        assert_eq!(title.constraints, vec!["NotNull"]);
        assert!(article.column("body").unwrap().constraints.is_empty());
    }

    #[test]
    fn test_implicit_indexes_removed() {
        let schema = SchemaBuilder::new().build(blog_catalog()).unwrap();
        let comment = schema.table("t_comment").unwrap();
        let names: Vec<_> = comment.indexes.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["PRIMARY"]);
    }

    #[test]
    fn test_reindex_order() {
        let idx = |name: &str, primary: bool| RawIndex {
            name: name.to_string(),
            primary,
            ..Default::default()
        };
        let indexes = reindex(vec![idx("secondary", false), idx("PRIMARY", true), idx("tertiary", false)]);
        let names: Vec<_> = indexes.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["PRIMARY", "secondary", "tertiary"]);
    }

    #[test]
    fn test_composite_unique_labels() {
        let mut catalog = Catalog::new("x");
        let mut t = RawTable::new("t");
        t.columns = vec![column("a", true, None), column("b", true, None)];
        t.indexes = vec![RawIndex {
            name: "uk_ab".to_string(),
            columns: vec!["a".to_string(), "b".to_string()],
            unique: true,
            ..Default::default()
        }];
        catalog.tables.push(t);

        let schema = SchemaBuilder::new().build(catalog).unwrap();
        let t = &schema.tables[0];
        assert_eq!(t.column("a").unwrap().constraints, vec!["NotNull", "uk_ab-1"]);
        assert_eq!(t.column("b").unwrap().constraints, vec!["NotNull", "uk_ab-2"]);
    }

    #[test]
    fn test_empty_delimiter_rejected() {
        let err = SchemaBuilder::new()
            .delimiter("")
            .build(blog_catalog())
            .unwrap_err();
        assert!(matches!(err, DescribeError::EmptyDelimiter));
    }

    #[test]
    fn test_custom_delimiter() {
        let schema = SchemaBuilder::new()
            .delimiter(":")
            .build(blog_catalog())
            .unwrap();
        let article = schema.table("t_article").unwrap();
        assert_eq!(article.logical_name, "Article\nBlog posts");
        assert_eq!(article.summary, "");
    }

    #[test]
    fn test_relation_map_adds_foreign_key() {
        let mut catalog = blog_catalog();
        catalog.table_mut("t_comment").unwrap().foreign_keys.clear();

        let mut relation = RelationMap::new();
        relation.insert(
            "t_comment",
            "t_article",
            "rel_comment_article",
            [("article_id".to_string(), "article_id".to_string())].into(),
        );
        let schema = SchemaBuilder::new().relation(relation).build(catalog).unwrap();
        let comment = schema.table("t_comment").unwrap();
        assert!(comment.foreign_keys.contains_key("rel_comment_article"));
        assert_eq!(comment.rank("rel_comment_article"), 1);
    }

    #[test]
    fn test_relation_map_unknown_table_fails_fast() {
        let mut relation = RelationMap::new();
        relation.insert(
            "t_nope",
            "t_article",
            "rel",
            [("a".to_string(), "b".to_string())].into(),
        );
        let err = SchemaBuilder::new()
            .relation(relation)
            .build(blog_catalog())
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_duplicate_relation_name_rejected() {
        let mut relation = RelationMap::new();
        relation.insert(
            "t_comment",
            "t_article",
            "fk_comment_article",
            [("article_id".to_string(), "article_id".to_string())].into(),
        );
        let err = SchemaBuilder::new()
            .relation(relation)
            .build(blog_catalog())
            .unwrap_err();
        assert!(matches!(err, DescribeError::DuplicateConstraint { .. }));
    }

    #[test]
    fn test_table_hook_skip() {
        let hooks = Hooks::new().on_table(|t| {
            if t.name == "t_comment" {
                HookOutcome::Skip
            } else {
                HookOutcome::Keep
            }
        });
        let schema = SchemaBuilder::new().hooks(hooks).build(blog_catalog()).unwrap();
        assert_eq!(schema.tables.len(), 1);
        assert!(schema.tables[0].reference_keys.is_empty());
    }

    #[test]
    fn test_table_hook_modify() {
        let hooks = Hooks::new().on_table(|t| {
            let mut t = t.clone();
            t.comment = Some("Renamed\nby hook".to_string());
            HookOutcome::KeepModified(t)
        });
        let schema = SchemaBuilder::new().hooks(hooks).build(blog_catalog()).unwrap();
        assert_eq!(schema.tables[1].logical_name, "Renamed");
    }

    #[test]
    fn test_routines_and_events() {
        let mut catalog = blog_catalog();
        catalog.routines.push(RawRoutine {
            name: "procedure1".to_string(),
            kind: "PROCEDURE".to_string(),
            parameters: vec![
                RawParameter {
                    mode: "IN".to_string(),
                    name: "x".to_string(),
                    type_declaration: "int".to_string(),
                },
                RawParameter {
                    mode: String::new(),
                    name: "y".to_string(),
                    type_declaration: "varchar(10)".to_string(),
                },
            ],
            comment: Some("Proc\nDoes things".to_string()),
            ..Default::default()
        });
        catalog.events.push(RawEvent {
            name: "event1".to_string(),
            interval: Some("P1DT12H".to_string()),
            ..Default::default()
        });
        let hooks = Hooks::new().on_routine(|_| HookOutcome::Keep);

        let schema = SchemaBuilder::new().hooks(hooks).build(catalog).unwrap();
        let routine = schema.routine("procedure1").unwrap();
        assert_eq!(routine.parameters, "IN x int, y varchar(10)");
        assert_eq!(routine.logical_name, "Proc");
        assert_eq!(schema.event("event1").unwrap().interval.as_deref(), Some("1d 12h"));
    }

    #[test]
    fn test_views_normalized() {
        let mut catalog = blog_catalog();
        catalog.views.push(RawView {
            name: "v_blog".to_string(),
            sql: "SELECT 1".to_string(),
            comment: Some("Blog view".to_string()),
            updatable: true,
            columns: vec![column("title", true, Some("Title\nheadline"))],
            ..Default::default()
        });
        let schema = SchemaBuilder::new().build(catalog).unwrap();
        let view = schema.view("v_blog").unwrap();
        assert_eq!(view.logical_name, "Blog view");
        assert_eq!(view.columns[0].summary, "headline");
        assert!(view.updatable);
    }

    #[test]
    fn test_humanize_interval() {
        assert_eq!(humanize_interval("P1DT2H30M"), "1d 2h 30m");
        assert_eq!(humanize_interval("P1Y2M"), "1y 2mo");
        assert_eq!(humanize_interval("PT45S"), "45s");
        assert_eq!(humanize_interval("P0DT0H"), "0s");
        assert_eq!(humanize_interval("PT1.5H"), "1.5h");
        assert_eq!(humanize_interval("every day"), "every day");
        assert_eq!(humanize_interval("P"), "P");
        assert_eq!(humanize_interval("PT"), "PT");
    }
}
