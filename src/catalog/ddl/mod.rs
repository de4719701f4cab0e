//! Catalog extraction from SQL DDL dump files.
//!
//! Dumps are streamed statement by statement (optionally compressed) and
//! folded into a [`Catalog`] by [`CatalogBuilder`]. Data statements are
//! skipped without parsing.

mod parse;
mod reader;

pub(crate) use parse::{parse_create_index, parse_create_view};
pub use reader::{open_dump, Compression, StatementReader};

use super::{
    database_name_from_path, Catalog, Introspector, RawIndex, RawTable, RawView, IMPLICIT_FLAG,
};
use crate::error::Result;
use ahash::AHashMap;
use once_cell::sync::Lazy;
use parse::CommentTarget;
use regex::Regex;
use std::path::PathBuf;
use tracing::{debug, trace};

/// MySQL versioned comments (`/*!50003 CREATE*/`) keep their content
static CONDITIONAL_COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*!\d*\s?(.*?)\*/").unwrap());

/// Plain block comments are dropped
static BLOCK_COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

/// Statement kinds the catalog builder understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    CreateTable,
    AlterTable,
    CreateIndex,
    CreateView,
    CreateTrigger,
    CreateRoutine,
    CreateEvent,
    CommentOn,
    Other,
}

impl StatementKind {
    /// Classify a statement by its leading keywords
    pub fn classify(stmt: &str) -> Self {
        let words: Vec<String> = stmt
            .split_whitespace()
            .take(8)
            .map(|w| w.to_ascii_uppercase())
            .collect();
        let first = words.first().map(String::as_str).unwrap_or("");

        match first {
            "ALTER" if words.get(1).map(String::as_str) == Some("TABLE") => {
                StatementKind::AlterTable
            }
            "COMMENT" if words.get(1).map(String::as_str) == Some("ON") => {
                StatementKind::CommentOn
            }
            "CREATE" => {
                for word in &words[1..] {
                    let word = word.split('(').next().unwrap_or(word);
                    match word {
                        "TABLE" => return StatementKind::CreateTable,
                        "INDEX" => return StatementKind::CreateIndex,
                        "VIEW" => return StatementKind::CreateView,
                        "TRIGGER" => return StatementKind::CreateTrigger,
                        "PROCEDURE" | "FUNCTION" => return StatementKind::CreateRoutine,
                        "EVENT" => return StatementKind::CreateEvent,
                        _ => {}
                    }
                }
                StatementKind::Other
            }
            _ => StatementKind::Other,
        }
    }
}

/// Incrementally builds a [`Catalog`] from DDL statements
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    catalog: Catalog,
    table_index: AHashMap<String, usize>,
}

impl CatalogBuilder {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            catalog: Catalog::new(database),
            table_index: AHashMap::new(),
        }
    }

    /// Feed one statement; returns the kind it was handled as
    pub fn add_statement(&mut self, stmt: &str) -> StatementKind {
        let stmt = normalize_statement(stmt);
        let kind = StatementKind::classify(&stmt);

        let handled = match kind {
            StatementKind::CreateTable => self.add_create_table(&stmt),
            StatementKind::AlterTable => self.add_alter_table(&stmt),
            StatementKind::CreateIndex => self.add_create_index(&stmt),
            StatementKind::CreateView => self.add_create_view(&stmt),
            StatementKind::CreateTrigger => parse::parse_create_trigger(&stmt)
                .map(|t| self.catalog.triggers.push(t))
                .is_some(),
            StatementKind::CreateRoutine => parse::parse_create_routine(&stmt)
                .map(|r| self.catalog.routines.push(r))
                .is_some(),
            StatementKind::CreateEvent => parse::parse_create_event(&stmt)
                .map(|e| self.catalog.events.push(e))
                .is_some(),
            StatementKind::CommentOn => self.add_comment_on(&stmt),
            StatementKind::Other => true,
        };

        if !handled {
            trace!(?kind, "unparsed DDL statement");
        }
        kind
    }

    fn add_create_table(&mut self, stmt: &str) -> bool {
        let Some(table) = parse::parse_create_table(stmt) else {
            return false;
        };
        match self.table_index.get(&table.name) {
            Some(&idx) => self.catalog.tables[idx] = table,
            None => {
                self.table_index
                    .insert(table.name.clone(), self.catalog.tables.len());
                self.catalog.tables.push(table);
            }
        }
        true
    }

    fn add_alter_table(&mut self, stmt: &str) -> bool {
        let Some(name) = parse::extract_alter_table_name(stmt) else {
            return false;
        };
        match self.table_mut(&name) {
            Some(table) => {
                parse::apply_alter_table(table, stmt);
                true
            }
            None => false,
        }
    }

    fn add_create_index(&mut self, stmt: &str) -> bool {
        let Some((name, index)) = parse::parse_create_index(stmt) else {
            return false;
        };
        match self.table_mut(&name) {
            Some(table) => {
                table.indexes.retain(|i| i.name != index.name);
                table.indexes.push(index);
                true
            }
            None => false,
        }
    }

    fn add_create_view(&mut self, stmt: &str) -> bool {
        let Some(view) = parse::parse_create_view(stmt) else {
            return false;
        };
        self.catalog.views.retain(|v| v.name != view.name);
        self.catalog.views.push(view);
        true
    }

    fn add_comment_on(&mut self, stmt: &str) -> bool {
        let Some((target, comment)) = parse::parse_comment_on(stmt) else {
            return false;
        };
        match target {
            CommentTarget::Table(name) => {
                if let Some(table) = self.table_mut(&name) {
                    table.comment = comment;
                } else if let Some(view) = self.catalog.views.iter_mut().find(|v| v.name == name)
                {
                    view.comment = comment;
                } else {
                    return false;
                }
            }
            CommentTarget::Column(table, column) => {
                let Some(column) = self
                    .table_mut(&table)
                    .and_then(|t| t.column_mut(&column))
                else {
                    return false;
                };
                column.comment = comment;
            }
        }
        true
    }

    fn table_mut(&mut self, name: &str) -> Option<&mut RawTable> {
        let idx = *self.table_index.get(name)?;
        self.catalog.tables.get_mut(idx)
    }

    /// Finish the catalog: synthesize implicit FK indexes and resolve view columns
    pub fn build(mut self) -> Catalog {
        for table in &mut self.catalog.tables {
            add_implicit_fk_indexes(table);
        }
        let tables = &self.catalog.tables;
        for view in &mut self.catalog.views {
            resolve_view_columns(view, tables);
        }
        self.catalog
    }
}

/// Strip block comments, unwrapping MySQL versioned comments
fn normalize_statement(stmt: &str) -> String {
    if !stmt.contains("/*") {
        return stmt.trim().to_string();
    }
    let unwrapped = CONDITIONAL_COMMENT_RE.replace_all(stmt, "$1");
    BLOCK_COMMENT_RE
        .replace_all(&unwrapped, " ")
        .trim()
        .to_string()
}

/// Engines index referencing columns on their own; mirror that for FKs
/// whose columns no existing index leads with
fn add_implicit_fk_indexes(table: &mut RawTable) {
    let mut implicit = Vec::new();
    for fk in &table.foreign_keys {
        let covered = table
            .indexes
            .iter()
            .chain(implicit.iter())
            .any(|i: &RawIndex| i.columns.starts_with(&fk.columns));
        if !covered {
            implicit.push(RawIndex {
                name: fk.name.clone(),
                columns: fk.columns.clone(),
                flags: vec![IMPLICIT_FLAG.to_string()],
                ..Default::default()
            });
        }
    }
    table.indexes.extend(implicit);
}

/// Derive view columns from the select list, copying metadata of direct column reads
fn resolve_view_columns(view: &mut RawView, tables: &[RawTable]) {
    let items = parse::parse_select_list(&view.sql);
    if view.columns.is_empty() {
        view.columns = items
            .iter()
            .map(|item| super::RawColumn {
                name: item.alias.clone(),
                ..Default::default()
            })
            .collect();
    }

    for (column, item) in view.columns.iter_mut().zip(&items) {
        let Some((table_name, source_column)) = &item.source else {
            continue;
        };
        let source = tables
            .iter()
            .filter(|t| table_name.as_ref().map_or(true, |n| &t.name == n))
            .find_map(|t| t.column(source_column));
        if let Some(source) = source {
            let name = std::mem::take(&mut column.name);
            *column = source.clone();
            column.name = name;
        }
    }
}

/// Reads a DDL dump (plain or compressed) into a [`Catalog`]
#[derive(Debug, Clone)]
pub struct DdlIntrospector {
    path: PathBuf,
}

impl DdlIntrospector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse DDL text held in memory
    pub fn parse_str(database: &str, sql: &str) -> Result<Catalog> {
        let mut reader = StatementReader::new(sql.as_bytes());
        let mut builder = CatalogBuilder::new(database);
        while let Some(stmt) = reader.read_statement()? {
            builder.add_statement(&stmt);
        }
        Ok(builder.build())
    }
}

impl Introspector for DdlIntrospector {
    fn introspect(&self) -> Result<Catalog> {
        let mut reader = open_dump(&self.path)?;
        let mut builder = CatalogBuilder::new(database_name_from_path(&self.path));
        let mut statements = 0usize;

        while let Some(stmt) = reader.read_statement()? {
            builder.add_statement(&stmt);
            statements += 1;
        }

        let catalog = builder.build();
        debug!(
            path = %self.path.display(),
            compression = %Compression::from_path(&self.path),
            statements,
            tables = catalog.tables.len(),
            views = catalog.views.len(),
            routines = catalog.routines.len(),
            "parsed DDL dump"
        );
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const DUMP: &str = r#"
-- MySQL dump
/*!40101 SET NAMES utf8mb4 */;
CREATE TABLE `t_article` (
  `article_id` int NOT NULL COMMENT 'Article ID',
  `title` varchar(64) NOT NULL COMMENT 'Title',
  PRIMARY KEY (`article_id`)
) ENGINE=InnoDB COMMENT='Article';
CREATE TABLE `t_comment` (
  `comment_id` int NOT NULL,
  `article_id` int NOT NULL,
  PRIMARY KEY (`comment_id`),
  CONSTRAINT `fk_comment_article` FOREIGN KEY (`article_id`) REFERENCES `t_article` (`article_id`)
) ENGINE=InnoDB;
INSERT INTO `t_article` VALUES (1,'a;b');
/*!50001 CREATE ALGORITHM=UNDEFINED */
/*!50001 VIEW `v_article` AS select `t_article`.`title` AS `headline` from `t_article` */;
DELIMITER ;;
/*!50003 CREATE*/ /*!50017 DEFINER=`root`@`%`*/ /*!50003 TRIGGER `trg_comment` AFTER INSERT ON `t_comment` FOR EACH ROW BEGIN
  UPDATE t_article SET title = title WHERE article_id = NEW.article_id;
END */;;
DELIMITER ;
"#;

    #[test]
    fn test_classify() {
        assert_eq!(
            StatementKind::classify("CREATE TABLE a (id INT)"),
            StatementKind::CreateTable
        );
        assert_eq!(
            StatementKind::classify("create unique index i on a (x)"),
            StatementKind::CreateIndex
        );
        assert_eq!(
            StatementKind::classify("CREATE OR REPLACE VIEW v AS SELECT 1"),
            StatementKind::CreateView
        );
        assert_eq!(
            StatementKind::classify("CREATE FUNCTION f() RETURNS int RETURN 1"),
            StatementKind::CreateRoutine
        );
        assert_eq!(
            StatementKind::classify("INSERT INTO a VALUES (1)"),
            StatementKind::Other
        );
    }

    #[test]
    fn test_parse_dump() {
        let catalog = DdlIntrospector::parse_str("blog", DUMP).unwrap();
        assert_eq!(catalog.database, "blog");
        assert_eq!(catalog.tables.len(), 2);
        assert_eq!(
            catalog.table("t_article").unwrap().comment.as_deref(),
            Some("Article")
        );

        let fk = &catalog.table("t_comment").unwrap().foreign_keys[0];
        assert_eq!(fk.name, "fk_comment_article");

        assert_eq!(catalog.views.len(), 1);
        let headline = &catalog.views[0].columns[0];
        assert_eq!(headline.name, "headline");
        assert_eq!(headline.col_type, "varchar");
        assert_eq!(headline.comment.as_deref(), Some("Title"));

        assert_eq!(catalog.triggers.len(), 1);
        assert_eq!(catalog.triggers[0].table, "t_comment");
    }

    #[test]
    fn test_implicit_fk_index() {
        let catalog = DdlIntrospector::parse_str("blog", DUMP).unwrap();
        let comment = catalog.table("t_comment").unwrap();
        let implicit: Vec<_> = comment.indexes.iter().filter(|i| i.is_implicit()).collect();
        assert_eq!(implicit.len(), 1);
        assert_eq!(implicit[0].name, "fk_comment_article");
        assert_eq!(implicit[0].columns, vec!["article_id"]);

        // already covered by the primary key
        let sql = "CREATE TABLE a (id INT PRIMARY KEY, FOREIGN KEY (id) REFERENCES b (id));";
        let catalog = DdlIntrospector::parse_str("x", sql).unwrap();
        assert!(catalog.tables[0].indexes.iter().all(|i| !i.is_implicit()));
    }

    #[test]
    fn test_alter_and_comment_on() {
        let sql = "CREATE TABLE users (id INTEGER NOT NULL, email TEXT);
CREATE TABLE posts (id INTEGER NOT NULL, user_id INTEGER);
ALTER TABLE ONLY public.posts ADD CONSTRAINT posts_user_fk FOREIGN KEY (user_id) REFERENCES public.users(id);
CREATE INDEX idx_email ON users (email);
COMMENT ON TABLE users IS 'Users\nAccounts';
COMMENT ON COLUMN users.email IS 'Email';";
        let catalog = DdlIntrospector::parse_str("app", sql).unwrap();
        let users = catalog.table("users").unwrap();
        assert_eq!(users.comment.as_deref(), Some("Users\nAccounts"));
        assert_eq!(users.column("email").unwrap().comment.as_deref(), Some("Email"));
        assert_eq!(users.indexes[0].name, "idx_email");
        let posts = catalog.table("posts").unwrap();
        assert_eq!(posts.foreign_keys[0].foreign_table, "users");
    }

    #[test]
    fn test_plpgsql_function_kept_whole() {
        let sql = "CREATE FUNCTION public.touch() RETURNS trigger
    LANGUAGE plpgsql
    AS $$
BEGIN
  NEW.updated := now();
  RETURN NEW;
END;
$$;
CREATE TABLE t_article (id INTEGER NOT NULL, updated TIMESTAMP);
CREATE TRIGGER trg_touch BEFORE UPDATE ON public.t_article FOR EACH ROW EXECUTE FUNCTION public.touch();";
        let catalog = DdlIntrospector::parse_str("app", sql).unwrap();
        assert_eq!(catalog.routines.len(), 1);
        let statement = &catalog.routines[0].statement;
        assert!(statement.starts_with("BEGIN"));
        assert!(statement.contains("RETURN NEW"));
        assert!(statement.ends_with("END;"));
        assert_eq!(catalog.tables.len(), 1);
        assert_eq!(catalog.triggers.len(), 1);
        assert_eq!(catalog.triggers[0].table, "t_article");
    }

    #[test]
    fn test_introspect_gzip_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blog.sql.gz");
        let file = std::fs::File::create(&path).unwrap();
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder.write_all(DUMP.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let catalog = DdlIntrospector::new(&path).introspect().unwrap();
        assert_eq!(catalog.database, "blog");
        assert_eq!(catalog.tables.len(), 2);
    }
}
