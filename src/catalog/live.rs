//! Live introspection of DuckDB database files.
//!
//! Metadata comes from DuckDB's catalog table functions (`duckdb_tables()`,
//! `duckdb_columns()`, `duckdb_constraints()`, `duckdb_indexes()`,
//! `duckdb_views()`, `duckdb_functions()`), restricted to the current
//! database and schema. Macros are reported as routines. DuckDB has no
//! events or triggers.

use super::dsn::LOOPBACK_HOST;
use super::ddl::{parse_create_index, parse_create_view};
use super::{
    database_name_from_path, Catalog, ConnectionParams, Introspector, RawColumn, RawForeignKey,
    RawIndex, RawParameter, RawRoutine, RawTable, RawView, PRIMARY_INDEX,
};
use crate::error::Result;
use ahash::AHashMap;
use duckdb::{Connection, Statement};
use std::path::PathBuf;
use tracing::debug;

/// Separator used to flatten DuckDB list columns into strings
const LIST_SEPARATOR: char = '\u{1f}';

const CURRENT_SCOPE: &str =
    "database_name = current_database() AND schema_name = current_schema()";

/// Introspects a DuckDB database addressed by a `duckdb://` DSN.
///
/// `duckdb:///abs/path/blog.duckdb` opens an absolute path,
/// `duckdb://data/blog.duckdb` the relative path `data/blog.duckdb`, and
/// `duckdb://` an empty in-memory database.
#[derive(Debug, Clone)]
pub struct DuckDbIntrospector {
    params: ConnectionParams,
}

impl DuckDbIntrospector {
    pub fn new(params: ConnectionParams) -> Self {
        Self { params }
    }

    /// Database file the DSN points at; `None` for an in-memory database
    pub fn database_file(&self) -> Option<PathBuf> {
        let mut location = self.params.location.as_str();
        for host in [LOOPBACK_HOST, "localhost"] {
            if let Some(path) = location.strip_prefix(host).filter(|p| p.starts_with('/')) {
                location = path;
                break;
            }
        }
        match location {
            "" | "/" | ":memory:" | "/:memory:" => None,
            path => Some(PathBuf::from(path)),
        }
    }
}

impl Introspector for DuckDbIntrospector {
    fn introspect(&self) -> Result<Catalog> {
        let file = self.database_file();
        let (conn, database) = match &file {
            Some(path) => (Connection::open(path)?, database_name_from_path(path)),
            None => (Connection::open_in_memory()?, "memory".to_string()),
        };
        let location = file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string());
        debug!(%location, "introspecting DuckDB database");
        introspect_connection(&conn, &database)
    }
}

/// Read the catalog of the current database and schema of `conn`
pub fn introspect_connection(conn: &Connection, database: &str) -> Result<Catalog> {
    let mut catalog = Catalog::new(database);

    let mut columns = read_columns(conn)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT table_name, comment FROM duckdb_tables() WHERE {CURRENT_SCOPE} ORDER BY table_name"
    ))?;
    for (name, comment) in query_pairs(&mut stmt)? {
        catalog.tables.push(RawTable {
            columns: columns.remove(&name).unwrap_or_default(),
            name,
            comment,
            ..Default::default()
        });
    }

    apply_constraints(conn, &mut catalog)?;
    apply_indexes(conn, &mut catalog)?;
    read_views(conn, &mut catalog, &mut columns)?;
    read_macros(conn, &mut catalog)?;

    debug!(
        database,
        tables = catalog.tables.len(),
        views = catalog.views.len(),
        routines = catalog.routines.len(),
        "read DuckDB catalog"
    );
    Ok(catalog)
}

fn query_pairs(stmt: &mut Statement<'_>) -> Result<Vec<(String, Option<String>)>> {
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Columns of every table and view, keyed by relation name, in ordinal order
fn read_columns(conn: &Connection) -> Result<AHashMap<String, Vec<RawColumn>>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT table_name, column_name, data_type, is_nullable, column_default,
                CAST(character_maximum_length AS BIGINT),
                CAST(numeric_precision AS BIGINT),
                CAST(numeric_scale AS BIGINT),
                comment
         FROM duckdb_columns()
         WHERE {CURRENT_SCOPE}
         ORDER BY table_name, column_index"
    ))?;

    let rows = stmt.query_map([], |row| {
        let table: String = row.get(0)?;
        let data_type: String = row.get(2)?;
        let nullable: bool = row.get(3)?;
        let length: Option<i64> = row.get(5)?;
        let precision: Option<i64> = row.get(6)?;
        let scale: Option<i64> = row.get(7)?;
        let is_decimal = data_type.to_uppercase().starts_with("DECIMAL");

        let column = RawColumn {
            name: row.get(1)?,
            col_type: data_type
                .split('(')
                .next()
                .unwrap_or(&data_type)
                .trim()
                .to_lowercase(),
            not_null: !nullable,
            default: row.get(4)?,
            length: length.and_then(|n| u32::try_from(n).ok()),
            precision: precision
                .filter(|_| is_decimal)
                .and_then(|n| u32::try_from(n).ok()),
            scale: scale
                .filter(|_| is_decimal)
                .and_then(|n| u32::try_from(n).ok()),
            comment: row.get(8)?,
            type_declaration: Some(data_type),
            ..Default::default()
        };
        Ok((table, column))
    })?;

    let mut columns: AHashMap<String, Vec<RawColumn>> = AHashMap::new();
    for row in rows {
        let (table, column) = row?;
        columns.entry(table).or_default().push(column);
    }
    Ok(columns)
}

/// Primary keys, unique constraints and foreign keys
fn apply_constraints(conn: &Connection, catalog: &mut Catalog) -> Result<()> {
    let mut stmt = conn.prepare(&format!(
        "SELECT table_name, constraint_type, constraint_name,
                array_to_string(constraint_column_names, chr(31)),
                referenced_table,
                array_to_string(referenced_column_names, chr(31))
         FROM duckdb_constraints()
         WHERE {CURRENT_SCOPE}
           AND constraint_type IN ('PRIMARY KEY', 'UNIQUE', 'FOREIGN KEY')
         ORDER BY table_name, constraint_index"
    ))?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, Option<String>>(5)?,
        ))
    })?;

    for row in rows {
        let (table_name, kind, name, columns, referenced_table, referenced_columns) = row?;
        let Some(table) = catalog.table_mut(&table_name) else {
            continue;
        };
        let columns = split_list(columns.as_deref());
        if columns.is_empty() {
            continue;
        }

        match kind.as_str() {
            "PRIMARY KEY" => {
                if table.indexes.iter().any(|i| i.primary) {
                    continue;
                }
                table.indexes.insert(
                    0,
                    RawIndex {
                        name: PRIMARY_INDEX.to_string(),
                        columns,
                        unique: true,
                        primary: true,
                        ..Default::default()
                    },
                );
            }
            "UNIQUE" => {
                let name = name.unwrap_or_else(|| format!("{}_{}_key", table_name, columns.join("_")));
                if table.indexes.iter().any(|i| i.name == name) {
                    continue;
                }
                table.indexes.push(RawIndex {
                    name,
                    columns,
                    unique: true,
                    ..Default::default()
                });
            }
            _ => {
                let Some(foreign_table) = referenced_table else {
                    continue;
                };
                let foreign_columns = split_list(referenced_columns.as_deref());
                if foreign_columns.is_empty()
                    || !columns.iter().all(|c| table.column(c).is_some())
                    || table.foreign_keys.iter().any(|fk| {
                        fk.columns == columns
                            && fk.foreign_table == foreign_table
                            && fk.foreign_columns == foreign_columns
                    })
                {
                    continue;
                }
                let name = name.unwrap_or_else(|| format!("{}_{}_fkey", table_name, columns.join("_")));
                let name = unique_constraint_name(&table.foreign_keys, name, &foreign_table);
                table.foreign_keys.push(RawForeignKey {
                    name,
                    columns,
                    foreign_table,
                    foreign_columns,
                    ..Default::default()
                });
            }
        }
    }

    Ok(())
}

/// DuckDB derives FK names from the local and referenced columns only, so two
/// keys on one column can share a name; later ones get the referenced table
/// (and a counter if needed) appended
fn unique_constraint_name(existing: &[RawForeignKey], name: String, foreign_table: &str) -> String {
    let taken = |candidate: &str| existing.iter().any(|fk| fk.name == candidate);
    if !taken(&name) {
        return name;
    }
    let base = format!("{name}_{foreign_table}");
    let mut candidate = base.clone();
    let mut n = 2;
    while taken(&candidate) {
        candidate = format!("{base}_{n}");
        n += 1;
    }
    candidate
}

/// Explicit indexes, recovered from their CREATE INDEX text
fn apply_indexes(conn: &Connection, catalog: &mut Catalog) -> Result<()> {
    let mut stmt = conn.prepare(&format!(
        "SELECT table_name, sql FROM duckdb_indexes() WHERE {CURRENT_SCOPE} ORDER BY table_name, index_name"
    ))?;
    for (table_name, sql) in query_pairs(&mut stmt)? {
        let Some((_, index)) = sql.as_deref().and_then(|s| parse_create_index(s.trim_end_matches(';')))
        else {
            continue;
        };
        if let Some(table) = catalog.table_mut(&table_name) {
            table.indexes.push(index);
        }
    }
    Ok(())
}

fn read_views(
    conn: &Connection,
    catalog: &mut Catalog,
    columns: &mut AHashMap<String, Vec<RawColumn>>,
) -> Result<()> {
    let mut stmt = conn.prepare(&format!(
        "SELECT view_name, sql, comment FROM duckdb_views()
         WHERE {CURRENT_SCOPE} AND NOT internal
         ORDER BY view_name"
    ))?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, Option<String>>(2)?,
        ))
    })?;

    for row in rows {
        let (name, sql, comment) = row?;
        let sql = sql.unwrap_or_default();
        let parsed = parse_create_view(sql.trim().trim_end_matches(';'));
        let (sql, check_option, updatable) = match parsed {
            Some(view) => (view.sql, view.check_option, view.updatable),
            None => (sql, None, false),
        };
        catalog.views.push(RawView {
            columns: columns.remove(&name).unwrap_or_default(),
            name,
            sql,
            comment,
            check_option,
            updatable,
            ..Default::default()
        });
    }
    Ok(())
}

/// Scalar and table macros
fn read_macros(conn: &Connection, catalog: &mut Catalog) -> Result<()> {
    let mut stmt = conn.prepare(&format!(
        "SELECT function_name, array_to_string(parameters, chr(31)), macro_definition, comment
         FROM duckdb_functions()
         WHERE {CURRENT_SCOPE} AND NOT internal
           AND function_type IN ('macro', 'table_macro')
         ORDER BY function_name"
    ))?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
        ))
    })?;

    for row in rows {
        let (name, parameters, definition, comment) = row?;
        if catalog.routines.iter().any(|r| r.name == name) {
            continue;
        }
        catalog.routines.push(RawRoutine {
            name,
            kind: "FUNCTION".to_string(),
            parameters: split_list(parameters.as_deref())
                .into_iter()
                .map(|name| RawParameter {
                    name,
                    ..Default::default()
                })
                .collect(),
            return_type: None,
            statement: definition.unwrap_or_default(),
            comment,
        });
    }
    Ok(())
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(LIST_SEPARATOR)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::dsn::Environment;
    use tempfile::TempDir;

    const SCHEMA: &str = "
CREATE TABLE t_article (
    article_id INTEGER PRIMARY KEY,
    title VARCHAR NOT NULL,
    price DECIMAL(10,2)
);
CREATE TABLE t_comment (
    comment_id INTEGER PRIMARY KEY,
    article_id INTEGER NOT NULL REFERENCES t_article (article_id),
    body VARCHAR
);
CREATE INDEX idx_title ON t_article (title);
CREATE VIEW v_titles AS SELECT article_id, title FROM t_article;
CREATE MACRO add_price(a, b) AS a + b;
COMMENT ON TABLE t_article IS 'Article
Blog posts';
";

    fn memory_catalog() -> Catalog {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        introspect_connection(&conn, "blog").unwrap()
    }

    #[test]
    fn test_tables_and_columns() {
        let catalog = memory_catalog();
        assert_eq!(catalog.tables.len(), 2);
        let article = catalog.table("t_article").unwrap();
        assert_eq!(article.comment.as_deref(), Some("Article\nBlog posts"));

        let names: Vec<_> = article.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["article_id", "title", "price"]);
        assert!(article.column("title").unwrap().not_null);
        let price = article.column("price").unwrap();
        assert_eq!(price.col_type, "decimal");
        assert_eq!(price.precision, Some(10));
        assert_eq!(price.scale, Some(2));
    }

    #[test]
    fn test_constraints_and_indexes() {
        let catalog = memory_catalog();
        let article = catalog.table("t_article").unwrap();
        assert!(article.indexes[0].primary);
        assert_eq!(article.indexes[0].columns, vec!["article_id"]);
        assert!(article.indexes.iter().any(|i| i.name == "idx_title"));

        let comment = catalog.table("t_comment").unwrap();
        assert_eq!(comment.foreign_keys.len(), 1);
        assert_eq!(comment.foreign_keys[0].foreign_table, "t_article");
        assert_eq!(comment.foreign_keys[0].columns, vec!["article_id"]);
        assert!(article.foreign_keys.is_empty());
    }

    #[test]
    fn test_foreign_keys_sharing_a_catalog_name() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE a (id INTEGER PRIMARY KEY);
CREATE TABLE b (id INTEGER PRIMARY KEY);
CREATE TABLE c (x INTEGER, FOREIGN KEY (x) REFERENCES a(id), FOREIGN KEY (x) REFERENCES b(id));",
        )
        .unwrap();
        let catalog = introspect_connection(&conn, "memory").unwrap();
        let c = catalog.table("c").unwrap();
        assert_eq!(c.foreign_keys.len(), 2);

        let targets: Vec<_> = c.foreign_keys.iter().map(|fk| fk.foreign_table.as_str()).collect();
        assert_eq!(targets, vec!["a", "b"]);
        assert_ne!(c.foreign_keys[0].name, c.foreign_keys[1].name);
    }

    #[test]
    fn test_unique_constraint_name() {
        let fk = |name: &str| RawForeignKey {
            name: name.to_string(),
            ..Default::default()
        };
        assert_eq!(unique_constraint_name(&[], "c_x_id_fkey".to_string(), "b"), "c_x_id_fkey");
        assert_eq!(
            unique_constraint_name(&[fk("c_x_id_fkey")], "c_x_id_fkey".to_string(), "b"),
            "c_x_id_fkey_b"
        );
        assert_eq!(
            unique_constraint_name(
                &[fk("c_x_id_fkey"), fk("c_x_id_fkey_b")],
                "c_x_id_fkey".to_string(),
                "b"
            ),
            "c_x_id_fkey_b_2"
        );
    }

    #[test]
    fn test_views_and_macros() {
        let catalog = memory_catalog();
        assert_eq!(catalog.views.len(), 1);
        let view = &catalog.views[0];
        assert_eq!(view.name, "v_titles");
        assert_eq!(view.columns.len(), 2);
        assert!(view.updatable);

        assert_eq!(catalog.routines.len(), 1);
        let routine = &catalog.routines[0];
        assert_eq!(routine.name, "add_price");
        assert_eq!(routine.parameters.len(), 2);
    }

    #[test]
    fn test_database_file_resolution() {
        let env = Environment::default();
        let absolute =
            DuckDbIntrospector::new(ConnectionParams::resolve("duckdb:///tmp/blog.duckdb", &env).unwrap());
        assert_eq!(absolute.database_file(), Some(PathBuf::from("/tmp/blog.duckdb")));

        let relative =
            DuckDbIntrospector::new(ConnectionParams::resolve("duckdb://data/blog.duckdb", &env).unwrap());
        assert_eq!(relative.database_file(), Some(PathBuf::from("data/blog.duckdb")));

        let mixed_case =
            DuckDbIntrospector::new(ConnectionParams::resolve("duckdb://Data/Blog.duckdb", &env).unwrap());
        assert_eq!(mixed_case.database_file(), Some(PathBuf::from("Data/Blog.duckdb")));

        let local =
            DuckDbIntrospector::new(ConnectionParams::resolve("duckdb://localhost/srv/blog.duckdb", &env).unwrap());
        assert_eq!(local.database_file(), Some(PathBuf::from("/srv/blog.duckdb")));

        let memory = DuckDbIntrospector::new(ConnectionParams::resolve("duckdb://", &env).unwrap());
        assert_eq!(memory.database_file(), None);
    }

    #[test]
    fn test_introspect_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blog.duckdb");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(SCHEMA).unwrap();
        }

        let dsn = format!("duckdb://{}", path.display());
        let params = ConnectionParams::resolve(&dsn, &Environment::default()).unwrap();
        let catalog = DuckDbIntrospector::new(params).introspect().unwrap();
        assert_eq!(catalog.database, "blog");
        assert_eq!(catalog.tables.len(), 2);
    }
}
