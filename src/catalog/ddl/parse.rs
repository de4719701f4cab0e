//! DDL statement parsing into raw catalog objects.
//!
//! Handles the MySQL flavour written by `mysqldump` plus the PostgreSQL and
//! SQLite spellings that commonly appear in hand-written schema files:
//! - CREATE TABLE column definitions, keys, indexes and foreign keys
//! - CREATE INDEX and ALTER TABLE ... ADD
//! - CREATE VIEW / TRIGGER / PROCEDURE / FUNCTION / EVENT
//! - COMMENT ON TABLE/COLUMN

use crate::catalog::{
    RawColumn, RawEvent, RawForeignKey, RawIndex, RawParameter, RawRoutine, RawTable, RawTrigger,
    RawView, PRIMARY_INDEX,
};
use once_cell::sync::Lazy;
use regex::Regex;

/// Possibly schema-qualified, possibly quoted object name; group captures the last part
const QUALIFIED_NAME: &str = r#"(?:[\[\]`"\w]+\s*\.\s*)*[\[`"]?([^\[\]`"\s(.;]+)[\]`"]?"#;

/// Regex to extract table name from CREATE TABLE
static CREATE_TABLE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?i)^\s*CREATE\s+(?:(?:GLOBAL\s+|LOCAL\s+)?TEMP(?:ORARY)?\s+|UNLOGGED\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?{QUALIFIED_NAME}"#
    ))
    .unwrap()
});

/// Regex to extract table name from ALTER TABLE
static ALTER_TABLE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?i)^\s*ALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(?:ONLY\s+)?{QUALIFIED_NAME}"#
    ))
    .unwrap()
});

/// Regex for column name and type declaration
static COLUMN_DEF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^\s*[\[`"]?([^\[\]`"\s,]+)[\]`"]?\s+(\w+(?:\s+(?:varying|precision))?(?:\s*\([^)]*\))?(?:\s+unsigned)?(?:\s+zerofill)?)"#,
    )
    .unwrap()
});

/// Regex for PRIMARY KEY constraint
static PRIMARY_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)PRIMARY\s+KEY\s*(?:CLUSTERED\s+|NONCLUSTERED\s+)?\(([^)]+)\)").unwrap()
});

/// Regex for inline PRIMARY KEY on column
static INLINE_PRIMARY_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bPRIMARY\s+KEY\b").unwrap());

/// Regex for inline UNIQUE on column
static INLINE_UNIQUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bUNIQUE(?:\s+KEY)?\b").unwrap());

/// Regex for FOREIGN KEY constraint with optional constraint name
static FOREIGN_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?i)(?:CONSTRAINT\s+[\[`"]?([^\[\]`"\s]+)[\]`"]?\s+)?FOREIGN\s+KEY\s*(?:[\[`"]?\w+[\]`"]?\s*)?\(([^)]+)\)\s*REFERENCES\s+{QUALIFIED_NAME}\s*\(([^)]+)\)"#
    ))
    .unwrap()
});

/// Regex for inline REFERENCES on a column
static INLINE_REFERENCES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?i)\bREFERENCES\s+{QUALIFIED_NAME}\s*(?:\(([^)]+)\))?"#
    ))
    .unwrap()
});

static ON_DELETE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bON\s+DELETE\s+(RESTRICT|CASCADE|SET\s+NULL|SET\s+DEFAULT|NO\s+ACTION)")
        .unwrap()
});

static ON_UPDATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bON\s+UPDATE\s+(RESTRICT|CASCADE|SET\s+NULL|SET\s+DEFAULT|NO\s+ACTION)")
        .unwrap()
});

/// Regex to detect NOT NULL constraint
static NOT_NULL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bNOT\s+NULL\b").unwrap());

static DEFAULT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bDEFAULT\s+(\(|'|[^\s,]+)").unwrap());

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bCOMMENT\s*=?\s*'").unwrap());

static COLLATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bCOLLATE\s*=?\s*[`'"]?(\w+)"#).unwrap());

static GENERATED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:GENERATED\s+ALWAYS\s+)?AS\s*\(").unwrap());

static ENGINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bENGINE\s*=\s*(\w+)").unwrap());

static ROW_FORMAT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bROW_FORMAT\s*=\s*(\w+)").unwrap());

/// Regex for CREATE INDEX statement up to the column list
static CREATE_INDEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?i)^\s*CREATE\s+(UNIQUE\s+|FULLTEXT\s+|SPATIAL\s+)?(?:CLUSTERED\s+|NONCLUSTERED\s+)?INDEX\s+(?:CONCURRENTLY\s+)?(?:IF\s+NOT\s+EXISTS\s+)?[\[`"]?(\w+)[\]`"]?\s+ON\s+(?:ONLY\s+)?{QUALIFIED_NAME}\s*(?:USING\s+(\w+)\s*)?"#
    ))
    .unwrap()
});

static CREATE_VIEW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?is)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(?:ALGORITHM\s*=\s*\w+\s+)?(?:DEFINER\s*=\s*\S+\s+)?(?:SQL\s+SECURITY\s+\w+\s+)?(?:TEMP(?:ORARY)?\s+)?VIEW\s+(?:IF\s+NOT\s+EXISTS\s+)?{QUALIFIED_NAME}\s*(\([^)]*\))?\s*AS\s+(.*)$"#
    ))
    .unwrap()
});

static CHECK_OPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\s+WITH\s+(?:(CASCADED|LOCAL)\s+)?CHECK\s+OPTION\s*$").unwrap()
});

static NON_UPDATABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:DISTINCT|GROUP\s+BY|HAVING|UNION|LIMIT)\b|\b(?:COUNT|SUM|MIN|MAX|AVG)\s*\(")
        .unwrap()
});

static CREATE_TRIGGER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?is)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(?:DEFINER\s*=\s*\S+\s+)?TRIGGER\s+(?:IF\s+NOT\s+EXISTS\s+)?{QUALIFIED_NAME}\s+(BEFORE|AFTER|INSTEAD\s+OF)\s+(INSERT|UPDATE|DELETE)(?:\s+OF\s+[^\s]+)?\s+ON\s+{QUALIFIED_NAME}\s+(?:FOR\s+EACH\s+(?:ROW|STATEMENT)\s+)?(.*)$"#
    ))
    .unwrap()
});

static CREATE_ROUTINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?is)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(?:DEFINER\s*=\s*\S+\s+)?(PROCEDURE|FUNCTION)\s+(?:IF\s+NOT\s+EXISTS\s+)?{QUALIFIED_NAME}\s*"#
    ))
    .unwrap()
});

static RETURNS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*RETURNS\s+(\w+(?:\s*\([^)]*\))?(?:\s+unsigned)?)").unwrap()
});

static ROUTINE_BODY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:BEGIN|RETURN|SELECT|INSERT|UPDATE|DELETE|SET|CALL)\b").unwrap());

static DOLLAR_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(?:[A-Za-z_][A-Za-z0-9_]*)?\$").unwrap());

static CREATE_EVENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?is)^\s*CREATE\s+(?:DEFINER\s*=\s*\S+\s+)?EVENT\s+(?:IF\s+NOT\s+EXISTS\s+)?{QUALIFIED_NAME}\s+ON\s+SCHEDULE\s+(.*?)\s+DO\s+(.*)$"#
    ))
    .unwrap()
});

static EVERY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bEVERY\s+'?(\d+)'?\s+(YEAR|QUARTER|MONTH|WEEK|DAY|HOUR|MINUTE|SECOND)\b")
        .unwrap()
});

static AT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*AT\s+'([^']*)'").unwrap());

static STARTS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bSTARTS\s+'([^']*)'").unwrap());

static ENDS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bENDS\s+'([^']*)'").unwrap());

static COMMENT_ON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*COMMENT\s+ON\s+(TABLE|COLUMN|VIEW)\s+(\S+)\s+IS\s+(NULL|'.*')\s*$")
        .unwrap()
});

/// Target of a `COMMENT ON` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentTarget {
    Table(String),
    Column(String, String),
}

/// Extract table name from CREATE TABLE statement
pub fn extract_create_table_name(stmt: &str) -> Option<String> {
    capture_name(&CREATE_TABLE_NAME_RE, stmt)
}

/// Extract table name from ALTER TABLE statement
pub fn extract_alter_table_name(stmt: &str) -> Option<String> {
    capture_name(&ALTER_TABLE_NAME_RE, stmt)
}

fn capture_name(re: &Regex, stmt: &str) -> Option<String> {
    re.captures(stmt)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse a full CREATE TABLE statement
pub fn parse_create_table(stmt: &str) -> Option<RawTable> {
    let name = extract_create_table_name(stmt)?;
    let open = stmt.find('(')?;
    let (body, tail) = take_parenthesized(&stmt[open..])?;

    let mut table = RawTable::new(name);
    for part in split_top_level(body) {
        apply_definition(&mut table, &part);
    }
    apply_table_options(&mut table, tail);
    Some(table)
}

/// Apply the ADD clauses of an ALTER TABLE statement to `table`
pub fn apply_alter_table(table: &mut RawTable, stmt: &str) {
    let Some(name_match) = ALTER_TABLE_NAME_RE.find(stmt) else {
        return;
    };
    for part in split_top_level(&stmt[name_match.end()..]) {
        let trimmed = part.trim();
        if let Some(rest) = strip_keyword(trimmed, "ADD") {
            let rest = strip_keyword(rest, "COLUMN").unwrap_or(rest);
            apply_definition(table, rest);
        } else if strip_keyword(trimmed, "COMMENT").is_some() {
            apply_table_options(table, trimmed);
        }
    }
}

/// Parse a CREATE INDEX statement into `(table, index)`
pub fn parse_create_index(stmt: &str) -> Option<(String, RawIndex)> {
    let caps = CREATE_INDEX_RE.captures(stmt)?;
    let kind = caps.get(1).map(|m| m.as_str().trim().to_uppercase());
    let name = caps.get(2)?.as_str().to_string();
    let table = caps.get(3)?.as_str().to_string();
    let method = caps.get(4).map(|m| m.as_str().to_uppercase());

    let rest = &stmt[caps.get(0)?.end()..];
    let (columns, _) = take_parenthesized(rest)?;

    let mut index = RawIndex {
        name,
        columns: parse_column_list(columns),
        unique: kind.as_deref() == Some("UNIQUE"),
        ..Default::default()
    };
    if let Some(kind) = kind.filter(|k| k != "UNIQUE") {
        index.flags.push(kind.to_lowercase());
    }
    if let Some(method) = method {
        index.options.insert("type".to_string(), method);
    }
    Some((table, index))
}

/// Parse a CREATE VIEW statement
pub fn parse_create_view(stmt: &str) -> Option<RawView> {
    let caps = CREATE_VIEW_RE.captures(stmt)?;
    let name = caps.get(1)?.as_str().to_string();
    let mut sql = caps.get(3)?.as_str().trim().to_string();

    let mut check_option = None;
    if let Some(check) = CHECK_OPTION_RE.captures(&sql) {
        check_option = Some(
            check
                .get(1)
                .map(|m| m.as_str().to_uppercase())
                .unwrap_or_else(|| "CASCADED".to_string()),
        );
        let start = check.get(0).map(|m| m.start()).unwrap_or(sql.len());
        sql.truncate(start);
    }

    let updatable = !NON_UPDATABLE_RE.is_match(&mask_strings(&sql));

    let columns = match caps.get(2) {
        Some(list) => parse_column_list(list.as_str().trim_matches(|c| c == '(' || c == ')'))
            .into_iter()
            .map(|name| RawColumn {
                name,
                ..Default::default()
            })
            .collect(),
        None => Vec::new(),
    };

    Some(RawView {
        name,
        sql,
        check_option,
        updatable,
        columns,
        ..Default::default()
    })
}

/// A select-list item: output alias plus the `(table, column)` it reads, when direct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItem {
    pub alias: String,
    pub source: Option<(Option<String>, String)>,
}

/// Parse the top-level select list of a view body
pub fn parse_select_list(sql: &str) -> Vec<SelectItem> {
    let masked = mask_strings(sql);
    let upper = masked.to_ascii_uppercase();
    let Some(select_pos) = find_keyword(&upper, "SELECT", 0) else {
        return Vec::new();
    };
    let start = select_pos + "SELECT".len();
    let end = find_keyword_at_depth0(&upper, "FROM", start).unwrap_or(sql.len());

    split_top_level(&sql[start..end])
        .into_iter()
        .filter_map(|item| parse_select_item(&item))
        .collect()
}

fn parse_select_item(item: &str) -> Option<SelectItem> {
    let item = item.trim();
    let item = strip_keyword(item, "DISTINCT").unwrap_or(item);
    if item.is_empty() || item.ends_with('*') {
        return None;
    }

    let upper = mask_strings(item).to_ascii_uppercase();
    let (expr, alias) = match rfind_keyword_at_depth0(&upper, "AS") {
        Some(pos) => (item[..pos].trim(), Some(unquote_identifier(item[pos + 2..].trim()))),
        None => (item, None),
    };

    let parts: Vec<&str> = expr.split('.').map(str::trim).collect();
    let is_plain = parts.iter().all(|p| is_identifier(p));
    let source = match (is_plain, parts.as_slice()) {
        (true, [column]) => Some((None, unquote_identifier(column))),
        (true, [.., table, column]) => {
            Some((Some(unquote_identifier(table)), unquote_identifier(column)))
        }
        _ => None,
    };

    let alias = alias
        .or_else(|| source.as_ref().map(|(_, c)| c.clone()))
        .unwrap_or_else(|| expr.to_string());
    Some(SelectItem { alias, source })
}

/// Parse a CREATE TRIGGER statement
pub fn parse_create_trigger(stmt: &str) -> Option<RawTrigger> {
    let caps = CREATE_TRIGGER_RE.captures(stmt)?;
    Some(RawTrigger {
        name: caps.get(1)?.as_str().to_string(),
        timing: collapse_whitespace(caps.get(2)?.as_str()).to_uppercase(),
        event: caps.get(3)?.as_str().to_uppercase(),
        table: caps.get(4)?.as_str().to_string(),
        statement: caps.get(5)?.as_str().trim().to_string(),
    })
}

/// Parse a CREATE PROCEDURE or CREATE FUNCTION statement
pub fn parse_create_routine(stmt: &str) -> Option<RawRoutine> {
    let caps = CREATE_ROUTINE_RE.captures(stmt)?;
    let kind = caps.get(1)?.as_str().to_uppercase();
    let name = caps.get(2)?.as_str().to_string();

    let (params, mut rest) = take_parenthesized(&stmt[caps.get(0)?.end()..])?;
    let parameters = split_top_level(params)
        .iter()
        .filter_map(|p| parse_parameter(p))
        .collect();

    let mut return_type = None;
    if let Some(returns) = RETURNS_RE.captures(rest) {
        return_type = returns.get(1).map(|m| m.as_str().to_string());
        rest = &rest[returns.get(0).map(|m| m.end()).unwrap_or(0)..];
    }

    if let Some((open, body)) = dollar_quoted_body(rest) {
        return Some(RawRoutine {
            name,
            kind,
            parameters,
            return_type,
            statement: body.trim().to_string(),
            comment: extract_comment(&rest[..open]),
        });
    }

    let masked = mask_strings(rest);
    let body_start = ROUTINE_BODY_RE
        .find(&masked)
        .map(|m| m.start())
        .unwrap_or(0);
    let characteristics = &rest[..body_start];

    Some(RawRoutine {
        name,
        kind,
        parameters,
        return_type,
        statement: rest[body_start..].trim().to_string(),
        comment: extract_comment(characteristics),
    })
}

/// First dollar-quoted block (`AS $$ ... $$`): offset of the opening tag and the quoted text
fn dollar_quoted_body(text: &str) -> Option<(usize, &str)> {
    let masked = mask_strings(text);
    let open = DOLLAR_TAG_RE.find(&masked)?;
    let tag = &text[open.start()..open.end()];
    let close = text[open.end()..].find(tag)?;
    Some((open.start(), &text[open.end()..open.end() + close]))
}

fn parse_parameter(param: &str) -> Option<RawParameter> {
    let mut words = param.split_whitespace();
    let first = words.next()?;
    let (mode, name) = if ["IN", "OUT", "INOUT"]
        .iter()
        .any(|m| first.eq_ignore_ascii_case(m))
    {
        (first.to_uppercase(), words.next()?)
    } else {
        (String::new(), first)
    };
    Some(RawParameter {
        mode,
        name: unquote_identifier(name),
        type_declaration: words.collect::<Vec<_>>().join(" "),
    })
}

/// Parse a CREATE EVENT statement
pub fn parse_create_event(stmt: &str) -> Option<RawEvent> {
    let caps = CREATE_EVENT_RE.captures(stmt)?;
    let name = caps.get(1)?.as_str().to_string();
    let schedule = caps.get(2)?.as_str();
    let statement = caps.get(3)?.as_str().trim().to_string();

    let interval = EVERY_RE.captures(schedule).and_then(|every| {
        let amount: u64 = every.get(1)?.as_str().parse().ok()?;
        Some(iso_interval(amount, every.get(2)?.as_str()))
    });
    let since = AT_RE
        .captures(schedule)
        .or_else(|| STARTS_RE.captures(schedule))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let until = ENDS_RE
        .captures(schedule)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    Some(RawEvent {
        name,
        statement,
        interval,
        since,
        until,
        comment: extract_comment(schedule),
    })
}

/// Convert an `EVERY <n> <unit>` schedule into an ISO-8601 duration
fn iso_interval(amount: u64, unit: &str) -> String {
    match unit.to_uppercase().as_str() {
        "YEAR" => format!("P{amount}Y"),
        "QUARTER" => format!("P{}M", amount * 3),
        "MONTH" => format!("P{amount}M"),
        "WEEK" => format!("P{}D", amount * 7),
        "DAY" => format!("P{amount}D"),
        "HOUR" => format!("PT{amount}H"),
        "MINUTE" => format!("PT{amount}M"),
        _ => format!("PT{amount}S"),
    }
}

/// Parse a PostgreSQL-style `COMMENT ON` statement
pub fn parse_comment_on(stmt: &str) -> Option<(CommentTarget, Option<String>)> {
    let caps = COMMENT_ON_RE.captures(stmt)?;
    let kind = caps.get(1)?.as_str().to_uppercase();
    let parts: Vec<String> = caps
        .get(2)?
        .as_str()
        .split('.')
        .map(unquote_identifier)
        .collect();
    let value = caps.get(3)?.as_str();
    let comment = if value.eq_ignore_ascii_case("NULL") {
        None
    } else {
        Some(unescape_sql_string(&value[1..value.len() - 1]))
    };

    let target = match (kind.as_str(), parts.as_slice()) {
        ("COLUMN", [.., table, column]) => CommentTarget::Column(table.clone(), column.clone()),
        ("TABLE" | "VIEW", [.., table]) => CommentTarget::Table(table.clone()),
        _ => return None,
    };
    Some((target, comment))
}

/// Apply one element of a CREATE TABLE body or an ALTER TABLE ADD clause
fn apply_definition(table: &mut RawTable, part: &str) {
    let trimmed = part.trim();
    if trimmed.is_empty() {
        return;
    }

    let is_constraint = [
        "PRIMARY",
        "CONSTRAINT",
        "FOREIGN",
        "KEY",
        "INDEX",
        "UNIQUE",
        "FULLTEXT",
        "SPATIAL",
        "CHECK",
    ]
    .iter()
    .any(|kw| strip_keyword(trimmed, kw).is_some());

    if !is_constraint {
        parse_column_def(table, trimmed);
        return;
    }

    if let Some(pk_cols) = parse_primary_key_constraint(trimmed) {
        set_primary_key(table, pk_cols);
        return;
    }

    let fks = parse_foreign_keys(trimmed, &table.name, table.foreign_keys.len());
    if !fks.is_empty() {
        table.foreign_keys.extend(fks);
        return;
    }

    if let Some(index) = parse_index_definition(trimmed) {
        table.indexes.push(index);
    }
}

fn set_primary_key(table: &mut RawTable, columns: Vec<String>) {
    table.indexes.retain(|i| !i.primary);
    for name in &columns {
        if let Some(col) = table.column_mut(name) {
            col.not_null = true;
        }
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

/// Parse a column definition and its inline constraints
fn parse_column_def(table: &mut RawTable, def: &str) {
    let Some(caps) = COLUMN_DEF_RE.captures(def) else {
        return;
    };
    let (Some(name), Some(decl), Some(whole)) = (caps.get(1), caps.get(2), caps.get(0)) else {
        return;
    };
    let name = name.as_str().to_string();
    let declaration = collapse_whitespace(decl.as_str());
    let attrs = &def[whole.end()..];
    let masked = mask_strings(attrs);

    let mut column = RawColumn {
        name: name.clone(),
        not_null: NOT_NULL_RE.is_match(&masked),
        unsigned: declaration.to_lowercase().contains("unsigned"),
        ..Default::default()
    };
    apply_type_declaration(&mut column, &declaration);

    column.default = DEFAULT_RE.captures(&masked).and_then(|c| {
        let m = c.get(1)?;
        parse_default(&attrs[m.start()..])
    });
    column.comment = extract_comment_masked(attrs, &masked);
    column.collation = COLLATE_RE
        .captures(&masked)
        .and_then(|c| c.get(1))
        .map(|m| attrs[m.range()].to_string());
    column.generated = GENERATED_RE.find(&masked).and_then(|m| {
        let (expr, _) = take_parenthesized(&attrs[m.end() - 1..])?;
        Some(expr.trim().to_string())
    });

    let inline_primary = INLINE_PRIMARY_KEY_RE.is_match(&masked);
    let inline_unique = !inline_primary && INLINE_UNIQUE_RE.is_match(&masked);
    let reference = INLINE_REFERENCES_RE.captures(&masked).and_then(|c| {
        let foreign_table = attrs[c.get(1)?.range()].to_string();
        let foreign_columns = c
            .get(2)
            .map(|m| parse_column_list(&attrs[m.range()]))
            .unwrap_or_else(|| vec![name.clone()]);
        let tail = &attrs[c.get(0)?.end()..];
        Some((foreign_table, foreign_columns, tail))
    });

    table.columns.push(column);

    if inline_primary {
        set_primary_key(table, vec![name.clone()]);
    }
    if inline_unique {
        table.indexes.push(RawIndex {
            name: name.clone(),
            columns: vec![name.clone()],
            unique: true,
            ..Default::default()
        });
    }
    if let Some((foreign_table, foreign_columns, tail)) = reference {
        table.foreign_keys.push(RawForeignKey {
            name: format!("{}_{}_fkey", table.name, name),
            columns: vec![name],
            foreign_table,
            foreign_columns,
            on_update: referential_action(&ON_UPDATE_RE, tail),
            on_delete: referential_action(&ON_DELETE_RE, tail),
        });
    }
}

/// Fill type name, length, precision and scale from a declaration like `decimal(10,2)`
fn apply_type_declaration(column: &mut RawColumn, declaration: &str) {
    let lower = declaration.to_lowercase();
    let base = lower
        .split('(')
        .next()
        .unwrap_or(&lower)
        .trim()
        .trim_end_matches(" unsigned")
        .trim_end_matches(" zerofill")
        .trim()
        .to_string();

    let numbers: Vec<u32> = declaration
        .find('(')
        .and_then(|open| take_parenthesized(&declaration[open..]))
        .map(|(inner, _)| {
            inner
                .split(',')
                .filter_map(|n| n.trim().parse().ok())
                .collect()
        })
        .unwrap_or_default();

    match base.as_str() {
        "decimal" | "numeric" | "float" | "double" | "real" | "double precision" => {
            column.precision = numbers.first().copied();
            column.scale = numbers.get(1).copied();
        }
        _ => column.length = numbers.first().copied(),
    }

    column.col_type = base;
    column.type_declaration = Some(declaration.to_string());
}

/// Parse the value following `DEFAULT`
fn parse_default(text: &str) -> Option<String> {
    if text.starts_with('\'') {
        let (literal, _) = take_string_literal(text)?;
        return Some(literal);
    }
    if text.starts_with('(') {
        let (inner, _) = take_parenthesized(text)?;
        return Some(inner.trim().to_string());
    }
    let token: String = text
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != ',')
        .collect();
    if token.eq_ignore_ascii_case("NULL") {
        None
    } else {
        Some(token)
    }
}

/// Parse PRIMARY KEY constraint, returns column names
fn parse_primary_key_constraint(constraint: &str) -> Option<Vec<String>> {
    let rest = match strip_keyword(constraint, "CONSTRAINT") {
        Some(rest) => take_identifier(rest).map(|(_, r)| r).unwrap_or(rest),
        None => constraint,
    };
    let rest = strip_keyword(rest, "PRIMARY")?;
    let text = format!("PRIMARY {rest}");
    let caps = PRIMARY_KEY_RE.captures(&text)?;
    Some(parse_column_list(caps.get(1)?.as_str()))
}

/// Parse a KEY/INDEX/UNIQUE/FULLTEXT/SPATIAL definition
fn parse_index_definition(def: &str) -> Option<RawIndex> {
    let mut rest = def.trim();
    let mut name = None;

    if let Some(after) = strip_keyword(rest, "CONSTRAINT") {
        let (constraint_name, after) = take_identifier(after)?;
        name = Some(constraint_name);
        rest = after;
    }

    let mut unique = false;
    let mut flags = Vec::new();
    let mut matched = false;
    if let Some(after) = strip_keyword(rest, "UNIQUE") {
        unique = true;
        matched = true;
        rest = after;
    } else if let Some(after) = strip_keyword(rest, "FULLTEXT") {
        flags.push("fulltext".to_string());
        matched = true;
        rest = after;
    } else if let Some(after) = strip_keyword(rest, "SPATIAL") {
        flags.push("spatial".to_string());
        matched = true;
        rest = after;
    }
    if let Some(after) = strip_keyword(rest, "INDEX").or_else(|| strip_keyword(rest, "KEY")) {
        matched = true;
        rest = after;
    }
    if !matched {
        return None;
    }

    if !rest.starts_with('(') && strip_keyword(rest, "USING").is_none() {
        let (index_name, after) = take_identifier(rest)?;
        name = Some(index_name);
        rest = after;
    }

    let mut options = std::collections::BTreeMap::new();
    if let Some(after) = strip_keyword(rest, "USING") {
        let (method, after) = take_identifier(after)?;
        options.insert("type".to_string(), method.to_uppercase());
        rest = after;
    }

    let (columns, _) = take_parenthesized(rest)?;
    let columns = parse_column_list(columns);
    let name = name.or_else(|| columns.first().cloned())?;

    Some(RawIndex {
        name,
        columns,
        unique,
        primary: false,
        flags,
        options,
    })
}

/// Parse FOREIGN KEY constraints from a statement
fn parse_foreign_keys(stmt: &str, table: &str, existing: usize) -> Vec<RawForeignKey> {
    let matches: Vec<_> = FOREIGN_KEY_RE.captures_iter(stmt).collect();
    let mut fks = Vec::new();

    for (i, caps) in matches.iter().enumerate() {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let tail_end = matches
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(stmt.len());
        let tail = &stmt[whole.end()..tail_end];

        let local_cols = caps
            .get(2)
            .map(|m| parse_column_list(m.as_str()))
            .unwrap_or_default();
        let ref_table = caps
            .get(3)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let ref_cols = caps
            .get(4)
            .map(|m| parse_column_list(m.as_str()))
            .unwrap_or_default();

        if local_cols.is_empty() || ref_table.is_empty() || ref_cols.is_empty() {
            continue;
        }

        let name = caps
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| format!("{}_ibfk_{}", table, existing + fks.len() + 1));

        fks.push(RawForeignKey {
            name,
            columns: local_cols,
            foreign_table: ref_table,
            foreign_columns: ref_cols,
            on_update: referential_action(&ON_UPDATE_RE, tail),
            on_delete: referential_action(&ON_DELETE_RE, tail),
        });
    }

    fks
}

fn referential_action(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| collapse_whitespace(m.as_str()).to_uppercase())
}

/// Apply ENGINE / COLLATE / ROW_FORMAT / COMMENT table options
fn apply_table_options(table: &mut RawTable, tail: &str) {
    let masked = mask_strings(tail);
    let option = |re: &Regex| {
        re.captures(&masked)
            .and_then(|c| c.get(1))
            .map(|m| tail[m.range()].to_string())
    };
    if let Some(engine) = option(&ENGINE_RE) {
        table.engine = Some(engine);
    }
    if let Some(collation) = option(&COLLATE_RE) {
        table.collation = Some(collation);
    }
    if let Some(row_format) = option(&ROW_FORMAT_RE) {
        table.row_format = Some(row_format);
    }
    if let Some(comment) = extract_comment_masked(tail, &masked) {
        table.comment = Some(comment);
    }
}

fn extract_comment(text: &str) -> Option<String> {
    extract_comment_masked(text, &mask_strings(text))
}

/// Find `COMMENT '...'` in `masked` and decode the literal from `text`
fn extract_comment_masked(text: &str, masked: &str) -> Option<String> {
    let m = COMMENT_RE.find(masked)?;
    let (literal, _) = take_string_literal(&text[m.end() - 1..])?;
    Some(literal)
}

/// Split by commas, respecting nested parentheses and quotes
pub fn split_top_level(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escape_next = false;

    for ch in body.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        if let Some(q) = quote {
            if ch == '\\' && q != '`' {
                escape_next = true;
            } else if ch == q {
                quote = None;
            }
            current.push(ch);
            continue;
        }

        match ch {
            '\'' | '"' | '`' => {
                quote = Some(ch);
                current.push(ch);
            }
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }

    parts
}

/// Take the balanced parenthesized group at the start of `s` (after whitespace).
///
/// Returns the inner text and the remainder after the closing parenthesis.
pub fn take_parenthesized(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if !s.starts_with('(') {
        return None;
    }

    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if let Some(q) = quote {
            if ch == '\\' && q != '`' {
                escape_next = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&s[1..i], &s[i + 1..]));
                }
            }
            _ => {}
        }
    }

    None
}

/// Take a single-quoted SQL string literal at the start of `s`, decoded
fn take_string_literal(s: &str) -> Option<(String, &str)> {
    let s = s.trim_start();
    let body = s.strip_prefix('\'')?;
    let mut chars = body.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        match ch {
            '\\' => {
                chars.next();
            }
            '\'' => {
                if matches!(chars.peek(), Some((_, '\''))) {
                    chars.next();
                } else {
                    return Some((unescape_sql_string(&body[..i]), &body[i + 1..]));
                }
            }
            _ => {}
        }
    }

    None
}

/// Decode backslash escapes and doubled quotes inside a string literal
pub fn unescape_sql_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                out.push('\'');
            }
            _ => out.push(ch),
        }
    }

    out
}

/// Replace the contents of quoted literals with spaces, preserving byte offsets
pub fn mask_strings(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut quote: Option<char> = None;
    let mut escape_next = false;

    for ch in s.chars() {
        let blank = || " ".repeat(ch.len_utf8());
        if escape_next {
            escape_next = false;
            out.push_str(&blank());
            continue;
        }
        match quote {
            Some(q) => {
                if ch == '\\' && q == '\'' {
                    escape_next = true;
                    out.push_str(&blank());
                } else if ch == q {
                    quote = None;
                    out.push(ch);
                } else {
                    out.push_str(&blank());
                }
            }
            None => {
                if ch == '\'' {
                    quote = Some(ch);
                }
                out.push(ch);
            }
        }
    }

    out
}

/// Parse a comma-separated column list, stripping quotes, prefix lengths and sort order
pub fn parse_column_list(s: &str) -> Vec<String> {
    split_top_level(s)
        .iter()
        .map(|c| {
            let c = c.trim();
            let c = c.split('(').next().unwrap_or(c).trim();
            let c = c
                .split_whitespace()
                .next()
                .unwrap_or(c);
            unquote_identifier(c)
        })
        .filter(|c| !c.is_empty())
        .collect()
}

/// Strip identifier quoting: `` `x` ``, `"x"`, `[x]`
pub fn unquote_identifier(s: &str) -> String {
    s.trim()
        .trim_matches('`')
        .trim_matches('"')
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string()
}

fn is_identifier(s: &str) -> bool {
    let s = unquote_identifier(s);
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Take a (possibly quoted) identifier at the start of `s`
fn take_identifier(s: &str) -> Option<(String, &str)> {
    let s = s.trim_start();
    let first = s.chars().next()?;
    let close = match first {
        '`' => Some('`'),
        '"' => Some('"'),
        '[' => Some(']'),
        _ => None,
    };
    match close {
        Some(close) => {
            let end = s[1..].find(close)? + 1;
            Some((s[1..end].to_string(), &s[end + 1..]))
        }
        None => {
            let end = s
                .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
                .unwrap_or(s.len());
            (end > 0).then(|| (s[..end].to_string(), &s[end..]))
        }
    }
}

/// Strip a leading case-insensitive keyword followed by a word boundary
fn strip_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let s = s.trim_start();
    let head = s.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &s[keyword.len()..];
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_alphanumeric() || c == '_' => None,
        Some(_) => Some(rest.trim_start()),
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn keyword_at(upper: &str, keyword: &str, pos: usize) -> bool {
    let bytes = upper.as_bytes();
    upper[pos..].starts_with(keyword)
        && (pos == 0 || !is_word_byte(bytes[pos - 1]))
        && bytes
            .get(pos + keyword.len())
            .map(|b| !is_word_byte(*b))
            .unwrap_or(true)
}

fn find_keyword(upper: &str, keyword: &str, from: usize) -> Option<usize> {
    (from..upper.len()).find(|&pos| upper.is_char_boundary(pos) && keyword_at(upper, keyword, pos))
}

fn find_keyword_at_depth0(upper: &str, keyword: &str, from: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (pos, ch) in upper.char_indices().skip_while(|(p, _)| *p < from) {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ if depth == 0 && keyword_at(upper, keyword, pos) => return Some(pos),
            _ => {}
        }
    }
    None
}

fn rfind_keyword_at_depth0(upper: &str, keyword: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut found = None;
    for (pos, ch) in upper.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ if depth == 0 && keyword_at(upper, keyword, pos) => found = Some(pos),
            _ => {}
        }
    }
    found
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
