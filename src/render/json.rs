//! JSON document of the normalized schema.

use crate::schema::{Column, Event, ForeignKey, Index, Routine, Schema, Table, Trigger, View};
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::BTreeMap;

/// Index option rendered as its own field
const EXPRESSION_OPTION: &str = "expression";

/// JSON representation of a described database
#[derive(Debug, Serialize, JsonSchema)]
pub struct DescribeJson {
    pub database: String,
    pub tables: Vec<TableJson>,
    pub views: Vec<ViewJson>,
    pub routines: Vec<RoutineJson>,
    pub events: Vec<EventJson>,
    pub triggers: Vec<TriggerJson>,
    pub stats: DescribeStats,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct TableJson {
    /// 1-based position in name order
    pub no: usize,
    pub name: String,
    pub logical_name: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_format: Option<String>,
    pub columns: Vec<ColumnJson>,
    pub indexes: Vec<IndexJson>,
    pub foreign_keys: Vec<ForeignKeyJson>,
    pub reference_keys: Vec<ReferenceKeyJson>,
    pub triggers: Vec<TriggerJson>,
    pub ranks: BTreeMap<String, u32>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ColumnJson {
    pub no: usize,
    pub name: String,
    pub logical_name: String,
    pub summary: String,
    #[serde(rename = "type")]
    pub col_type: String,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    pub unsigned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated: Option<String>,
    pub constraints: Vec<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct IndexJson {
    pub no: usize,
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub primary: bool,
    /// Index type flags such as `fulltext`
    pub flags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ForeignKeyJson {
    pub no: usize,
    pub name: String,
    pub columns: Vec<String>,
    pub foreign_table: String,
    pub foreign_columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
}

/// A foreign key seen from the referenced table
#[derive(Debug, Serialize, JsonSchema)]
pub struct ReferenceKeyJson {
    pub no: usize,
    pub name: String,
    /// The referencing table
    pub table: String,
    /// Columns of this table
    pub columns: Vec<String>,
    /// Columns of the referencing table
    pub foreign_columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct TriggerJson {
    pub name: String,
    pub table: String,
    pub timing: String,
    pub event: String,
    pub statement: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ViewJson {
    pub no: usize,
    pub name: String,
    pub logical_name: String,
    pub summary: String,
    pub sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_option: Option<String>,
    pub updatable: bool,
    pub columns: Vec<ColumnJson>,
    pub indexes: Vec<IndexJson>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct RoutineJson {
    pub no: usize,
    pub name: String,
    pub logical_name: String,
    pub summary: String,
    pub kind: String,
    pub parameters: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    pub statement: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct EventJson {
    pub no: usize,
    pub name: String,
    pub logical_name: String,
    pub summary: String,
    pub statement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
}

/// Object counts
#[derive(Debug, Serialize, JsonSchema)]
pub struct DescribeStats {
    pub table_count: usize,
    pub view_count: usize,
    pub routine_count: usize,
    pub event_count: usize,
    pub column_count: usize,
    pub foreign_key_count: usize,
    pub trigger_count: usize,
}

/// Generate pretty JSON output for a schema
pub fn to_json(schema: &Schema) -> String {
    let doc = build_describe_json(schema);
    serde_json::to_string_pretty(&doc).unwrap_or_else(|_| "{}".to_string())
}

/// Build the JSON structure
pub fn build_describe_json(schema: &Schema) -> DescribeJson {
    let tables: Vec<TableJson> = schema
        .tables
        .iter()
        .enumerate()
        .map(|(i, t)| table_json(i + 1, t))
        .collect();

    let stats = DescribeStats {
        table_count: schema.tables.len(),
        view_count: schema.views.len(),
        routine_count: schema.routines.len(),
        event_count: schema.events.len(),
        column_count: schema.tables.iter().map(|t| t.columns.len()).sum(),
        foreign_key_count: schema.foreign_key_count(),
        trigger_count: schema.triggers.len(),
    };

    DescribeJson {
        database: schema.database.clone(),
        tables,
        views: numbered(&schema.views, view_json),
        routines: numbered(&schema.routines, routine_json),
        events: numbered(&schema.events, event_json),
        triggers: schema.triggers.iter().map(trigger_json).collect(),
        stats,
    }
}

fn numbered<T, J>(items: &[T], f: impl Fn(usize, &T) -> J) -> Vec<J> {
    items.iter().enumerate().map(|(i, item)| f(i + 1, item)).collect()
}

fn table_json(no: usize, table: &Table) -> TableJson {
    let foreign_keys = table
        .foreign_keys
        .values()
        .enumerate()
        .map(|(i, fk)| ForeignKeyJson {
            rank: table.ranks.get(&fk.name).copied(),
            ..foreign_key_json(i + 1, fk)
        })
        .collect();

    let reference_keys = table
        .reference_keys
        .values()
        .enumerate()
        .map(|(i, fk)| reference_key_json(i + 1, fk))
        .collect();

    TableJson {
        no,
        name: table.name.clone(),
        logical_name: table.logical_name.clone(),
        summary: table.summary.clone(),
        engine: table.engine.clone(),
        collation: table.collation.clone(),
        row_format: table.row_format.clone(),
        columns: numbered(&table.columns, column_json),
        indexes: numbered(&table.indexes, index_json),
        foreign_keys,
        reference_keys,
        triggers: table.triggers.iter().map(trigger_json).collect(),
        ranks: table.ranks.clone(),
    }
}

fn column_json(no: usize, column: &Column) -> ColumnJson {
    ColumnJson {
        no,
        name: column.name.clone(),
        logical_name: column.logical_name.clone(),
        summary: column.summary.clone(),
        col_type: column.display_type().to_string(),
        nullable: !column.not_null,
        default: column.default.clone(),
        length: column.length,
        precision: column.precision,
        scale: column.scale,
        unsigned: column.unsigned,
        collation: column.collation.clone(),
        generated: column.generated.clone(),
        constraints: column.constraints.clone(),
    }
}

fn index_json(no: usize, index: &Index) -> IndexJson {
    let mut options = index.options.clone();
    let expression = options.remove(EXPRESSION_OPTION);
    IndexJson {
        no,
        name: index.name.clone(),
        columns: index.columns.clone(),
        unique: index.unique,
        primary: index.primary,
        flags: index.flags.clone(),
        expression,
        options,
    }
}

fn foreign_key_json(no: usize, fk: &ForeignKey) -> ForeignKeyJson {
    ForeignKeyJson {
        no,
        name: fk.name.clone(),
        columns: fk.local_columns.clone(),
        foreign_table: fk.foreign_table.clone(),
        foreign_columns: fk.foreign_columns.clone(),
        on_update: fk.on_update.clone(),
        on_delete: fk.on_delete.clone(),
        rank: None,
    }
}

fn reference_key_json(no: usize, fk: &ForeignKey) -> ReferenceKeyJson {
    ReferenceKeyJson {
        no,
        name: fk.name.clone(),
        table: fk.local_table.clone(),
        columns: fk.foreign_columns.clone(),
        foreign_columns: fk.local_columns.clone(),
        on_update: fk.on_update.clone(),
        on_delete: fk.on_delete.clone(),
    }
}

fn trigger_json(trigger: &Trigger) -> TriggerJson {
    TriggerJson {
        name: trigger.name.clone(),
        table: trigger.table.clone(),
        timing: trigger.timing.clone(),
        event: trigger.event.clone(),
        statement: trigger.statement.clone(),
    }
}

fn view_json(no: usize, view: &View) -> ViewJson {
    ViewJson {
        no,
        name: view.name.clone(),
        logical_name: view.logical_name.clone(),
        summary: view.summary.clone(),
        sql: view.sql.clone(),
        check_option: view.check_option.clone(),
        updatable: view.updatable,
        columns: numbered(&view.columns, column_json),
        indexes: numbered(&view.indexes, index_json),
    }
}

fn routine_json(no: usize, routine: &Routine) -> RoutineJson {
    RoutineJson {
        no,
        name: routine.name.clone(),
        logical_name: routine.logical_name.clone(),
        summary: routine.summary.clone(),
        kind: routine.kind.clone(),
        parameters: routine.parameters.clone(),
        return_type: routine.return_type.clone(),
        statement: routine.statement.clone(),
    }
}

fn event_json(no: usize, event: &Event) -> EventJson {
    EventJson {
        no,
        name: event.name.clone(),
        logical_name: event.logical_name.clone(),
        summary: event.summary.clone(),
        statement: event.statement.clone(),
        interval: event.interval.clone(),
        since: event.since.clone(),
        until: event.until.clone(),
    }
}
