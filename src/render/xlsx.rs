//! Spreadsheet workbook output.
//!
//! The first sheet (named after the database) lists every table with a link
//! to its own sheet. Each table sheet holds the table header followed by
//! column, index, foreign key, reference key and trigger blocks.

use crate::error::Result;
use crate::schema::{ForeignKey, Schema, Table};
use ahash::AHashSet;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet};

/// Excel's limit on sheet name length
const MAX_SHEET_NAME: usize = 31;

/// Characters Excel rejects in sheet names
const INVALID_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Excel's limit on characters in one cell
const MAX_CELL_CHARS: usize = 32767;

/// Sheet name used when the database name is empty
const INDEX_SHEET: &str = "index";

struct Formats {
    title: Format,
    heading: Format,
    cell: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            title: Format::new().set_bold().set_font_size(14),
            heading: Format::new()
                .set_bold()
                .set_background_color(Color::RGB(0xEEEEEE))
                .set_border(FormatBorder::Thin),
            cell: Format::new().set_border(FormatBorder::Thin).set_text_wrap(),
        }
    }
}

/// Generate the workbook as `.xlsx` bytes
pub fn to_xlsx(schema: &Schema) -> Result<Vec<u8>> {
    let formats = Formats::new();
    let mut used = AHashSet::new();

    let index_name = sheet_name(&schema.database, INDEX_SHEET, &mut used);
    let table_sheets: Vec<String> = schema
        .tables
        .iter()
        .map(|t| sheet_name(&t.logical_name, &t.name, &mut used))
        .collect();

    let mut workbook = Workbook::new();

    let index = workbook.add_worksheet();
    index.set_name(&index_name)?;
    write_index(index, schema, &table_sheets, &formats)?;

    for (table, name) in schema.tables.iter().zip(&table_sheets) {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;
        write_table(sheet, table, &index_name, &formats)?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_index(
    sheet: &mut Worksheet,
    schema: &Schema,
    table_sheets: &[String],
    formats: &Formats,
) -> Result<()> {
    if !schema.database.is_empty() {
        sheet.write_string_with_format(0, 0, &schema.database, &formats.title)?;
    }
    write_header(
        sheet,
        2,
        &["No", "Name", "Logical name", "Summary", "Columns", "Engine", "Collation"],
        formats,
    )?;

    for (i, (table, sheet_name)) in schema.tables.iter().zip(table_sheets).enumerate() {
        let row = 3 + i as u32;
        sheet.write_number_with_format(row, 0, (i + 1) as f64, &formats.cell)?;
        sheet.write_url_with_text(row, 1, internal_link(sheet_name).as_str(), &table.name)?;
        write_cells(
            sheet,
            row,
            2,
            &[
                table.logical_name.as_str(),
                table.summary.as_str(),
                table.columns.len().to_string().as_str(),
                table.engine.as_deref().unwrap_or(""),
                table.collation.as_deref().unwrap_or(""),
            ],
            formats,
        )?;
    }

    sheet.set_column_width(1, 24)?;
    sheet.set_column_width(2, 24)?;
    sheet.set_column_width(3, 48)?;
    sheet.set_freeze_panes(3, 0)?;
    Ok(())
}

fn write_table(sheet: &mut Worksheet, table: &Table, index_name: &str, formats: &Formats) -> Result<()> {
    sheet.write_string_with_format(0, 0, &table.name, &formats.title)?;
    sheet.write_string(0, 2, &table.logical_name)?;
    sheet.write_url_with_text(0, 7, internal_link(index_name).as_str(), "Index")?;
    sheet.write_string(1, 0, &table.summary)?;
    let mut row = 3;

    write_header(
        sheet,
        row,
        &[
            "No", "Name", "Logical name", "Type", "Not null", "Default", "Constraints", "Summary",
        ],
        formats,
    )?;
    for (i, column) in table.columns.iter().enumerate() {
        row += 1;
        sheet.write_number_with_format(row, 0, (i + 1) as f64, &formats.cell)?;
        write_cells(
            sheet,
            row,
            1,
            &[
                column.name.as_str(),
                column.logical_name.as_str(),
                column.display_type(),
                if column.not_null { "YES" } else { "" },
                column.default.as_deref().unwrap_or(""),
                column.constraints.join(", ").as_str(),
                column.summary.as_str(),
            ],
            formats,
        )?;
    }

    row += 2;
    write_header(sheet, row, &["Index", "Columns", "Unique", "Primary", "Flags"], formats)?;
    for index in &table.indexes {
        row += 1;
        write_cells(
            sheet,
            row,
            0,
            &[
                index.name.as_str(),
                index.columns.join(", ").as_str(),
                if index.unique { "YES" } else { "" },
                if index.primary { "YES" } else { "" },
                index.flags.join(", ").as_str(),
            ],
            formats,
        )?;
    }

    row += 2;
    write_header(
        sheet,
        row,
        &["Foreign key", "Columns", "Table", "Foreign columns", "On update", "On delete"],
        formats,
    )?;
    for fk in table.foreign_keys.values() {
        row += 1;
        write_key(sheet, row, fk, &fk.foreign_table, &fk.local_columns, &fk.foreign_columns, formats)?;
    }

    row += 2;
    write_header(
        sheet,
        row,
        &["Referenced by", "Columns", "Table", "Foreign columns", "On update", "On delete"],
        formats,
    )?;
    for rk in table.reference_keys.values() {
        row += 1;
        // seen from the referenced table: its own columns first
        write_key(sheet, row, rk, &rk.local_table, &rk.foreign_columns, &rk.local_columns, formats)?;
    }

    if !table.triggers.is_empty() {
        row += 2;
        write_header(sheet, row, &["Trigger", "Timing", "Event", "Statement"], formats)?;
        for trigger in &table.triggers {
            row += 1;
            write_cells(
                sheet,
                row,
                0,
                &[
                    trigger.name.as_str(),
                    trigger.timing.as_str(),
                    trigger.event.as_str(),
                    trigger.statement.as_str(),
                ],
                formats,
            )?;
        }
    }

    sheet.set_column_width(0, 24)?;
    sheet.set_column_width(1, 24)?;
    sheet.set_column_width(2, 24)?;
    sheet.set_column_width(7, 48)?;
    Ok(())
}

fn write_key(
    sheet: &mut Worksheet,
    row: u32,
    key: &ForeignKey,
    table: &str,
    columns: &[String],
    foreign_columns: &[String],
    formats: &Formats,
) -> Result<()> {
    write_cells(
        sheet,
        row,
        0,
        &[
            key.name.as_str(),
            columns.join(", ").as_str(),
            table,
            foreign_columns.join(", ").as_str(),
            key.on_update.as_deref().unwrap_or(""),
            key.on_delete.as_deref().unwrap_or(""),
        ],
        formats,
    )
}

fn write_header(sheet: &mut Worksheet, row: u32, labels: &[&str], formats: &Formats) -> Result<()> {
    for (col, label) in labels.iter().enumerate() {
        sheet.write_string_with_format(row, col as u16, *label, &formats.heading)?;
    }
    Ok(())
}

fn write_cells(
    sheet: &mut Worksheet,
    row: u32,
    first_col: u16,
    values: &[&str],
    formats: &Formats,
) -> Result<()> {
    for (i, value) in values.iter().enumerate() {
        let text = match value.char_indices().nth(MAX_CELL_CHARS) {
            Some((end, _)) => &value[..end],
            None => *value,
        };
        sheet.write_string_with_format(row, first_col + i as u16, text, &formats.cell)?;
    }
    Ok(())
}

fn internal_link(sheet_name: &str) -> String {
    format!("internal:'{}'!A1", sheet_name.replace('\'', "''"))
}

/// Valid, workbook-unique sheet name: the preferred label (logical name),
/// else the fallback (table name), cleaned and truncated
fn sheet_name(preferred: &str, fallback: &str, used: &mut AHashSet<String>) -> String {
    let source = if preferred.trim().is_empty() {
        fallback
    } else {
        preferred
    };
    let cleaned: String = source
        .lines()
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let mut base: String = cleaned.trim().trim_matches('\'').chars().take(MAX_SHEET_NAME).collect();
    if base.is_empty() || base.eq_ignore_ascii_case("history") {
        base = format!("sheet{}", used.len() + 1);
    }

    let mut name = base.clone();
    let mut n = 2;
    while used.contains(&name.to_lowercase()) {
        let suffix = format!("~{n}");
        let keep = MAX_SHEET_NAME - suffix.chars().count();
        name = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
        n += 1;
    }
    used.insert(name.to_lowercase());
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, ConstraintKey, Index};
    use std::io::{Cursor, Read};

    fn create_test_schema() -> Schema {
        let fk = ForeignKey {
            name: "fk_comment_article".to_string(),
            local_table: "t_comment".to_string(),
            local_columns: vec!["article_id".to_string()],
            foreign_table: "t_article".to_string(),
            foreign_columns: vec!["article_id".to_string()],
            on_delete: Some("CASCADE".to_string()),
            ..Default::default()
        };

        let mut article = Table {
            name: "t_article".to_string(),
            logical_name: "Article".to_string(),
            summary: "Blog posts".to_string(),
            columns: vec![Column {
                name: "article_id".to_string(),
                logical_name: "ArticleID".to_string(),
                col_type: "integer".to_string(),
                not_null: true,
                ..Default::default()
            }],
            indexes: vec![Index {
                name: "PRIMARY".to_string(),
                columns: vec!["article_id".to_string()],
                unique: true,
                primary: true,
                ..Default::default()
            }],
            ..Default::default()
        };
        article
            .reference_keys
            .insert(ConstraintKey::new("t_comment", "fk_comment_article"), fk.clone());

        let mut comment = Table {
            name: "t_comment".to_string(),
            columns: vec![
                Column {
                    name: "comment_id".to_string(),
                    col_type: "integer".to_string(),
                    ..Default::default()
                },
                Column {
                    name: "article_id".to_string(),
                    col_type: "integer".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        comment.foreign_keys.insert(fk.name.clone(), fk);

        Schema {
            database: "blog".to_string(),
            tables: vec![article, comment],
            ..Default::default()
        }
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_workbook_sheets() {
        let bytes = to_xlsx(&create_test_schema()).unwrap();
        assert!(bytes.starts_with(b"PK"));

        let workbook = read_entry(&bytes, "xl/workbook.xml");
        let blog = workbook.find("name=\"blog\"").unwrap();
        let article = workbook.find("name=\"Article\"").unwrap();
        let comment = workbook.find("name=\"t_comment\"").unwrap();
        assert!(blog < article && article < comment);
    }

    #[test]
    fn test_workbook_contents() {
        let bytes = to_xlsx(&create_test_schema()).unwrap();
        let strings = read_entry(&bytes, "xl/sharedStrings.xml");
        for expected in [
            "t_article",
            "Blog posts",
            "ArticleID",
            "Referenced by",
            "fk_comment_article",
            "CASCADE",
            "comment_id",
        ] {
            assert!(strings.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn test_empty_schema() {
        let bytes = to_xlsx(&Schema::default()).unwrap();
        let workbook = read_entry(&bytes, "xl/workbook.xml");
        assert!(workbook.contains("name=\"index\""));
    }

    #[test]
    fn test_sheet_names() {
        let mut used = AHashSet::new();
        assert_eq!(sheet_name("Article", "t_article", &mut used), "Article");
        assert_eq!(sheet_name("", "t_article", &mut used), "t_article");
        assert_eq!(sheet_name("article", "t_x", &mut used), "article~2");
        assert_eq!(sheet_name("a/b: [c]", "t", &mut used), "a_b_ _c_");
        assert_eq!(sheet_name("Users\nAccounts", "t", &mut used), "Users");

        let long = "x".repeat(40);
        assert_eq!(sheet_name(&long, "t", &mut used).chars().count(), MAX_SHEET_NAME);
        let again = sheet_name(&long, "t", &mut used);
        assert_eq!(again.chars().count(), MAX_SHEET_NAME);
        assert!(again.ends_with("~2"));
    }

    #[test]
    fn test_internal_link_quotes() {
        assert_eq!(internal_link("Bob's"), "internal:'Bob''s'!A1");
    }
}
