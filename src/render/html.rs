//! Self-contained HTML documentation page.

use crate::schema::{Column, Index, Schema, Table};
use std::collections::BTreeMap;
use std::fmt::Write;

/// The ER diagram embedded into the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Erd {
    /// Rendered SVG markup
    Svg(String),
    /// DOT source, shown when rendering degraded
    Dot(String),
}

/// Page-level inputs besides the schema
#[derive(Debug, Clone, Default)]
pub struct HtmlPage {
    pub title: String,
    /// Free-form key/value pairs shown in the page header
    pub vars: BTreeMap<String, String>,
    pub erd: Option<Erd>,
}

/// Highlights a table's cluster, columns and edges in the embedded SVG while
/// the table's TOC entry or cluster is hovered; double-click jumps to the table
const ERD_SCRIPT: &str = r#"<script>
(function () {
  const erd = document.querySelector('#erd .erd');
  if (!erd) {
    return;
  }
  const highlight = function (name, on) {
    erd.querySelectorAll('.table-' + CSS.escape(name)).forEach(function (e) {
      e.classList.toggle('active', on);
    });
  };
  const hover = function (element, name) {
    element.addEventListener('mouseover', function () { highlight(name, true); });
    element.addEventListener('mouseout', function () { highlight(name, false); });
  };
  document.querySelectorAll('[data-table-name]').forEach(function (link) {
    hover(link, link.dataset.tableName);
  });
  erd.querySelectorAll('g.cluster[id^="relationship:table-"]').forEach(function (g) {
    const name = g.id.substring('relationship:table-'.length);
    hover(g, name);
    g.addEventListener('dblclick', function () { location.hash = 'table-' + name; });
  });
})();
</script>
"#;

/// Generate the HTML page
pub fn to_html(schema: &Schema, page: &HtmlPage) -> String {
    let title = if page.title.is_empty() {
        schema.database.as_str()
    } else {
        page.title.as_str()
    };

    let mut body = String::new();
    write_header(&mut body, title, &page.vars);
    write_toc(&mut body, schema);
    if let Some(erd) = &page.erd {
        write_erd(&mut body, erd);
    }
    for (i, table) in schema.tables.iter().enumerate() {
        write_table(&mut body, i + 1, table);
    }
    write_views(&mut body, schema);
    write_routines(&mut body, schema);
    write_events(&mut body, schema);
    if matches!(page.erd, Some(Erd::Svg(_))) {
        body.push_str(ERD_SCRIPT);
    }

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
  <style>
    body {{ font-family: -apple-system, BlinkMacSystemFont, sans-serif; margin: 2em; color: #1f2328; }}
    h1, h2, h3 {{ font-weight: 600; }}
    section {{ margin-bottom: 2.5em; }}
    table {{ border-collapse: collapse; margin: 0.5em 0 1em; }}
    th, td {{ border: 1px solid #d0d7de; padding: 4px 8px; text-align: left; vertical-align: top; }}
    th {{ background: #f6f8fa; }}
    .summary {{ white-space: pre-wrap; color: #656d76; }}
    .erd {{ overflow: auto; border: 1px solid #d0d7de; padding: 1em; }}
    pre {{ background: #f6f8fa; padding: 1em; overflow: auto; }}
    .erd .active path, .erd .active polygon {{ stroke: #d73a49; stroke-width: 2; }}
  </style>
</head>
<body>
{body}</body>
</html>
"##,
        title = escape_html(title),
        body = body
    )
}

fn write_header(out: &mut String, title: &str, vars: &BTreeMap<String, String>) {
    let _ = writeln!(out, "<header>\n<h1>{}</h1>", escape_html(title));
    if !vars.is_empty() {
        out.push_str("<table class=\"vars\">\n");
        for (key, value) in vars {
            let _ = writeln!(
                out,
                "<tr><th>{}</th><td>{}</td></tr>",
                escape_html(key),
                escape_html(value)
            );
        }
        out.push_str("</table>\n");
    }
    out.push_str("</header>\n");
}

fn write_toc(out: &mut String, schema: &Schema) {
    out.push_str("<nav id=\"toc\">\n<h2>Contents</h2>\n<ul>\n");
    let groups: [(&str, &str, Vec<(&str, &str)>); 4] = [
        (
            "Tables",
            "table",
            schema
                .tables
                .iter()
                .map(|t| (t.name.as_str(), t.logical_name.as_str()))
                .collect(),
        ),
        (
            "Views",
            "view",
            schema
                .views
                .iter()
                .map(|v| (v.name.as_str(), v.logical_name.as_str()))
                .collect(),
        ),
        (
            "Routines",
            "routine",
            schema
                .routines
                .iter()
                .map(|r| (r.name.as_str(), r.logical_name.as_str()))
                .collect(),
        ),
        (
            "Events",
            "event",
            schema
                .events
                .iter()
                .map(|e| (e.name.as_str(), e.logical_name.as_str()))
                .collect(),
        ),
    ];
    for (heading, prefix, entries) in groups {
        if entries.is_empty() {
            continue;
        }
        let _ = writeln!(out, "<li>{}<ul>", heading);
        for (name, logical_name) in entries {
            // table entries drive the diagram highlighting
            let data = if prefix == "table" {
                format!(" data-table-name=\"{}\"", escape_html(name))
            } else {
                String::new()
            };
            let _ = writeln!(
                out,
                "<li><a href=\"#{}-{}\"{}>{}</a> {}</li>",
                prefix,
                escape_html(name),
                data,
                escape_html(name),
                escape_html(logical_name)
            );
        }
        out.push_str("</ul></li>\n");
    }
    out.push_str("</ul>\n</nav>\n");
}

fn write_erd(out: &mut String, erd: &Erd) {
    out.push_str("<section id=\"erd\">\n<h2>ER Diagram</h2>\n<div class=\"erd\">\n");
    match erd {
        Erd::Svg(svg) => {
            // strip the XML prolog and doctype graphviz emits before <svg
            let start = svg.find("<svg").unwrap_or(0);
            out.push_str(&svg[start..]);
            out.push('\n');
        }
        Erd::Dot(dot) => {
            let _ = writeln!(out, "<pre class=\"dot\">{}</pre>", escape_html(dot));
        }
    }
    out.push_str("</div>\n</section>\n");
}

fn write_table(out: &mut String, no: usize, table: &Table) {
    let _ = writeln!(
        out,
        "<section id=\"table-{}\">\n<h2>{}. {} {}</h2>",
        escape_html(&table.name),
        no,
        escape_html(&table.name),
        escape_html(&table.logical_name)
    );
    write_summary(out, &table.summary);

    let options: Vec<String> = [
        ("Engine", &table.engine),
        ("Collation", &table.collation),
        ("Row format", &table.row_format),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.as_ref().map(|v| format!("{}: {}", label, v)))
    .collect();
    if !options.is_empty() {
        let _ = writeln!(out, "<p class=\"options\">{}</p>", escape_html(&options.join(", ")));
    }

    write_columns(out, &table.columns);
    write_indexes(out, &table.indexes);

    if !table.foreign_keys.is_empty() {
        out.push_str("<h3>Foreign keys</h3>\n<table>\n<tr><th>No</th><th>Name</th><th>Columns</th><th>Referenced table</th><th>Referenced columns</th><th>On update</th><th>On delete</th></tr>\n");
        for (i, fk) in table.foreign_keys.values().enumerate() {
            let _ = writeln!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td><a href=\"#table-{}\">{}</a></td><td>{}</td><td>{}</td><td>{}</td></tr>",
                i + 1,
                escape_html(&fk.name),
                escape_html(&fk.local_columns.join(", ")),
                escape_html(&fk.foreign_table),
                escape_html(&fk.foreign_table),
                escape_html(&fk.foreign_columns.join(", ")),
                escape_html(fk.on_update.as_deref().unwrap_or("")),
                escape_html(fk.on_delete.as_deref().unwrap_or(""))
            );
        }
        out.push_str("</table>\n");
    }

    if !table.reference_keys.is_empty() {
        out.push_str("<h3>Referenced by</h3>\n<table>\n<tr><th>No</th><th>Name</th><th>Columns</th><th>Referencing table</th><th>Referencing columns</th></tr>\n");
        for (i, fk) in table.reference_keys.values().enumerate() {
            let _ = writeln!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td><a href=\"#table-{}\">{}</a></td><td>{}</td></tr>",
                i + 1,
                escape_html(&fk.name),
                escape_html(&fk.foreign_columns.join(", ")),
                escape_html(&fk.local_table),
                escape_html(&fk.local_table),
                escape_html(&fk.local_columns.join(", "))
            );
        }
        out.push_str("</table>\n");
    }

    if !table.triggers.is_empty() {
        out.push_str("<h3>Triggers</h3>\n<table>\n<tr><th>Name</th><th>Timing</th><th>Event</th><th>Statement</th></tr>\n");
        for trigger in &table.triggers {
            let _ = writeln!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td><pre>{}</pre></td></tr>",
                escape_html(&trigger.name),
                escape_html(&trigger.timing),
                escape_html(&trigger.event),
                escape_html(&trigger.statement)
            );
        }
        out.push_str("</table>\n");
    }

    out.push_str("</section>\n");
}

fn write_columns(out: &mut String, columns: &[Column]) {
    if columns.is_empty() {
        return;
    }
    out.push_str("<h3>Columns</h3>\n<table>\n<tr><th>No</th><th>Name</th><th>Logical name</th><th>Type</th><th>Nullable</th><th>Default</th><th>Constraints</th><th>Summary</th></tr>\n");
    for (i, column) in columns.iter().enumerate() {
        let mut type_text = column.display_type().to_string();
        if column.unsigned && !type_text.to_lowercase().contains("unsigned") {
            type_text.push_str(" unsigned");
        }
        if let Some(generated) = &column.generated {
            type_text.push_str(&format!(" AS ({})", generated));
        }
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"summary\">{}</td></tr>",
            i + 1,
            escape_html(&column.name),
            escape_html(&column.logical_name),
            escape_html(&type_text),
            if column.not_null { "" } else { "YES" },
            escape_html(column.default.as_deref().unwrap_or("")),
            escape_html(&column.constraints.join(", ")),
            escape_html(&column.summary)
        );
    }
    out.push_str("</table>\n");
}

fn write_indexes(out: &mut String, indexes: &[Index]) {
    if indexes.is_empty() {
        return;
    }
    out.push_str("<h3>Indexes</h3>\n<table>\n<tr><th>No</th><th>Name</th><th>Columns</th><th>Unique</th><th>Type</th></tr>\n");
    for (i, index) in indexes.iter().enumerate() {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            i + 1,
            escape_html(&index.name),
            escape_html(&index.columns.join(", ")),
            if index.unique { "YES" } else { "" },
            escape_html(&index.flags.join(", "))
        );
    }
    out.push_str("</table>\n");
}

fn write_views(out: &mut String, schema: &Schema) {
    for (i, view) in schema.views.iter().enumerate() {
        let _ = writeln!(
            out,
            "<section id=\"view-{}\">\n<h2>View {}. {} {}</h2>",
            escape_html(&view.name),
            i + 1,
            escape_html(&view.name),
            escape_html(&view.logical_name)
        );
        write_summary(out, &view.summary);
        let _ = writeln!(
            out,
            "<p>Updatable: {}{}</p>",
            if view.updatable { "YES" } else { "NO" },
            view.check_option
                .as_deref()
                .map(|c| format!(", check option: {}", escape_html(c)))
                .unwrap_or_default()
        );
        write_columns(out, &view.columns);
        write_indexes(out, &view.indexes);
        let _ = writeln!(out, "<pre class=\"sql\">{}</pre>\n</section>", escape_html(&view.sql));
    }
}

fn write_routines(out: &mut String, schema: &Schema) {
    for (i, routine) in schema.routines.iter().enumerate() {
        let _ = writeln!(
            out,
            "<section id=\"routine-{}\">\n<h2>{} {}. {} {}</h2>",
            escape_html(&routine.name),
            escape_html(&routine.kind),
            i + 1,
            escape_html(&routine.name),
            escape_html(&routine.logical_name)
        );
        write_summary(out, &routine.summary);
        let _ = writeln!(
            out,
            "<p>Parameters: <code>{}</code></p>",
            escape_html(&routine.parameters)
        );
        if let Some(return_type) = &routine.return_type {
            let _ = writeln!(out, "<p>Returns: <code>{}</code></p>", escape_html(return_type));
        }
        let _ = writeln!(
            out,
            "<pre class=\"sql\">{}</pre>\n</section>",
            escape_html(&routine.statement)
        );
    }
}

fn write_events(out: &mut String, schema: &Schema) {
    for (i, event) in schema.events.iter().enumerate() {
        let _ = writeln!(
            out,
            "<section id=\"event-{}\">\n<h2>Event {}. {} {}</h2>",
            escape_html(&event.name),
            i + 1,
            escape_html(&event.name),
            escape_html(&event.logical_name)
        );
        write_summary(out, &event.summary);
        let schedule: Vec<String> = [
            ("Every", &event.interval),
            ("Since", &event.since),
            ("Until", &event.until),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.as_ref().map(|v| format!("{} {}", label, v)))
        .collect();
        if !schedule.is_empty() {
            let _ = writeln!(out, "<p>{}</p>", escape_html(&schedule.join(", ")));
        }
        let _ = writeln!(
            out,
            "<pre class=\"sql\">{}</pre>\n</section>",
            escape_html(&event.statement)
        );
    }
}

fn write_summary(out: &mut String, summary: &str) {
    if !summary.is_empty() {
        let _ = writeln!(out, "<p class=\"summary\">{}</p>", escape_html(summary));
    }
}

/// Escape a string for HTML text and attribute values
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
