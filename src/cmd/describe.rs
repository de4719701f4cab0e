use super::{build_schema, load_config, output_path, SourceArgs};
use crate::diagram::build_diagram;
use crate::render::{
    render_or_source, to_dot, to_html, to_json, to_xlsx, Erd, GraphvizRenderer, HtmlPage,
    OutputFormat, Rendered,
};
use anyhow::Context;
use std::fs;
use std::path::PathBuf;

pub fn run(
    source: SourceArgs,
    outdir: PathBuf,
    format: OutputFormat,
    title: Option<String>,
    dot_binary: PathBuf,
) -> anyhow::Result<()> {
    let config = load_config(&source, title)?;
    let schema = build_schema(&source.source, &config)?;
    let renderer = GraphvizRenderer::new(dot_binary);

    fs::create_dir_all(&outdir)
        .with_context(|| format!("Failed to create output directory: {}", outdir.display()))?;

    let (path, bytes) = match format {
        OutputFormat::Html => {
            // the embedded diagram only shows tables that take part in a relation
            let diagram = build_diagram(&schema, &config.diagram_options(true));
            let erd = match render_or_source(&renderer, &to_dot(&diagram), "svg") {
                Rendered::Image(svg) => Erd::Svg(String::from_utf8_lossy(&svg).into_owned()),
                Rendered::Source(dot) => Erd::Dot(dot),
            };
            let page = HtmlPage {
                title: config.title.clone().unwrap_or_default(),
                vars: config.vars.clone(),
                erd: Some(erd),
            };
            (
                output_path(&outdir, &schema, format.extension()),
                to_html(&schema, &page).into_bytes(),
            )
        }
        OutputFormat::Json => (
            output_path(&outdir, &schema, format.extension()),
            to_json(&schema).into_bytes(),
        ),
        OutputFormat::Xlsx => (
            output_path(&outdir, &schema, format.extension()),
            to_xlsx(&schema)?,
        ),
        OutputFormat::Dot => {
            let diagram = build_diagram(&schema, &config.diagram_options(false));
            (
                output_path(&outdir, &schema, format.extension()),
                to_dot(&diagram).into_bytes(),
            )
        }
        OutputFormat::Svg | OutputFormat::Png | OutputFormat::Pdf => {
            let diagram = build_diagram(&schema, &config.diagram_options(false));
            match render_or_source(&renderer, &to_dot(&diagram), format.extension()) {
                Rendered::Image(bytes) => (output_path(&outdir, &schema, format.extension()), bytes),
                Rendered::Source(dot) => {
                    eprintln!(
                        "Could not render {}; writing DOT source instead (is Graphviz installed?)",
                        format
                    );
                    (
                        output_path(&outdir, &schema, OutputFormat::Dot.extension()),
                        dot.into_bytes(),
                    )
                }
            }
        }
    };

    fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    eprintln!("Written to: {}", path.display());
    Ok(())
}
