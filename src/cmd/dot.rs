use super::{build_schema, load_config, SourceArgs};
use crate::diagram::build_diagram;
use crate::render::to_dot;
use anyhow::Context;
use std::fs;
use std::path::PathBuf;

pub fn run(source: SourceArgs, output: Option<PathBuf>, skip_no_relation: bool) -> anyhow::Result<()> {
    let config = load_config(&source, None)?;
    let schema = build_schema(&source.source, &config)?;
    let diagram = build_diagram(&schema, &config.diagram_options(skip_no_relation));
    let dot = to_dot(&diagram);

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, dot).with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Written to: {}", path.display());
        }
        None => print!("{}", dot),
    }
    Ok(())
}
