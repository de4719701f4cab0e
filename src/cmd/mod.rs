mod describe;
mod dot;
mod schema;

use crate::catalog::introspector_for;
use crate::config::{ConfigOverrides, DescribeConfig};
use crate::diagram::ColumnMode;
use crate::render::OutputFormat;
use crate::schema::{Hooks, Schema};
use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "db-describer")]
#[command(version)]
#[command(
    about = "Describe a database schema as HTML, JSON and ER diagrams",
    long_about = None
)]
pub struct Cli {
    /// Verbose logging (debug level; RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the catalog comes from and how it is filtered
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// DSN (duckdb:///path/file.duckdb) or catalog file (.sql[.gz|.bz2|.xz|.zst], .yaml, .json)
    pub source: String,

    /// Include pattern (comma-separated regexes, repeatable)
    #[arg(short, long)]
    pub include: Vec<String>,

    /// Exclude pattern (comma-separated regexes, repeatable)
    #[arg(short, long)]
    pub exclude: Vec<String>,

    /// Comment delimiter between logical name and summary
    #[arg(short = 'l', long)]
    pub delimiter: Option<String>,

    /// Diagram columns: related, all
    #[arg(short, long)]
    pub columns: Option<ColumnMode>,

    /// YAML configuration file
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write schema documentation to a directory
    Describe {
        #[command(flatten)]
        source: SourceArgs,

        /// Output directory
        #[arg(default_value = ".")]
        outdir: PathBuf,

        /// Output format: html, dot, json, xlsx, svg, png, pdf
        #[arg(short, long, default_value = "html")]
        format: OutputFormat,

        /// Page title (defaults to the database name)
        #[arg(short, long)]
        title: Option<String>,

        /// Graphviz binary used for svg/png/pdf and the HTML diagram
        #[arg(long, default_value = "dot")]
        dot_binary: PathBuf,
    },

    /// Print the ER diagram as Graphviz DOT
    Dot {
        #[command(flatten)]
        source: SourceArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Hide tables without any foreign or reference key
        #[arg(long)]
        skip_no_relation: bool,
    },

    /// Print JSON Schemas of the catalog snapshot and JSON output formats
    Schema {
        /// Schema name (catalog, config, describe); all when omitted
        name: Option<String>,

        /// List available schema names
        #[arg(long)]
        list: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Describe {
            source,
            outdir,
            format,
            title,
            dot_binary,
        } => describe::run(source, outdir, format, title, dot_binary),
        Commands::Dot {
            source,
            output,
            skip_no_relation,
        } => dot::run(source, output, skip_no_relation),
        Commands::Schema { name, list } => schema::run(name, list),
        Commands::Completions { shell } => {
            generate(
                shell,
                &mut Cli::command(),
                "db-describer",
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}

/// Load the configuration file (if any) and merge command-line values over it
fn load_config(source: &SourceArgs, title: Option<String>) -> anyhow::Result<DescribeConfig> {
    let mut config = match &source.config {
        Some(path) => DescribeConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => DescribeConfig::default(),
    };
    config.merge(ConfigOverrides {
        include: source.include.clone(),
        exclude: source.exclude.clone(),
        delimiter: source.delimiter.clone(),
        columns: source.columns,
        title,
    });
    config.validate()?;
    Ok(config)
}

/// Introspect the source and build the schema
fn build_schema(source: &str, config: &DescribeConfig) -> anyhow::Result<Schema> {
    let builder = config.schema_builder(Hooks::new())?;
    let introspector = introspector_for(source)?;
    let catalog = introspector
        .introspect()
        .with_context(|| format!("Failed to read catalog from {}", source))?;
    info!(
        database = %catalog.database,
        tables = catalog.tables.len(),
        "introspected catalog"
    );
    Ok(builder.build(catalog)?)
}

/// Output file stem for a schema
fn output_name(schema: &Schema) -> &str {
    if schema.database.is_empty() {
        "schema"
    } else {
        &schema.database
    }
}

fn output_path(outdir: &Path, schema: &Schema, extension: &str) -> PathBuf {
    outdir.join(format!("{}.{}", output_name(schema), extension))
}
