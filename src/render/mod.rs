//! Output renderers for the normalized schema and its diagram.

pub mod dot;
pub mod graphviz;
pub mod html;
pub mod json;
pub mod xlsx;

pub use dot::to_dot;
pub use graphviz::GraphvizRenderer;
pub use html::{to_html, Erd, HtmlPage};
pub use json::{build_describe_json, to_json, DescribeJson};
pub use xlsx::to_xlsx;

use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Output format of the `describe` command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Self-contained HTML documentation page
    #[default]
    Html,
    /// Graphviz DOT source of the ER diagram
    Dot,
    /// JSON document of the normalized schema
    Json,
    /// Spreadsheet workbook: table index plus one sheet per table
    Xlsx,
    /// ER diagram rendered by Graphviz
    Svg,
    Png,
    Pdf,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" | "htm" => Ok(OutputFormat::Html),
            "dot" | "gv" | "graphviz" => Ok(OutputFormat::Dot),
            "json" => Ok(OutputFormat::Json),
            "xlsx" | "excel" => Ok(OutputFormat::Xlsx),
            "svg" => Ok(OutputFormat::Svg),
            "png" => Ok(OutputFormat::Png),
            "pdf" => Ok(OutputFormat::Pdf),
            _ => Err(format!(
                "Unknown format: {}. Valid options: html, dot, json, xlsx, svg, png, pdf",
                s
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl OutputFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Dot => "dot",
            OutputFormat::Json => "json",
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
            OutputFormat::Pdf => "pdf",
        }
    }

    /// Whether the format needs an external diagram renderer
    pub fn is_rendered(&self) -> bool {
        matches!(self, OutputFormat::Svg | OutputFormat::Png | OutputFormat::Pdf)
    }
}

/// Turns diagram source into a rendered image
pub trait DiagramRenderer {
    /// Render `source` to `format` (`svg`, `png`, ...); `None` on any failure
    fn render(&self, source: &str, format: &str) -> Option<Vec<u8>>;
}

/// Result of [`render_or_source`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Output of the renderer in the requested format
    Image(Vec<u8>),
    /// Renderer failed; the unrendered diagram source
    Source(String),
}

impl Rendered {
    pub fn is_image(&self) -> bool {
        matches!(self, Rendered::Image(_))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Rendered::Image(bytes) => bytes,
            Rendered::Source(source) => source.into_bytes(),
        }
    }
}

/// Render `source`, degrading to the source itself when the renderer fails
pub fn render_or_source(renderer: &dyn DiagramRenderer, source: &str, format: &str) -> Rendered {
    match renderer.render(source, format) {
        Some(bytes) => Rendered::Image(bytes),
        None => {
            warn!(format, "diagram rendering failed, falling back to DOT source");
            Rendered::Source(source.to_string())
        }
    }
}
