//! Rendering through the Graphviz `dot` binary.

use super::DiagramRenderer;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Spawns `dot -T<format>` with the source on stdin and reads the image from stdout
#[derive(Debug, Clone)]
pub struct GraphvizRenderer {
    binary: PathBuf,
}

impl Default for GraphvizRenderer {
    fn default() -> Self {
        Self::new("dot")
    }
}

impl GraphvizRenderer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, source: &str, format: &str) -> std::io::Result<std::process::Output> {
        let mut child = Command::new(&self.binary)
            .arg(format!("-T{}", format))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // stdin is closed when the handle drops, before waiting
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(source.as_bytes()),
            None => Ok(()),
        };
        let output = child.wait_with_output()?;
        match written {
            // a non-zero exit takes precedence over a broken pipe
            Err(e) if output.status.success() => Err(e),
            _ => Ok(output),
        }
    }
}

impl DiagramRenderer for GraphvizRenderer {
    fn render(&self, source: &str, format: &str) -> Option<Vec<u8>> {
        debug!(binary = %self.binary.display(), format, "running graphviz");
        match self.run(source, format) {
            Ok(output) if output.status.success() => Some(output.stdout),
            Ok(output) => {
                warn!(
                    status = %output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "graphviz exited with failure"
                );
                None
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(binary = %self.binary.display(), "graphviz binary not found");
                None
            }
            Err(e) => {
                warn!(error = %e, "failed to run graphviz");
                None
            }
        }
    }
}
