//! Writing diagrams to disk.
//!
//! The output format follows the file extension:
//!
//! - `.json` - the [`Diagram`] as pretty-printed JSON
//! - `.dot` / `.gv` - Graphviz DOT source
//! - anything else (`.png`, `.svg`, `.pdf`, ...) - an image produced by the
//!   Graphviz `dot` executable from the DOT source

pub mod dot;
pub mod json;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use log::{info, warn};

use crate::render::Diagram;

/// Image format used when the output path has no extension.
const DEFAULT_IMAGE_FORMAT: &str = "png";

/// Export format options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportFormat {
    /// JSON format - machine-readable node/edge lists
    Json,
    /// Graphviz DOT source
    Dot,
    /// Image rendered by Graphviz, e.g. "png" or "svg"
    Image(String),
}

impl ExportFormat {
    /// Picks the format from a path's extension.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::path::Path;
    /// use nugraph::export::ExportFormat;
    ///
    /// assert_eq!(ExportFormat::from_path(Path::new("deps.JSON")), ExportFormat::Json);
    /// assert_eq!(ExportFormat::from_path(Path::new("deps.gv")), ExportFormat::Dot);
    /// assert_eq!(ExportFormat::from_path(Path::new("graph.png")), ExportFormat::Image("png".into()));
    /// ```
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("json") => ExportFormat::Json,
            Some("dot") | Some("gv") => ExportFormat::Dot,
            Some(ext) => ExportFormat::Image(ext.to_string()),
            None => ExportFormat::Image(DEFAULT_IMAGE_FORMAT.to_string()),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Dot => write!(f, "dot"),
            ExportFormat::Image(ext) => write!(f, "{} image", ext),
        }
    }
}

/// Errors that can occur while writing a diagram.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Writing the output file failed.
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Graphviz ran but rejected the input or the requested format.
    #[error("graphviz failed to render {path}: {message}")]
    Graphviz { path: PathBuf, message: String },
}

/// Trait for exporters.
pub trait Exporter {
    /// Export the diagram to the given writer.
    fn export<W: Write>(&self, diagram: &Diagram, writer: &mut W) -> io::Result<()>;
}

/// Export a diagram in a text format to a writer.
///
/// Images are written as their DOT source.
pub fn export<W: Write>(format: &ExportFormat, diagram: &Diagram, writer: &mut W) -> io::Result<()> {
    match format {
        ExportFormat::Json => json::JsonExporter.export(diagram, writer),
        ExportFormat::Dot | ExportFormat::Image(_) => dot::DotExporter.export(diagram, writer),
    }
}

/// Export a diagram to a string.
pub fn export_to_string(format: &ExportFormat, diagram: &Diagram) -> io::Result<String> {
    let mut buffer = Vec::new();
    export(format, diagram, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Writes `diagram` to `path` in the format its extension asks for.
///
/// Returns the path actually written. When an image is requested but the
/// Graphviz `dot` executable cannot be started, the DOT source is written
/// next to `path` with a `.dot` extension instead.
pub fn write_diagram(diagram: &Diagram, path: &Path) -> Result<PathBuf, ExportError> {
    let format = ExportFormat::from_path(path);
    info!("Writing {} to {}", format, path.display());

    match &format {
        ExportFormat::Json | ExportFormat::Dot => {
            write_text(&format, diagram, path)?;
            Ok(path.to_path_buf())
        }
        ExportFormat::Image(ext) => {
            let source = dot::to_dot(diagram);
            match run_graphviz(&source, ext, path) {
                Ok(()) => Ok(path.to_path_buf()),
                Err(GraphvizFailure::Missing(err)) => {
                    let fallback = path.with_extension("dot");
                    warn!(
                        "Cannot run graphviz `dot` ({}); writing DOT source to {} instead",
                        err,
                        fallback.display()
                    );
                    write_text(&ExportFormat::Dot, diagram, &fallback)?;
                    Ok(fallback)
                }
                Err(GraphvizFailure::Rejected(message)) => Err(ExportError::Graphviz {
                    path: path.to_path_buf(),
                    message,
                }),
            }
        }
    }
}

fn write_text(format: &ExportFormat, diagram: &Diagram, path: &Path) -> Result<(), ExportError> {
    let io_error = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let content = export_to_string(format, diagram).map_err(io_error)?;
    fs::write(path, content).map_err(io_error)
}

enum GraphvizFailure {
    /// The executable could not be started
    Missing(io::Error),
    /// The executable ran and reported an error
    Rejected(String),
}

fn run_graphviz(source: &str, format: &str, path: &Path) -> Result<(), GraphvizFailure> {
    let child = Command::new("dot")
        .arg(format!("-T{}", format))
        .arg("-o")
        .arg(path)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(GraphvizFailure::Missing)?;

    feed_and_wait(child, source)
}

/// Writes `source` to the child's stdin and always reaps the child.
fn feed_and_wait(mut child: Child, source: &str) -> Result<(), GraphvizFailure> {
    // stdin is closed at the end of this statement so the child sees EOF
    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(source.as_bytes()),
        None => Ok(()),
    };

    let output = child
        .wait_with_output()
        .map_err(|e| GraphvizFailure::Rejected(e.to_string()))?;
    if !output.status.success() {
        return Err(GraphvizFailure::Rejected(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    written.map_err(|e| GraphvizFailure::Rejected(format!("cannot send DOT source: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DependencyGraph, PackageVersion};
    use crate::render::render_diagram;

    fn diagram() -> Diagram {
        let foo = PackageVersion::new("Foo", "1.0.0");
        let mut graph = DependencyGraph::new(foo.clone());
        graph.discover(&foo, "Bar", "latest", PackageVersion::new("Bar", "2.0.0"));
        render_diagram(&graph)
    }

    #[test]
    fn test_export_format_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("a.json")), ExportFormat::Json);
        assert_eq!(ExportFormat::from_path(Path::new("a.DOT")), ExportFormat::Dot);
        assert_eq!(
            ExportFormat::from_path(Path::new("a.svg")),
            ExportFormat::Image("svg".into())
        );
        assert_eq!(
            ExportFormat::from_path(Path::new("graph")),
            ExportFormat::Image("png".into())
        );
    }

    #[test]
    fn test_export_format_display() {
        assert_eq!(format!("{}", ExportFormat::Json), "json");
        assert_eq!(format!("{}", ExportFormat::Dot), "dot");
        assert_eq!(format!("{}", ExportFormat::Image("png".into())), "png image");
    }

    #[test]
    fn test_write_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");

        let written = write_diagram(&diagram(), &path).unwrap();
        assert_eq!(written, path);

        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["root"], "Foo@1.0.0");
    }

    #[test]
    fn test_write_dot_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.gv");

        write_diagram(&diagram(), &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("digraph dependencies {"));
    }

    #[test]
    fn test_image_produces_image_or_dot_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.png");

        // depends on whether graphviz is installed
        match write_diagram(&diagram(), &path) {
            Ok(written) if written == path => assert!(path.exists()),
            Ok(written) => {
                assert_eq!(written, dir.path().join("graph.dot"));
                assert!(fs::read_to_string(written).unwrap().contains("Bar@2.0.0"));
            }
            Err(err) => panic!("unexpected export failure: {}", err),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_child_that_ignores_input_is_reaped() {
        // `true` exits without reading, so a large write hits a closed pipe
        let child = Command::new("true")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let source = "x".repeat(4 * 1024 * 1024);

        match feed_and_wait(child, &source) {
            Err(GraphvizFailure::Rejected(message)) => {
                assert!(message.starts_with("cannot send DOT source"))
            }
            Err(GraphvizFailure::Missing(err)) => panic!("unexpected spawn failure: {}", err),
            Ok(()) => panic!("write to a closed pipe succeeded"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_child_failure_reports_stderr() {
        let child = Command::new("sh")
            .args(["-c", "cat > /dev/null; echo 'syntax error in line 1' >&2; exit 1"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        match feed_and_wait(child, "digraph dependencies {") {
            Err(GraphvizFailure::Rejected(message)) => {
                assert_eq!(message, "syntax error in line 1")
            }
            _ => panic!("expected the child's stderr"),
        }
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("graph.json");

        assert!(matches!(
            write_diagram(&diagram(), &path),
            Err(ExportError::Io { .. })
        ));
    }
}
