pub mod apply;
pub mod invert;
pub mod replay;
pub mod transform;

pub use apply::{apply, ApplyArgs};
pub use invert::{invert, InvertArgs};
pub use replay::{replay, ReplayArgs};
pub use transform::{transform, TransformArgs};

use anyhow::{Context, Result};
use flowdoc_editor::{FlowContent, Operation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Read a JSON value from a file, or from stdin when the path is `-`
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let source = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?
    };
    serde_json::from_str(&source).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Document content given either as JSON or as plain text
pub(crate) fn load_content(path: Option<&Path>, text: Option<&str>) -> Result<FlowContent> {
    match (path, text) {
        (Some(path), _) => read_json(path),
        (None, Some(text)) => Ok(FlowContent::from_text(text)),
        (None, None) => Ok(FlowContent::new()),
    }
}

/// One operation, or an array of them applied in order
pub(crate) fn load_operations(path: &Path) -> Result<Vec<Operation>> {
    let value: serde_json::Value = read_json(path)?;
    let ops = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value)?,
        value => vec![serde_json::from_value(value)?],
    };
    Ok(ops)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
