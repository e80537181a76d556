//! Structured content conversion

use crate::error::{PipelineError, Result};

/// Convert a JSON document to its YAML rendering
///
/// Used by kubeconfig persistence: scripts hand structured content over as
/// JSON, while kubeconfig files are conventionally YAML.
pub fn json_to_yaml(buf: &[u8]) -> Result<Vec<u8>> {
    let value: serde_json::Value = serde_json::from_slice(buf)
        .map_err(|e| PipelineError::Conversion(format!("invalid JSON: {}", e)))?;
    let out = serde_yaml::to_string(&value)
        .map_err(|e| PipelineError::Conversion(format!("cannot render YAML: {}", e)))?;
    Ok(out.into_bytes())
}
