//! Fabric loading: builds the emulated adapter from a TOML or JSON file.

use std::path::Path;
use std::sync::Arc;

use sdnctl_core::{EmulatedFabric, FabricSpec};

use crate::error::CliError;

/// Parse a fabric description. `.json` files are JSON, anything else TOML.
pub fn load_spec(path: &Path) -> Result<FabricSpec, CliError> {
    let text = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let parsed = if is_json {
        serde_json::from_str(&text).map_err(|e| e.to_string())
    } else {
        toml::from_str(&text).map_err(|e| e.to_string())
    };
    parsed.map_err(|reason| CliError::FabricParse {
        path: path.display().to_string(),
        reason,
    })
}

pub fn load(path: &Path) -> Result<Arc<EmulatedFabric>, CliError> {
    let spec = load_spec(path)?;
    tracing::debug!(
        path = %path.display(),
        switches = spec.switches.len(),
        links = spec.links.len(),
        "fabric loaded"
    );
    Ok(Arc::new(EmulatedFabric::from_spec(spec)))
}
