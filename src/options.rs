//! Conversion settings, loadable from a JSON file.

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

/// Settings for [`SysmlToScxml`](crate::convert::SysmlToScxml).
///
/// Missing fields in a config file take their default value:
///
/// ```json
/// { "datamodel": "null", "emit_guards": false }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Value of the `datamodel` attribute; empty omits the attribute.
    pub datamodel: String,
    /// Emit `<invoke>` for a state's `do` action.
    pub emit_invokes: bool,
    /// Emit transition guards as `cond` attributes.
    pub emit_guards: bool,
    /// Set the root `name` attribute to the state machine name.
    pub include_name: bool,
    /// Reject transitions without a declared name.
    pub require_transition_names: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            datamodel: "ecmascript".to_string(),
            emit_invokes: true,
            emit_guards: true,
            include_name: false,
            require_transition_names: true,
        }
    }
}

impl ConvertOptions {
    pub fn from_json_file(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_std_path())
            .with_context(|| format!("Failed to read {}", path))?;
        serde_json::from_str(&text).with_context(|| format!("Failed to parse JSON {}", path))
    }
}
