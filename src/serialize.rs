//! [`SpielZettelFileInfo`] and saved state → JSON serialization.

use crate::error::SerializeError;
use crate::state::prune_states;
use crate::types::{ElementState, SpielZettelFileInfo};

/// Serialize a sheet to pretty-printed JSON.
///
/// Fields keep declaration order; integral numbers are written without a
/// fraction.
pub fn serialize(sheet: &SpielZettelFileInfo) -> Result<String, SerializeError> {
    serde_json::to_string_pretty(sheet).map_err(|e| SerializeError {
        message: format!("failed to serialize sheet: {}", e),
    })
}

/// Serialize a sheet to YAML.
#[cfg(feature = "yaml")]
pub fn serialize_yaml(sheet: &SpielZettelFileInfo) -> Result<String, SerializeError> {
    // Convert to serde_json::Value first for consistent field ordering
    let value = serde_json::to_value(sheet).map_err(|e| SerializeError {
        message: format!("failed to convert sheet to JSON value: {}", e),
    })?;

    serde_saphyr::to_string(&value).map_err(|e| SerializeError {
        message: format!("failed to serialize to YAML: {}", e),
    })
}

/// Serialize a state list for persistence, pruned of default-valued fields.
pub fn serialize_states(states: &[ElementState]) -> Result<String, SerializeError> {
    serde_json::to_string(&prune_states(states)).map_err(|e| SerializeError {
        message: format!("failed to serialize state: {}", e),
    })
}
