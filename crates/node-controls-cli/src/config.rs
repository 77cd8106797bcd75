//! Codec configuration loaded from a JSON file.
//!
//! Fields missing from the file keep their defaults, so `{}` is a valid
//! configuration. Command-line flags are applied on top by the caller.

use std::path::Path;

use node_controls_core::CodecConfig;

use crate::error::{CliError, Result};

/// Load the codec configuration from `path`, or the defaults if there is none.
///
/// # Errors
///
/// Returns `CliError::Io` if the file cannot be read and
/// `CliError::InvalidConfig` if it is not a valid configuration.
pub fn load_codec_config(path: Option<&Path>) -> Result<CodecConfig> {
    let Some(path) = path else {
        return Ok(CodecConfig::default());
    };

    let bytes = std::fs::read(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: CodecConfig =
        serde_json::from_slice(&bytes).map_err(|source| CliError::InvalidConfig {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::debug!(
        path = %path.display(),
        format = %config.format,
        max_payload_bytes = config.max_payload_bytes,
        "loaded codec config"
    );
    Ok(config)
}
