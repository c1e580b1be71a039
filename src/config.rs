//! Recorder configuration
//!
//! Everything here has a default, so a config file is optional. A file only
//! needs the keys it wants to change:
//!
//! ```toml
//! initial-capacity = 8192
//! process-identifier = "asset-pipeline"
//! process-version = "2.3.0"
//! context-label = "import"
//! display-time-unit = "ns"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TraceError;

/// Events pre-allocated per buffer.
pub const DEFAULT_CAPACITY: usize = 2048;

/// Unit trace viewers use when displaying timestamps.
///
/// Recorded timestamps are always microseconds; this only affects display.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DisplayTimeUnit {
    #[default]
    Ms,
    Ns,
}

/// Settings for buffers and the formatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TraceConfig {
    /// Events pre-allocated when a buffer is created
    pub initial_capacity: usize,

    /// Identifier used in the `process_name` metadata event (defaults to the executable name)
    pub process_identifier: Option<String>,

    /// Version used in the `process_name` metadata event
    pub process_version: Option<String>,

    /// Value of the `process_labels` metadata event, naming the active context
    pub context_label: Option<String>,

    pub display_time_unit: DisplayTimeUnit,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            process_identifier: None,
            process_version: None,
            context_label: None,
            display_time_unit: DisplayTimeUnit::default(),
        }
    }
}

impl TraceConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, TraceError> {
        if !path.exists() {
            log::debug!("No trace config at {}", path.display());
            return Ok(None);
        }

        let contents = std::fs::read_to_string(path).map_err(|e| TraceError::Config {
            path: path.to_path_buf(),
            message: format!("Failed to read config file: {}", e),
        })?;

        let config = Self::parse(&contents).map_err(|message| TraceError::Config {
            path: path.to_path_buf(),
            message,
        })?;

        log::debug!("Loaded trace config from {}", path.display());
        Ok(Some(config))
    }

    fn parse(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| format!("Failed to parse TOML: {}", e))
    }
}
