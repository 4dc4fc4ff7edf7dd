//! Input locations and telemetry - fixed for the lifetime of an environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the score and the performance record live.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Score source: a JSON file of precomputed measures, or a score MIDI
    /// file (`.mid` / `.midi`) that is split into bars on load.
    #[serde(default)]
    pub score: Option<PathBuf>,

    /// Performance MIDI file. Annotations are read from the same path with
    /// a `.csv` extension.
    #[serde(default)]
    pub record: Option<PathBuf>,
}

/// Telemetry and observability configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level (trace, debug, info, warn, error) or a full `EnvFilter`
    /// directive string.
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
