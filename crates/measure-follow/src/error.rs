use std::path::PathBuf;

use thiserror::Error;

use crate::action::DistributionError;

/// Errors raised by the environment.
///
/// Tracking failures and natural completion are not errors; they end an
/// episode through [`crate::Termination`].
#[derive(Debug, Error)]
pub enum FollowError {
    #[error("window size {window_size} exceeds the {measures} measures in the score")]
    WindowTooLarge { window_size: usize, measures: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid score: {0}")]
    InvalidScore(String),

    #[error(transparent)]
    Config(#[from] follow_conf::ConfigError),

    #[error("performance record: {0}")]
    Record(#[from] midi_record::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("score JSON: {0}")]
    ScoreJson(#[from] serde_json::Error),

    #[error("invalid action distribution: {0}")]
    InvalidDistribution(#[from] DistributionError),

    #[error("unsupported render mode: {0}")]
    UnsupportedRenderMode(String),

    #[error("start measure {start} is outside {window:?} of a {total}-measure score")]
    StartMeasureOutOfRange {
        start: usize,
        window: std::ops::Range<usize>,
        total: usize,
    },
}

pub type Result<T> = std::result::Result<T, FollowError>;

pub(crate) fn read_file(path: &std::path::Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| FollowError::Io {
        path: path.to_path_buf(),
        source,
    })
}
