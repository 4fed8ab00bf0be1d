//! Error types for loading, preparing and predicting.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, InsightsError>;

#[derive(Error, Debug)]
pub enum InsightsError {
    /// A required column is absent or a cell could not be parsed. Fatal at startup.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// An inference profile is missing a feature or holds an out-of-range value.
    #[error("Invalid profile: feature `{feature}` {reason}")]
    InvalidProfile { feature: String, reason: String },

    #[error("Model not trained: call fit before infer")]
    ModelNotTrained,

    #[error("Not enough complete rows to train: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl InsightsError {
    pub(crate) fn invalid_profile(feature: &str, reason: impl Into<String>) -> Self {
        InsightsError::InvalidProfile {
            feature: feature.to_string(),
            reason: reason.into(),
        }
    }
}

impl InsightsError {
    /// Maps a csv failure on `origin`: read failures keep their path, the rest are malformed input.
    pub(crate) fn from_csv(err: csv::Error, origin: &Path) -> Self {
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(source) => InsightsError::Io {
                path: origin.to_path_buf(),
                source,
            },
            _ => InsightsError::MalformedInput(message),
        }
    }
}

impl From<toml::de::Error> for InsightsError {
    fn from(err: toml::de::Error) -> Self {
        InsightsError::Config(err.to_string())
    }
}
