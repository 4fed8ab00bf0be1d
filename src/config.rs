//! Settings read from an optional TOML file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{InsightsError, Result};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Survey export to load.
    pub data_path: PathBuf,
    /// Default `EnvFilter` directive; `RUST_LOG` wins when set.
    pub log_filter: String,
    /// Log file used while the dashboard owns the terminal.
    pub log_file: PathBuf,
    pub predictor: PredictorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/empregos.csv"),
            log_filter: "info".to_string(),
            log_file: PathBuf::from("job_insights.log"),
            predictor: PredictorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PredictorConfig {
    /// Seeds both the train/test shuffle and the trees.
    pub seed: u64,
    pub n_trees: usize,
    pub test_ratio: f64,
    pub max_depth: Option<usize>,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            n_trees: 100,
            test_ratio: 0.2,
            max_depth: None,
        }
    }
}

impl PredictorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(InsightsError::Config(
                "predictor.n_trees must be at least 1".to_string(),
            ));
        }
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(InsightsError::Config(format!(
                "predictor.test_ratio must lie in (0, 1), got {}",
                self.test_ratio
            )));
        }
        if self.max_depth == Some(0) {
            return Err(InsightsError::Config(
                "predictor.max_depth must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Defaults when `path` is `None`; otherwise the file must exist and parse.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let config = match path {
            None => Config::default(),
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| InsightsError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Config::from_toml(&text)?
            }
        };
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Config> {
        let config: Config = toml::from_str(text)?;
        config.predictor.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn partial_predictor_section() {
        let config = Config::from_toml(
            r#"
            data_path = "survey.csv"

            [predictor]
            n_trees = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.data_path, PathBuf::from("survey.csv"));
        assert_eq!(config.predictor.n_trees, 10);
        assert_eq!(config.predictor.seed, 42);
        assert_eq!(config.predictor.test_ratio, 0.2);
    }

    #[test]
    fn rejects_out_of_range_values() {
        for text in [
            "[predictor]\nn_trees = 0",
            "[predictor]\ntest_ratio = 1.0",
            "[predictor]\ntest_ratio = 0.0",
            "[predictor]\nmax_depth = 0",
        ] {
            assert!(
                matches!(Config::from_toml(text), Err(InsightsError::Config(_))),
                "{} should be rejected",
                text
            );
        }
    }

    #[test]
    fn example_file_parses() {
        let config = Config::from_toml(include_str!("../job_insights.example.toml")).unwrap();
        assert_eq!(config.data_path, PathBuf::from("data/empregos.csv"));
        assert_eq!(config.predictor, PredictorConfig::default());
    }

    #[test]
    fn unknown_type_is_config_error() {
        let err = Config::from_toml("[predictor]\nseed = \"abc\"").unwrap_err();
        assert!(matches!(err, InsightsError::Config(_)));
    }
}
