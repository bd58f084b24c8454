//! Configuration management for the scoring pipeline.

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Output encoding for per-row results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `== Result: <label>` lines
    #[default]
    Text,
    /// One serialized prediction record per line
    Json,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Model file configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path to the PMML model file
    pub path: String,
}

/// Input data configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Path to the comma-separated input file
    pub path: String,
    /// Treat rows with an unexpected column count as errors instead of
    /// silently skipping them
    #[serde(default)]
    pub strict: bool,
}

/// Output configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default log directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig {
                path: "data/decision_tree.pmml".to_string(),
            },
            input: InputConfig {
                path: "data/input.csv".to_string(),
                strict: false,
            },
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.model.path, "data/decision_tree.pmml");
        assert_eq!(config.input.path, "data/input.csv");
        assert!(!config.input.strict);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let toml = r#"
            [model]
            path = "models/golf.pmml"

            [input]
            path = "rows.csv"
        "#;
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.model.path, "models/golf.pmml");
        assert!(!config.input.strict);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_output_format_parsing() {
        let toml = r#"
            [model]
            path = "m.pmml"

            [input]
            path = "i.csv"
            strict = true

            [output]
            format = "json"
        "#;
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(config.input.strict);
        assert_eq!(config.output.format, OutputFormat::Json);
    }
}
