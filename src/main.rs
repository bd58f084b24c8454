//! PMML batch scorer - entry point.
//!
//! Loads the configured PMML model, scores each input row against it, and
//! prints the predicted label per row.

use std::path::Path;

use anyhow::Result;
use pmml_scorer::config::AppConfig;
use pmml_scorer::runner;
use tracing::info;

fn main() -> Result<()> {
    // Optional first argument overrides the config location; a missing
    // file falls back to the built-in defaults.
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/config.toml".to_string());
    let config = if Path::new(&config_path).exists() {
        AppConfig::load_from_path(&config_path)?
    } else {
        AppConfig::default()
    };

    // Logs go to stderr; stdout carries only the scoring output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting PMML scoring run");
    info!(
        model = %config.model.path,
        input = %config.input.path,
        strict = config.input.strict,
        "Configuration loaded"
    );

    let metrics = runner::run(&config)?;
    metrics.print_summary();

    Ok(())
}
