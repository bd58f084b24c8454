//! Orchestration of a scoring run.
//!
//! Loads the model once, announces its active fields, then drains the
//! input file row by row. No per-row failure is recovered: the first
//! load, verification, coercion, or evaluation fault aborts the run.

use std::fs;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::config::{AppConfig, OutputFormat};
use crate::metrics::RunMetrics;
use crate::model::evaluator::ModelEvaluator;
use crate::model::loader::ModelLoader;
use crate::rows::RowParser;
use crate::types::prediction::PredictionRecord;

/// Phase of the runner. `Draining` is entered per row and left again once
/// the row is finished; `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Loading,
    Ready,
    Draining,
    Done,
}

/// Execute one scoring run over the configured model and input file.
pub fn run(config: &AppConfig) -> Result<RunMetrics> {
    let mut state = RunnerState::Loading;
    debug!(state = ?state, "Runner starting");

    let model = ModelLoader::new()
        .load(&config.model.path)
        .with_context(|| format!("Failed to load model from {}", config.model.path))?;
    let evaluator = ModelEvaluator::new(model);
    transition(&mut state, RunnerState::Ready);

    println!("### Active Fields of Model ####");
    for field in evaluator.active_fields() {
        println!("Field Name: {field}");
    }

    let input = fs::read_to_string(&config.input.path)
        .with_context(|| format!("Failed to read input file {}", config.input.path))?;
    info!(path = %config.input.path, "Scoring input rows");

    let parser = RowParser::new();
    let mut metrics = RunMetrics::new();

    for (index, line) in input.lines().enumerate() {
        if parser.is_header(line) {
            metrics.record_header();
            continue;
        }
        transition(&mut state, RunnerState::Draining);
        let started = Instant::now();

        let arguments = parser.parse_row(line, &evaluator)?;
        if arguments.is_empty() {
            if config.input.strict {
                bail!(
                    "line {}: expected {} columns, got {:?}",
                    index + 1,
                    parser.column_count(),
                    line
                );
            }
            metrics.record_skipped();
            transition(&mut state, RunnerState::Ready);
            continue;
        }

        evaluator.verify()?;
        let outcome = evaluator.evaluate(&arguments)?;
        let (target, classification) = outcome
            .primary()
            .context("Evaluation produced no output")?;

        match config.output.format {
            OutputFormat::Text => println!("== Result: {}", classification.label),
            OutputFormat::Json => {
                let record =
                    PredictionRecord::new(index + 1, target.clone(), classification.clone());
                println!("{}", serde_json::to_string(&record)?);
            }
        }

        metrics.record_row(&classification.label, started.elapsed());
        transition(&mut state, RunnerState::Ready);
    }

    transition(&mut state, RunnerState::Done);
    Ok(metrics)
}

fn transition(state: &mut RunnerState, next: RunnerState) {
    debug!(from = ?state, to = ?next, "Runner state change");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InputConfig, ModelConfig};
    use std::io::Write;
    use std::path::Path;

    fn write_file(dir: &Path, name: &str, contents: &str) -> String {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn bundled_model() -> String {
        std::fs::read_to_string(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/data/decision_tree.pmml"
        ))
        .unwrap()
    }

    fn config_for(dir: &Path, input: &str) -> AppConfig {
        let model_path = write_file(dir, "decision_tree.pmml", &bundled_model());
        let input_path = write_file(dir, "input.csv", input);
        AppConfig {
            model: ModelConfig { path: model_path },
            input: InputConfig {
                path: input_path,
                strict: false,
            },
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_end_to_end_scoring() {
        let dir = tempfile::tempdir().unwrap();
        let input = "temperature,humidity,windy,outlook\n\
                     70,90,true,sunny\n\
                     85,66,false,sunny\n\
                     ,,,\n\
                     70,90\n";
        let config = config_for(dir.path(), input);

        let metrics = run(&config).unwrap();

        assert_eq!(metrics.header_rows(), 1);
        assert_eq!(metrics.rows_evaluated(), 3);
        assert_eq!(metrics.rows_skipped(), 1);
        assert_eq!(metrics.label_counts().get("no play"), Some(&1));
        assert_eq!(metrics.label_counts().get("will play"), Some(&1));
        assert_eq!(metrics.label_counts().get("may play"), Some(&1));
    }

    #[test]
    fn test_header_never_reaches_evaluation() {
        let dir = tempfile::tempdir().unwrap();
        // A bare header line would be a coercion error if it were parsed
        // as data.
        let config = config_for(dir.path(), "temperature,humidity,windy,outlook\n");

        let metrics = run(&config).unwrap();
        assert_eq!(metrics.header_rows(), 1);
        assert_eq!(metrics.rows_evaluated(), 0);
    }

    #[test]
    fn test_strict_mode_rejects_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_for(dir.path(), "70,90\n");
        config.input.strict = true;

        assert!(run(&config).is_err());
    }

    #[test]
    fn test_coercion_failure_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path(), "70,90,true,foggy\n");

        assert!(run(&config).is_err());
    }

    #[test]
    fn test_missing_model_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_for(dir.path(), "");
        config.model.path = dir
            .path()
            .join("absent.pmml")
            .to_string_lossy()
            .into_owned();

        assert!(run(&config).is_err());
    }
}
