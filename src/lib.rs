//! PMML decision-tree batch scorer.
//!
//! Loads a PMML tree or mining model, evaluates comma-separated input rows
//! against it, and prints one predicted label per row.

pub mod config;
pub mod metrics;
pub mod model;
pub mod rows;
pub mod runner;
pub mod types;

pub use config::AppConfig;
pub use metrics::RunMetrics;
pub use model::evaluator::ModelEvaluator;
pub use model::loader::ModelLoader;
pub use rows::RowParser;
pub use types::field::{ArgumentSet, FieldName, FieldValue};
pub use types::prediction::Classification;
