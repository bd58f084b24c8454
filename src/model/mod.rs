//! PMML model loading and evaluation.

pub mod aggregator;
pub mod compat;
pub mod evaluator;
pub mod loader;
pub mod schema;

pub use evaluator::ModelEvaluator;
pub use loader::ModelLoader;
pub use schema::Model;
