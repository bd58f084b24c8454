//! Type definitions for the scoring pipeline.

pub mod field;
pub mod prediction;

pub use field::{ArgumentSet, FieldName, FieldValue};
pub use prediction::{Classification, PredictionRecord};
