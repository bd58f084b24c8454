//! Classification results emitted by the pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::field::FieldName;

/// Probability assigned to one class label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassProbability {
    pub label: String,
    pub probability: f64,
}

/// Predicted label plus the probability distribution over class labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub distribution: Vec<ClassProbability>,
}

impl Classification {
    /// A single-class result with probability 1.0, for leaves that carry a
    /// score but no distribution.
    pub fn certain(label: impl Into<String>) -> Self {
        let label = label.into();
        let distribution = vec![ClassProbability {
            label: label.clone(),
            probability: 1.0,
        }];
        Self {
            label,
            distribution,
        }
    }

    pub fn probability_of(&self, label: &str) -> Option<f64> {
        self.distribution
            .iter()
            .find(|p| p.label == label)
            .map(|p| p.probability)
    }
}

/// One scored row, as serialized in JSON output mode.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRecord {
    /// 1-based line number of the source row
    pub row: usize,
    /// Output field the label belongs to
    pub field: FieldName,
    /// Predicted class label
    pub label: String,
    /// Probability distribution over class labels
    pub distribution: Vec<ClassProbability>,
    /// Record emission timestamp
    pub timestamp: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn new(row: usize, field: FieldName, classification: Classification) -> Self {
        Self {
            row,
            field,
            label: classification.label,
            distribution: classification.distribution,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_certain_classification() {
        let c = Classification::certain("will play");
        assert_eq!(c.label, "will play");
        assert_eq!(c.probability_of("will play"), Some(1.0));
        assert_eq!(c.probability_of("no play"), None);
    }

    #[test]
    fn test_prediction_record_serialization() {
        let record = PredictionRecord::new(
            3,
            FieldName::from("decision"),
            Classification::certain("no play"),
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["row"], 3);
        assert_eq!(json["field"], "decision");
        assert_eq!(json["label"], "no play");
        assert_eq!(json["distribution"][0]["probability"], 1.0);
    }
}
