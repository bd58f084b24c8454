//! Combination of per-segment classification outcomes.
//!
//! A segmented mining model produces one classification per accepting
//! segment; the segmentation's multiple-model method decides how those
//! collapse into a single result.

use std::collections::BTreeMap;

use crate::model::evaluator::EvalError;
use crate::model::schema::CombinationMethod;
use crate::types::prediction::{ClassProbability, Classification};

/// Outcome of one accepting segment.
#[derive(Debug, Clone)]
pub struct SegmentOutcome {
    pub weight: f64,
    pub classification: Classification,
}

/// Collapse segment outcomes per the model's multiple-model method.
pub fn combine(
    method: CombinationMethod,
    outcomes: &[SegmentOutcome],
) -> Result<Classification, EvalError> {
    let first = outcomes.first().ok_or_else(|| {
        EvalError::Evaluation("no segment accepted the arguments".to_string())
    })?;

    match method {
        CombinationMethod::SelectFirst => Ok(first.classification.clone()),
        CombinationMethod::MajorityVote => vote(outcomes, false),
        CombinationMethod::WeightedMajorityVote => vote(outcomes, true),
        CombinationMethod::Average => average(outcomes, false),
        CombinationMethod::WeightedAverage => average(outcomes, true),
    }
}

/// Tally one (weighted) vote per segment for its predicted label. Ties
/// resolve to the alphabetically first label, which keeps repeated
/// evaluations identical.
fn vote(outcomes: &[SegmentOutcome], weighted: bool) -> Result<Classification, EvalError> {
    let mut tally: BTreeMap<&str, f64> = BTreeMap::new();
    let mut total = 0.0;
    for outcome in outcomes {
        let weight = if weighted { outcome.weight } else { 1.0 };
        *tally.entry(outcome.classification.label.as_str()).or_insert(0.0) += weight;
        total += weight;
    }
    if total <= 0.0 {
        return Err(EvalError::Evaluation(
            "segment weights sum to zero".to_string(),
        ));
    }
    normalized(tally, total)
}

/// Average the per-segment probability distributions, (weighted) by
/// segment weight.
fn average(outcomes: &[SegmentOutcome], weighted: bool) -> Result<Classification, EvalError> {
    let mut mass: BTreeMap<&str, f64> = BTreeMap::new();
    let mut total = 0.0;
    for outcome in outcomes {
        let weight = if weighted { outcome.weight } else { 1.0 };
        for p in &outcome.classification.distribution {
            *mass.entry(p.label.as_str()).or_insert(0.0) += weight * p.probability;
        }
        total += weight;
    }
    if total <= 0.0 {
        return Err(EvalError::Evaluation(
            "segment weights sum to zero".to_string(),
        ));
    }
    normalized(mass, total)
}

fn normalized(tally: BTreeMap<&str, f64>, total: f64) -> Result<Classification, EvalError> {
    let mut best: Option<(&str, f64)> = None;
    for (&label, &weight) in &tally {
        if best.map_or(true, |(_, w)| weight > w) {
            best = Some((label, weight));
        }
    }
    let (label, _) = best.ok_or_else(|| {
        EvalError::Evaluation("combination produced no candidate labels".to_string())
    })?;

    let distribution = tally
        .iter()
        .map(|(&l, &w)| ClassProbability {
            label: l.to_string(),
            probability: w / total,
        })
        .collect();

    Ok(Classification {
        label: label.to_string(),
        distribution,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(label: &str, weight: f64) -> SegmentOutcome {
        SegmentOutcome {
            weight,
            classification: Classification::certain(label),
        }
    }

    #[test]
    fn test_majority_vote() {
        let outcomes = vec![outcome("yes", 1.0), outcome("no", 1.0), outcome("no", 1.0)];
        let combined = combine(CombinationMethod::MajorityVote, &outcomes).unwrap();
        assert_eq!(combined.label, "no");
        assert!((combined.probability_of("no").unwrap() - 2.0 / 3.0).abs() < 1e-9);
        assert!((combined.probability_of("yes").unwrap() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_vote_outweighs_count() {
        let outcomes = vec![outcome("yes", 5.0), outcome("no", 1.0), outcome("no", 1.0)];
        let combined = combine(CombinationMethod::WeightedMajorityVote, &outcomes).unwrap();
        assert_eq!(combined.label, "yes");
    }

    #[test]
    fn test_vote_tie_resolves_deterministically() {
        let outcomes = vec![outcome("b", 1.0), outcome("a", 1.0)];
        let combined = combine(CombinationMethod::MajorityVote, &outcomes).unwrap();
        assert_eq!(combined.label, "a");
    }

    #[test]
    fn test_average_merges_distributions() {
        let outcomes = vec![
            SegmentOutcome {
                weight: 1.0,
                classification: Classification {
                    label: "yes".to_string(),
                    distribution: vec![
                        ClassProbability {
                            label: "yes".to_string(),
                            probability: 0.8,
                        },
                        ClassProbability {
                            label: "no".to_string(),
                            probability: 0.2,
                        },
                    ],
                },
            },
            SegmentOutcome {
                weight: 1.0,
                classification: Classification {
                    label: "no".to_string(),
                    distribution: vec![
                        ClassProbability {
                            label: "yes".to_string(),
                            probability: 0.4,
                        },
                        ClassProbability {
                            label: "no".to_string(),
                            probability: 0.6,
                        },
                    ],
                },
            },
        ];

        let combined = combine(CombinationMethod::Average, &outcomes).unwrap();
        assert_eq!(combined.label, "yes");
        assert!((combined.probability_of("yes").unwrap() - 0.6).abs() < 1e-9);
        assert!((combined.probability_of("no").unwrap() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_select_first() {
        let outcomes = vec![outcome("first", 1.0), outcome("second", 1.0)];
        let combined = combine(CombinationMethod::SelectFirst, &outcomes).unwrap();
        assert_eq!(combined.label, "first");
    }

    #[test]
    fn test_empty_outcomes_are_a_fault() {
        let err = combine(CombinationMethod::MajorityVote, &[]).unwrap_err();
        assert!(matches!(err, EvalError::Evaluation(_)));
    }
}
