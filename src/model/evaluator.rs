//! Model evaluator: field coercion, structural verification, and tree
//! traversal.

use thiserror::Error;
use tracing::debug;

use crate::model::aggregator::{combine, SegmentOutcome};
use crate::model::schema::{
    BooleanOp, CombinationMethod, ComparisonOp, DataField, DataType, MiningSchema, Model,
    ModelElement, NoTrueChildStrategy, OpType, Predicate, SetOp, TreeModel, TreeNode,
};
use crate::types::field::{ArgumentSet, FieldName, FieldValue};
use crate::types::prediction::{ClassProbability, Classification};

/// Errors raised while preparing inputs or evaluating a row.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("model failed verification: {0}")]
    Verification(String),
    #[error("value {value:?} is not valid for field {field}: {reason}")]
    FieldCoercion {
        field: FieldName,
        value: String,
        reason: String,
    },
    #[error("required field {0} is missing from the arguments")]
    MissingField(FieldName),
    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

/// Ordered output-field results of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOutcome {
    results: Vec<(FieldName, Classification)>,
}

impl EvaluationOutcome {
    pub fn get(&self, name: &FieldName) -> Option<&Classification> {
        self.results
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    /// The first (primary) output.
    pub fn primary(&self) -> Option<(&FieldName, &Classification)> {
        self.results.first().map(|(n, c)| (n, c))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &Classification)> {
        self.results.iter().map(|(n, c)| (n, c))
    }
}

/// Wraps a loaded model and exposes the evaluation interface.
///
/// The model is read-only after construction; evaluation never mutates it
/// and retains no reference to the argument set it is handed.
pub struct ModelEvaluator {
    model: Model,
    active: Vec<FieldName>,
    target: Option<FieldName>,
}

impl ModelEvaluator {
    pub fn new(model: Model) -> Self {
        let schema = model.mining_schema();
        let active = schema.active_fields().cloned().collect();
        let target = schema.target_field().cloned();
        Self {
            model,
            active,
            target,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Input fields the model requires, in declaration order.
    pub fn active_fields(&self) -> &[FieldName] {
        &self.active
    }

    pub fn target_field(&self) -> Option<&FieldName> {
        self.target.as_ref()
    }

    /// Coerce a raw textual value into the typed domain of `field`.
    pub fn prepare(&self, field: &FieldName, raw: &str) -> Result<FieldValue, EvalError> {
        let declared = self.model.dictionary.field(field).ok_or_else(|| {
            EvalError::FieldCoercion {
                field: field.clone(),
                value: raw.to_string(),
                reason: "field is not declared in the data dictionary".to_string(),
            }
        })?;
        coerce(declared, raw)
    }

    /// Check that the model is structurally ready for evaluation.
    ///
    /// Cheap and idempotent; callers invoke it ahead of evaluation so that
    /// unsound models fail here instead of deep inside traversal.
    pub fn verify(&self) -> Result<(), EvalError> {
        if self.active.is_empty() {
            return Err(EvalError::Verification(
                "mining schema declares no active fields".to_string(),
            ));
        }
        if self.target.is_none() {
            return Err(EvalError::Verification(
                "mining schema declares no target field".to_string(),
            ));
        }
        for field in &self.model.dictionary.fields {
            if field.optype == OpType::Continuous
                && !matches!(field.data_type, DataType::Double | DataType::Integer)
            {
                return Err(EvalError::Verification(format!(
                    "continuous field {} has a non-numeric data type",
                    field.name
                )));
            }
        }
        self.verify_schema_resolves(self.model.mining_schema())?;

        match &self.model.element {
            ModelElement::Tree(tree) => self.verify_tree(tree)?,
            ModelElement::Mining(mining) => {
                if mining.segments.is_empty() {
                    return Err(EvalError::Verification(
                        "segmentation holds no segments".to_string(),
                    ));
                }
                for segment in &mining.segments {
                    self.verify_schema_resolves(&segment.tree.mining_schema)?;
                    self.verify_tree(&segment.tree)?;
                }
            }
        }
        Ok(())
    }

    /// Evaluate a complete argument set to the model's outputs.
    pub fn evaluate(&self, arguments: &ArgumentSet) -> Result<EvaluationOutcome, EvalError> {
        for field in &self.active {
            if arguments.get(field).is_none() {
                return Err(EvalError::MissingField(field.clone()));
            }
        }

        let classification = match &self.model.element {
            ModelElement::Tree(tree) => evaluate_tree(tree, arguments)?,
            ModelElement::Mining(mining) => {
                let mut outcomes = Vec::new();
                for segment in &mining.segments {
                    if !eval_predicate(&segment.predicate, arguments)? {
                        continue;
                    }
                    let result = evaluate_tree(&segment.tree, arguments)?;
                    outcomes.push(SegmentOutcome {
                        weight: segment.weight,
                        classification: result,
                    });
                    if mining.method == CombinationMethod::SelectFirst {
                        break;
                    }
                }
                combine(mining.method, &outcomes)?
            }
        };

        let target = self.target.clone().ok_or_else(|| {
            EvalError::Evaluation("model declares no target field".to_string())
        })?;
        debug!(target = %target, label = %classification.label, "Row evaluated");

        Ok(EvaluationOutcome {
            results: vec![(target, classification)],
        })
    }

    fn verify_schema_resolves(&self, schema: &MiningSchema) -> Result<(), EvalError> {
        for field in &schema.fields {
            if self.model.dictionary.field(&field.name).is_none() {
                return Err(EvalError::Verification(format!(
                    "mining field {} is not declared in the data dictionary",
                    field.name
                )));
            }
        }
        Ok(())
    }

    fn verify_tree(&self, tree: &TreeModel) -> Result<(), EvalError> {
        verify_node(&tree.root)
    }
}

fn verify_node(node: &TreeNode) -> Result<(), EvalError> {
    if node.score.is_none() && node.children.is_empty() {
        return Err(EvalError::Verification(
            "tree node carries neither a score nor children".to_string(),
        ));
    }
    for child in &node.children {
        verify_node(child)?;
    }
    Ok(())
}

fn coerce(declared: &DataField, raw: &str) -> Result<FieldValue, EvalError> {
    let fail = |reason: String| EvalError::FieldCoercion {
        field: declared.name.clone(),
        value: raw.to_string(),
        reason,
    };

    let value = match declared.data_type {
        DataType::Double => FieldValue::Float(
            raw.trim()
                .parse()
                .map_err(|_| fail("not a number".to_string()))?,
        ),
        DataType::Integer => FieldValue::Integer(
            raw.trim()
                .parse()
                .map_err(|_| fail("not an integer".to_string()))?,
        ),
        DataType::Boolean => match raw.trim() {
            "true" | "1" => FieldValue::Boolean(true),
            "false" | "0" => FieldValue::Boolean(false),
            _ => return Err(fail("not a boolean".to_string())),
        },
        DataType::String => FieldValue::String(raw.to_string()),
    };

    if !declared.values.is_empty() {
        let text = value.to_string();
        if !declared.values.iter().any(|v| *v == text) {
            return Err(fail("outside the enumerated value domain".to_string()));
        }
    }
    if !declared.intervals.is_empty() {
        if let Some(number) = value.as_f64() {
            if !declared.intervals.iter().any(|i| i.contains(number)) {
                return Err(fail("outside the declared value range".to_string()));
            }
        }
    }

    Ok(value)
}

fn eval_predicate(predicate: &Predicate, arguments: &ArgumentSet) -> Result<bool, EvalError> {
    match predicate {
        Predicate::True => Ok(true),
        Predicate::False => Ok(false),
        Predicate::Simple { field, op, value } => match op {
            ComparisonOp::IsMissing => Ok(arguments.get(field).is_none()),
            ComparisonOp::IsNotMissing => Ok(arguments.get(field).is_some()),
            _ => {
                let actual = arguments
                    .get(field)
                    .ok_or_else(|| EvalError::MissingField(field.clone()))?;
                compare(field, actual, *op, value)
            }
        },
        Predicate::SimpleSet { field, op, values } => {
            let actual = arguments
                .get(field)
                .ok_or_else(|| EvalError::MissingField(field.clone()))?;
            let text = actual.to_string();
            let found = values.iter().any(|v| *v == text);
            Ok(match op {
                SetOp::IsIn => found,
                SetOp::IsNotIn => !found,
            })
        }
        Predicate::Compound { op, terms } => match op {
            BooleanOp::And => {
                for term in terms {
                    if !eval_predicate(term, arguments)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            BooleanOp::Or => {
                for term in terms {
                    if eval_predicate(term, arguments)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            BooleanOp::Xor => {
                let mut truths = 0usize;
                for term in terms {
                    if eval_predicate(term, arguments)? {
                        truths += 1;
                    }
                }
                Ok(truths % 2 == 1)
            }
            // Surrogate terms exist to cover missing values; arguments are
            // checked complete up front, so the first term decides.
            BooleanOp::Surrogate => match terms.first() {
                Some(term) => eval_predicate(term, arguments),
                None => Err(EvalError::Evaluation(
                    "surrogate predicate holds no terms".to_string(),
                )),
            },
        },
    }
}

fn compare(
    field: &FieldName,
    actual: &FieldValue,
    op: ComparisonOp,
    value: &str,
) -> Result<bool, EvalError> {
    if let Some(lhs) = actual.as_f64() {
        let rhs: f64 = value.trim().parse().map_err(|_| {
            EvalError::Evaluation(format!(
                "predicate on {field} compares against non-numeric value {value:?}"
            ))
        })?;
        return Ok(match op {
            ComparisonOp::Equal => lhs == rhs,
            ComparisonOp::NotEqual => lhs != rhs,
            ComparisonOp::LessThan => lhs < rhs,
            ComparisonOp::LessOrEqual => lhs <= rhs,
            ComparisonOp::GreaterThan => lhs > rhs,
            ComparisonOp::GreaterOrEqual => lhs >= rhs,
            ComparisonOp::IsMissing | ComparisonOp::IsNotMissing => {
                return Err(EvalError::Evaluation(format!(
                    "presence operator on {field} carries a comparison value"
                )))
            }
        });
    }

    let lhs = actual.to_string();
    match op {
        ComparisonOp::Equal => Ok(lhs == value),
        ComparisonOp::NotEqual => Ok(lhs != value),
        _ => Err(EvalError::Evaluation(format!(
            "ordering comparison on non-numeric field {field}"
        ))),
    }
}

fn evaluate_tree(tree: &TreeModel, arguments: &ArgumentSet) -> Result<Classification, EvalError> {
    if !eval_predicate(&tree.root.predicate, arguments)? {
        return Err(EvalError::Evaluation(
            "root node predicate rejected the arguments".to_string(),
        ));
    }
    let node = descend(&tree.root, tree.no_true_child, arguments)?;
    classification_for(node)
}

fn descend<'t>(
    root: &'t TreeNode,
    strategy: NoTrueChildStrategy,
    arguments: &ArgumentSet,
) -> Result<&'t TreeNode, EvalError> {
    let mut current = root;
    loop {
        if current.children.is_empty() {
            return Ok(current);
        }

        let mut accepted = None;
        for child in &current.children {
            if eval_predicate(&child.predicate, arguments)? {
                accepted = Some(child);
                break;
            }
        }

        match accepted {
            Some(child) => current = child,
            None => {
                return match strategy {
                    NoTrueChildStrategy::ReturnLastPrediction if current.score.is_some() => {
                        Ok(current)
                    }
                    NoTrueChildStrategy::ReturnLastPrediction => Err(EvalError::Evaluation(
                        "no child predicate accepted and the node carries no score".to_string(),
                    )),
                    NoTrueChildStrategy::ReturnNullPrediction => Err(EvalError::Evaluation(
                        "no child predicate accepted the arguments".to_string(),
                    )),
                }
            }
        }
    }
}

fn classification_for(node: &TreeNode) -> Result<Classification, EvalError> {
    let label = node
        .score
        .clone()
        .ok_or_else(|| EvalError::Evaluation("selected node carries no score".to_string()))?;

    if node.distribution.is_empty() {
        return Ok(Classification::certain(label));
    }
    let total: f64 = node.distribution.iter().map(|d| d.record_count).sum();
    if total <= 0.0 {
        return Ok(Classification::certain(label));
    }

    let distribution = node
        .distribution
        .iter()
        .map(|d| ClassProbability {
            label: d.value.clone(),
            probability: d.record_count / total,
        })
        .collect();
    Ok(Classification {
        label,
        distribution,
    })
}
