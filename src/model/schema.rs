//! Parsed PMML subset: data dictionary, predicates, tree nodes, and the
//! mining-schema/segmentation structure around them.
//!
//! These are plain data carriers; loading lives in `loader`, traversal in
//! `evaluator`.

use crate::types::field::FieldName;

/// Declared type of a field's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    String,
    Integer,
    Double,
    Boolean,
}

impl DataType {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "string" => Some(DataType::String),
            "integer" | "int" | "short" | "long" => Some(DataType::Integer),
            "double" | "float" => Some(DataType::Double),
            "boolean" => Some(DataType::Boolean),
            _ => None,
        }
    }
}

/// Declared operational type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpType {
    Continuous,
    Categorical,
    Ordinal,
}

impl OpType {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "continuous" => Some(OpType::Continuous),
            "categorical" => Some(OpType::Categorical),
            "ordinal" => Some(OpType::Ordinal),
            _ => None,
        }
    }
}

/// Boundary treatment of a numeric interval restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closure {
    OpenOpen,
    OpenClosed,
    ClosedOpen,
    ClosedClosed,
}

impl Closure {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "openOpen" => Some(Closure::OpenOpen),
            "openClosed" => Some(Closure::OpenClosed),
            "closedOpen" => Some(Closure::ClosedOpen),
            "closedClosed" => Some(Closure::ClosedClosed),
            _ => None,
        }
    }
}

/// Numeric range restriction on a continuous field. A missing margin is
/// unbounded on that side.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub closure: Closure,
    pub left: Option<f64>,
    pub right: Option<f64>,
}

impl Interval {
    pub fn contains(&self, value: f64) -> bool {
        let left_ok = match self.left {
            None => true,
            Some(margin) => match self.closure {
                Closure::ClosedOpen | Closure::ClosedClosed => value >= margin,
                Closure::OpenOpen | Closure::OpenClosed => value > margin,
            },
        };
        let right_ok = match self.right {
            None => true,
            Some(margin) => match self.closure {
                Closure::OpenClosed | Closure::ClosedClosed => value <= margin,
                Closure::OpenOpen | Closure::ClosedOpen => value < margin,
            },
        };
        left_ok && right_ok
    }
}

/// One `DataField` declaration.
#[derive(Debug, Clone)]
pub struct DataField {
    pub name: FieldName,
    pub optype: OpType,
    pub data_type: DataType,
    /// Enumerated valid values; empty means unrestricted.
    pub values: Vec<String>,
    /// Numeric range restrictions; empty means unrestricted.
    pub intervals: Vec<Interval>,
}

/// The model's field declarations, in document order.
#[derive(Debug, Clone, Default)]
pub struct DataDictionary {
    pub fields: Vec<DataField>,
}

impl DataDictionary {
    pub fn field(&self, name: &FieldName) -> Option<&DataField> {
        self.fields.iter().find(|f| f.name == *name)
    }
}

/// How a mining field participates in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldUsage {
    Active,
    Target,
    Supplementary,
}

#[derive(Debug, Clone)]
pub struct MiningField {
    pub name: FieldName,
    pub usage: FieldUsage,
}

/// The model's view of its fields, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct MiningSchema {
    pub fields: Vec<MiningField>,
}

impl MiningSchema {
    /// Input fields, in declaration order.
    pub fn active_fields(&self) -> impl Iterator<Item = &FieldName> {
        self.fields
            .iter()
            .filter(|f| f.usage == FieldUsage::Active)
            .map(|f| &f.name)
    }

    /// The first declared target field, if any.
    pub fn target_field(&self) -> Option<&FieldName> {
        self.fields
            .iter()
            .find(|f| f.usage == FieldUsage::Target)
            .map(|f| &f.name)
    }
}

/// Comparison operator of a `SimplePredicate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    IsMissing,
    IsNotMissing,
}

impl ComparisonOp {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "equal" => Some(ComparisonOp::Equal),
            "notEqual" => Some(ComparisonOp::NotEqual),
            "lessThan" => Some(ComparisonOp::LessThan),
            "lessOrEqual" => Some(ComparisonOp::LessOrEqual),
            "greaterThan" => Some(ComparisonOp::GreaterThan),
            "greaterOrEqual" => Some(ComparisonOp::GreaterOrEqual),
            "isMissing" => Some(ComparisonOp::IsMissing),
            "isNotMissing" => Some(ComparisonOp::IsNotMissing),
            _ => None,
        }
    }

    /// True for the two operators that test presence rather than a value.
    pub fn is_presence_test(self) -> bool {
        matches!(self, ComparisonOp::IsMissing | ComparisonOp::IsNotMissing)
    }
}

/// Membership operator of a `SimpleSetPredicate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    IsIn,
    IsNotIn,
}

/// Combination operator of a `CompoundPredicate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    And,
    Or,
    Xor,
    Surrogate,
}

/// Node guard predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    True,
    False,
    Simple {
        field: FieldName,
        op: ComparisonOp,
        value: String,
    },
    SimpleSet {
        field: FieldName,
        op: SetOp,
        values: Vec<String>,
    },
    Compound {
        op: BooleanOp,
        terms: Vec<Predicate>,
    },
}

/// Per-class record count at a node.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreDistribution {
    pub value: String,
    pub record_count: f64,
}

/// One node of a decision tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub score: Option<String>,
    pub predicate: Predicate,
    pub distribution: Vec<ScoreDistribution>,
    pub children: Vec<TreeNode>,
}

/// What a tree answers at an interior node with no accepting child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoTrueChildStrategy {
    #[default]
    ReturnNullPrediction,
    ReturnLastPrediction,
}

#[derive(Debug, Clone)]
pub struct TreeModel {
    pub mining_schema: MiningSchema,
    pub no_true_child: NoTrueChildStrategy,
    pub root: TreeNode,
}

/// How a segmented model combines per-segment outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinationMethod {
    SelectFirst,
    MajorityVote,
    WeightedMajorityVote,
    Average,
    WeightedAverage,
}

impl CombinationMethod {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "selectFirst" => Some(CombinationMethod::SelectFirst),
            "majorityVote" => Some(CombinationMethod::MajorityVote),
            "weightedMajorityVote" => Some(CombinationMethod::WeightedMajorityVote),
            "average" => Some(CombinationMethod::Average),
            "weightedAverage" => Some(CombinationMethod::WeightedAverage),
            _ => None,
        }
    }
}

/// One guarded member of a segmentation.
#[derive(Debug, Clone)]
pub struct Segment {
    pub predicate: Predicate,
    pub weight: f64,
    pub tree: TreeModel,
}

#[derive(Debug, Clone)]
pub struct MiningModel {
    pub mining_schema: MiningSchema,
    pub method: CombinationMethod,
    pub segments: Vec<Segment>,
}

/// The model element a document carries.
#[derive(Debug, Clone)]
pub enum ModelElement {
    Tree(TreeModel),
    Mining(MiningModel),
}

/// An immutable, loaded PMML model.
#[derive(Debug, Clone)]
pub struct Model {
    pub version: String,
    pub dictionary: DataDictionary,
    pub element: ModelElement,
}

impl Model {
    /// The mining schema of the top-level model element.
    pub fn mining_schema(&self) -> &MiningSchema {
        match &self.element {
            ModelElement::Tree(tree) => &tree.mining_schema,
            ModelElement::Mining(mining) => &mining.mining_schema,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_closures() {
        let open = Interval {
            closure: Closure::OpenOpen,
            left: Some(0.0),
            right: Some(10.0),
        };
        assert!(!open.contains(0.0));
        assert!(open.contains(5.0));
        assert!(!open.contains(10.0));

        let closed = Interval {
            closure: Closure::ClosedClosed,
            left: Some(0.0),
            right: Some(10.0),
        };
        assert!(closed.contains(0.0));
        assert!(closed.contains(10.0));
    }

    #[test]
    fn test_interval_unbounded_sides() {
        let at_least = Interval {
            closure: Closure::ClosedOpen,
            left: Some(1.0),
            right: None,
        };
        assert!(at_least.contains(1.0));
        assert!(at_least.contains(1e9));
        assert!(!at_least.contains(0.5));
    }

    #[test]
    fn test_mining_schema_field_roles() {
        let schema = MiningSchema {
            fields: vec![
                MiningField {
                    name: FieldName::from("temperature"),
                    usage: FieldUsage::Active,
                },
                MiningField {
                    name: FieldName::from("decision"),
                    usage: FieldUsage::Target,
                },
                MiningField {
                    name: FieldName::from("outlook"),
                    usage: FieldUsage::Active,
                },
            ],
        };

        let active: Vec<&str> = schema.active_fields().map(FieldName::as_str).collect();
        assert_eq!(active, vec!["temperature", "outlook"]);
        assert_eq!(schema.target_field().map(FieldName::as_str), Some("decision"));
    }

    #[test]
    fn test_data_type_aliases() {
        assert_eq!(DataType::parse("float"), Some(DataType::Double));
        assert_eq!(DataType::parse("int"), Some(DataType::Integer));
        assert_eq!(DataType::parse("complex"), None);
    }
}
