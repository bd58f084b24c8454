//! PMML model loader.
//!
//! Reads a model file, applies the namespace compatibility transform, and
//! parses the supported PMML subset into an immutable [`Model`].

use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use thiserror::Error;
use tracing::info;

use crate::model::compat::{normalize_namespace, SUPPORTED_NAMESPACE};
use crate::model::schema::{
    BooleanOp, Closure, CombinationMethod, ComparisonOp, DataDictionary, DataField, DataType,
    FieldUsage, Interval, MiningField, MiningModel, MiningSchema, Model, ModelElement,
    NoTrueChildStrategy, OpType, Predicate, ScoreDistribution, Segment, SetOp, TreeModel,
    TreeNode,
};
use crate::types::field::FieldName;

/// Errors raised while loading a model file.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("failed to read model file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model file is not well-formed XML: {0}")]
    Parse(#[from] roxmltree::Error),
    #[error("unsupported document: {0}")]
    UnsupportedSchema(String),
    #[error("malformed model: {0}")]
    Malformed(String),
}

/// Loads PMML documents into in-memory models.
pub struct ModelLoader;

impl ModelLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a model from a PMML file.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Model, ModelLoadError> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading PMML model");

        let raw = fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model = self.load_str(&raw)?;

        info!(
            path = %path.display(),
            version = %model.version,
            fields = model.dictionary.fields.len(),
            "Model loaded"
        );
        Ok(model)
    }

    /// Load a model from an in-memory PMML document.
    pub fn load_str(&self, document: &str) -> Result<Model, ModelLoadError> {
        let normalized = normalize_namespace(document);
        let doc = Document::parse(&normalized)?;
        let root = doc.root_element();

        if root.tag_name().name() != "PMML" {
            return Err(ModelLoadError::UnsupportedSchema(format!(
                "root element is <{}>, expected <PMML>",
                root.tag_name().name()
            )));
        }
        if root.tag_name().namespace() != Some(SUPPORTED_NAMESPACE) {
            return Err(ModelLoadError::UnsupportedSchema(
                "document does not carry a PMML namespace".to_string(),
            ));
        }

        let version = root.attribute("version").unwrap_or("unknown").to_string();

        let dictionary = parse_data_dictionary(element_child(root, "DataDictionary").ok_or_else(
            || ModelLoadError::Malformed("document has no DataDictionary".to_string()),
        )?)?;

        let element = if let Some(node) = element_child(root, "TreeModel") {
            ModelElement::Tree(parse_tree_model(node)?)
        } else if let Some(node) = element_child(root, "MiningModel") {
            ModelElement::Mining(parse_mining_model(node)?)
        } else {
            return Err(ModelLoadError::Malformed(
                "document carries neither a TreeModel nor a MiningModel".to_string(),
            ));
        };

        Ok(Model {
            version,
            dictionary,
            element,
        })
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn element_child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |c| c.is_element() && c.tag_name().name() == name)
}

fn required_attr<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str, ModelLoadError> {
    node.attribute(name).ok_or_else(|| {
        ModelLoadError::Malformed(format!(
            "<{}> is missing the {name} attribute",
            node.tag_name().name()
        ))
    })
}

fn parse_f64_attr(node: Node<'_, '_>, name: &str) -> Result<Option<f64>, ModelLoadError> {
    match node.attribute(name) {
        None => Ok(None),
        Some(text) => text.parse().map(Some).map_err(|_| {
            ModelLoadError::Malformed(format!(
                "<{}> {name}={text:?} is not numeric",
                node.tag_name().name()
            ))
        }),
    }
}

fn parse_data_dictionary(node: Node<'_, '_>) -> Result<DataDictionary, ModelLoadError> {
    let mut fields = Vec::new();
    for field in element_children(node, "DataField") {
        let name = FieldName::new(required_attr(field, "name")?);
        let optype_text = required_attr(field, "optype")?;
        let optype = OpType::parse(optype_text).ok_or_else(|| {
            ModelLoadError::Malformed(format!("DataField {name} has unknown optype {optype_text:?}"))
        })?;
        let type_text = required_attr(field, "dataType")?;
        let data_type = DataType::parse(type_text).ok_or_else(|| {
            ModelLoadError::Malformed(format!(
                "DataField {name} has unsupported dataType {type_text:?}"
            ))
        })?;

        let values = element_children(field, "Value")
            .map(|v| required_attr(v, "value").map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;

        let mut intervals = Vec::new();
        for interval in element_children(field, "Interval") {
            let closure_text = required_attr(interval, "closure")?;
            let closure = Closure::parse(closure_text).ok_or_else(|| {
                ModelLoadError::Malformed(format!(
                    "DataField {name} interval has unknown closure {closure_text:?}"
                ))
            })?;
            intervals.push(Interval {
                closure,
                left: parse_f64_attr(interval, "leftMargin")?,
                right: parse_f64_attr(interval, "rightMargin")?,
            });
        }

        fields.push(DataField {
            name,
            optype,
            data_type,
            values,
            intervals,
        });
    }

    if fields.is_empty() {
        return Err(ModelLoadError::Malformed(
            "DataDictionary declares no fields".to_string(),
        ));
    }
    Ok(DataDictionary { fields })
}

fn parse_mining_schema(model_node: Node<'_, '_>) -> Result<MiningSchema, ModelLoadError> {
    let schema_node = element_child(model_node, "MiningSchema").ok_or_else(|| {
        ModelLoadError::Malformed(format!(
            "<{}> has no MiningSchema",
            model_node.tag_name().name()
        ))
    })?;

    let mut fields = Vec::new();
    for field in element_children(schema_node, "MiningField") {
        let name = FieldName::new(required_attr(field, "name")?);
        let usage = match field.attribute("usageType").unwrap_or("active") {
            "active" => FieldUsage::Active,
            // "predicted" is the pre-4.2 spelling of "target"
            "target" | "predicted" => FieldUsage::Target,
            _ => FieldUsage::Supplementary,
        };
        fields.push(MiningField { name, usage });
    }

    if fields.is_empty() {
        return Err(ModelLoadError::Malformed(
            "MiningSchema declares no fields".to_string(),
        ));
    }
    Ok(MiningSchema { fields })
}

const PREDICATE_ELEMENTS: [&str; 5] = [
    "True",
    "False",
    "SimplePredicate",
    "SimpleSetPredicate",
    "CompoundPredicate",
];

fn predicate_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(|c| c.is_element() && PREDICATE_ELEMENTS.contains(&c.tag_name().name()))
}

fn parse_predicate(node: Node<'_, '_>) -> Result<Predicate, ModelLoadError> {
    match node.tag_name().name() {
        "True" => Ok(Predicate::True),
        "False" => Ok(Predicate::False),
        "SimplePredicate" => {
            let field = FieldName::new(required_attr(node, "field")?);
            let op_text = required_attr(node, "operator")?;
            let op = ComparisonOp::parse(op_text).ok_or_else(|| {
                ModelLoadError::Malformed(format!(
                    "SimplePredicate on {field} has unknown operator {op_text:?}"
                ))
            })?;
            let value = if op.is_presence_test() {
                String::new()
            } else {
                required_attr(node, "value")?.to_string()
            };
            Ok(Predicate::Simple { field, op, value })
        }
        "SimpleSetPredicate" => {
            let field = FieldName::new(required_attr(node, "field")?);
            let op = match required_attr(node, "booleanOperator")? {
                "isIn" => SetOp::IsIn,
                "isNotIn" => SetOp::IsNotIn,
                other => {
                    return Err(ModelLoadError::Malformed(format!(
                        "SimpleSetPredicate on {field} has unknown operator {other:?}"
                    )))
                }
            };
            let array = element_child(node, "Array").ok_or_else(|| {
                ModelLoadError::Malformed(format!(
                    "SimpleSetPredicate on {field} is missing its Array"
                ))
            })?;
            let values = parse_array_items(array.text().unwrap_or(""));
            Ok(Predicate::SimpleSet { field, op, values })
        }
        "CompoundPredicate" => {
            let op = match required_attr(node, "booleanOperator")? {
                "and" => BooleanOp::And,
                "or" => BooleanOp::Or,
                "xor" => BooleanOp::Xor,
                "surrogate" => BooleanOp::Surrogate,
                other => {
                    return Err(ModelLoadError::Malformed(format!(
                        "CompoundPredicate has unknown booleanOperator {other:?}"
                    )))
                }
            };
            let terms = predicate_children(node)
                .map(parse_predicate)
                .collect::<Result<Vec<_>, _>>()?;
            if terms.len() < 2 {
                return Err(ModelLoadError::Malformed(
                    "CompoundPredicate holds fewer than two predicates".to_string(),
                ));
            }
            Ok(Predicate::Compound { op, terms })
        }
        other => Err(ModelLoadError::Malformed(format!(
            "<{other}> is not a predicate element"
        ))),
    }
}

/// Split PMML `Array` content: whitespace-separated tokens, double quotes
/// grouping tokens that contain spaces.
fn parse_array_items(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in text.chars() {
        match ch {
            '"' => {
                if in_quotes {
                    items.push(std::mem::take(&mut current));
                }
                in_quotes = !in_quotes;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    items.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        items.push(current);
    }
    items
}

fn parse_tree_node(node: Node<'_, '_>) -> Result<TreeNode, ModelLoadError> {
    let predicate = predicate_children(node)
        .next()
        .map(parse_predicate)
        .transpose()?
        .ok_or_else(|| ModelLoadError::Malformed("Node carries no predicate".to_string()))?;

    let mut distribution = Vec::new();
    for dist in element_children(node, "ScoreDistribution") {
        distribution.push(ScoreDistribution {
            value: required_attr(dist, "value")?.to_string(),
            record_count: parse_f64_attr(dist, "recordCount")?.ok_or_else(|| {
                ModelLoadError::Malformed(
                    "ScoreDistribution is missing its recordCount".to_string(),
                )
            })?,
        });
    }

    let children = element_children(node, "Node")
        .map(parse_tree_node)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TreeNode {
        score: node.attribute("score").map(str::to_string),
        predicate,
        distribution,
        children,
    })
}

fn parse_tree_model(node: Node<'_, '_>) -> Result<TreeModel, ModelLoadError> {
    let mining_schema = parse_mining_schema(node)?;
    let no_true_child = match node.attribute("noTrueChildStrategy") {
        None | Some("returnNullPrediction") => NoTrueChildStrategy::ReturnNullPrediction,
        Some("returnLastPrediction") => NoTrueChildStrategy::ReturnLastPrediction,
        Some(other) => {
            return Err(ModelLoadError::Malformed(format!(
                "TreeModel has unknown noTrueChildStrategy {other:?}"
            )))
        }
    };
    let root = element_child(node, "Node")
        .map(parse_tree_node)
        .transpose()?
        .ok_or_else(|| ModelLoadError::Malformed("TreeModel has no root Node".to_string()))?;

    Ok(TreeModel {
        mining_schema,
        no_true_child,
        root,
    })
}

fn parse_mining_model(node: Node<'_, '_>) -> Result<MiningModel, ModelLoadError> {
    let mining_schema = parse_mining_schema(node)?;
    let segmentation = element_child(node, "Segmentation").ok_or_else(|| {
        ModelLoadError::Malformed("MiningModel has no Segmentation".to_string())
    })?;

    let method_text = required_attr(segmentation, "multipleModelMethod")?;
    let method = CombinationMethod::parse(method_text).ok_or_else(|| {
        ModelLoadError::Malformed(format!(
            "Segmentation has unsupported multipleModelMethod {method_text:?}"
        ))
    })?;

    let mut segments = Vec::new();
    for segment in element_children(segmentation, "Segment") {
        let predicate = predicate_children(segment)
            .next()
            .map(parse_predicate)
            .transpose()?
            .unwrap_or(Predicate::True);
        let weight = parse_f64_attr(segment, "weight")?.unwrap_or(1.0);
        let tree = element_child(segment, "TreeModel")
            .map(parse_tree_model)
            .transpose()?
            .ok_or_else(|| {
                ModelLoadError::Malformed("Segment holds no TreeModel".to_string())
            })?;
        segments.push(Segment {
            predicate,
            weight,
            tree,
        });
    }

    if segments.is_empty() {
        return Err(ModelLoadError::Malformed(
            "Segmentation holds no segments".to_string(),
        ));
    }

    Ok(MiningModel {
        mining_schema,
        method,
        segments,
    })
}
