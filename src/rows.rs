//! Input row parsing: fixed-order columns, defaults for empty values, and
//! header detection.

use tracing::debug;

use crate::model::evaluator::{EvalError, ModelEvaluator};
use crate::types::field::{ArgumentSet, FieldName};

/// One input column: field name plus the raw default substituted when the
/// column is empty.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: FieldName,
    pub default: String,
}

impl ColumnSpec {
    pub fn new(name: &str, default: &str) -> Self {
        Self {
            name: FieldName::from(name),
            default: default.to_string(),
        }
    }
}

/// Splits delimited lines into typed argument sets.
///
/// The column schema is fixed policy: names, order, and the per-field
/// defaults are not inferred from the data or the model.
pub struct RowParser {
    columns: Vec<ColumnSpec>,
}

impl RowParser {
    /// Parser for the four-column weather input format.
    pub fn new() -> Self {
        Self::with_columns(vec![
            ColumnSpec::new("temperature", "0"),
            ColumnSpec::new("humidity", "0"),
            ColumnSpec::new("windy", "false"),
            ColumnSpec::new("outlook", "overcast"),
        ])
    }

    pub fn with_columns(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// True when the line is the header row: the line starts with the first
    /// column's name.
    pub fn is_header(&self, line: &str) -> bool {
        self.columns
            .first()
            .is_some_and(|c| line.starts_with(c.name.as_str()))
    }

    /// Parse one data line into an argument set.
    ///
    /// A line that does not split into exactly the expected column count is
    /// tolerated: it parses to an empty argument set rather than an error,
    /// so ragged input files score their well-formed rows. Empty columns
    /// take the per-field default before coercion.
    pub fn parse_row(
        &self,
        line: &str,
        evaluator: &ModelEvaluator,
    ) -> Result<ArgumentSet, EvalError> {
        let mut arguments = ArgumentSet::new();

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != self.columns.len() {
            debug!(
                columns = fields.len(),
                expected = self.columns.len(),
                "Skipping row with unexpected column count"
            );
            return Ok(arguments);
        }

        for (spec, raw) in self.columns.iter().zip(&fields) {
            let raw = if raw.is_empty() {
                spec.default.as_str()
            } else {
                raw
            };
            let value = evaluator.prepare(&spec.name, raw)?;
            arguments.insert(spec.name.clone(), value);
        }
        Ok(arguments)
    }
}

impl Default for RowParser {
    fn default() -> Self {
        Self::new()
    }
}
