//! Entity frame decoration: unified event timestamp, per-view row ids, and
//! the distinct per-view entity subset fed to the range join.

use std::collections::HashSet;

use pitjoin_core::prelude::Schema;
use pitjoin_core::schema::{DataType, Field};
use pitjoin_core::types::{Column, RowBatch, Scalar};
use pitjoin_core::view::ENTITY_TIMESTAMP_COLUMN;

use crate::plan::OpPlan;
use crate::traits::{input, input_schema, require, require_col, OpError, Operator};

/// Separates the parts of an EntityRowUniqueId.
pub const ROW_ID_SEPARATOR: char = '\u{1f}';

/// Build an EntityRowUniqueId from key values and the entity timestamp.
///
/// `None` when any part is null: such rows can never match a feature row.
pub fn entity_row_id(keys: &[&Scalar], ts: &Scalar) -> Option<String> {
    if ts.is_null() || keys.iter().any(|k| k.is_null()) {
        return None;
    }
    let mut id = String::new();
    for k in keys {
        id.push_str(&k.to_string());
        id.push(ROW_ID_SEPARATOR);
    }
    id.push_str(&ts.to_string());
    Some(id)
}

/// Appends `entity_timestamp` and one row id column per feature view.
#[derive(Debug, Clone)]
pub struct EntityRowIds {
    pub timestamp_column: String,
    /// `(row id column, join keys)`
    pub row_ids: Vec<(String, Vec<String>)>,
}

impl Operator for EntityRowIds {
    fn name(&self) -> &'static str {
        "entity_row_ids"
    }

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        let schema = input_schema(input_schemas, 0, self.name())?;
        let ts = require(schema, &self.timestamp_column, self.name())?;
        if !schema.fields[ts].data_type.is_timestamp() {
            return Err(OpError::Schema(format!(
                "entity timestamp column '{}' is not a timestamp",
                self.timestamp_column
            )));
        }
        let mut out = schema.clone();
        let helpers = std::iter::once(ENTITY_TIMESTAMP_COLUMN)
            .chain(self.row_ids.iter().map(|(c, _)| c.as_str()));
        for helper in helpers {
            if out.contains(helper) {
                return Err(OpError::Schema(format!(
                    "entity frame already has reserved column '{helper}'"
                )));
            }
            let data_type = if helper == ENTITY_TIMESTAMP_COLUMN {
                DataType::Timestamp
            } else {
                DataType::Utf8
            };
            out.fields.push(Field::new(helper, data_type, true));
        }
        for (_, keys) in &self.row_ids {
            for k in keys {
                require(schema, k, self.name())?;
            }
        }
        Ok(OpPlan::new(out))
    }

    fn eval(&self, inputs: &[RowBatch]) -> Result<RowBatch, OpError> {
        let input = input(inputs, 0, self.name())?;
        let ts_idx = require_col(input, &self.timestamp_column, self.name())?;
        let ts_values = &input.columns[ts_idx].values;

        let mut out = input.clone();
        out.columns
            .push(Column::new(ENTITY_TIMESTAMP_COLUMN, ts_values.clone()));

        for (column, keys) in &self.row_ids {
            let key_idx = keys
                .iter()
                .map(|k| require_col(input, k, self.name()))
                .collect::<Result<Vec<_>, _>>()?;
            let values = (0..input.num_rows())
                .map(|row| {
                    let parts: Vec<&Scalar> = key_idx
                        .iter()
                        .map(|&ci| &input.columns[ci].values[row])
                        .collect();
                    entity_row_id(&parts, &ts_values[row])
                        .map(Scalar::Str)
                        .unwrap_or(Scalar::Null)
                })
                .collect();
            out.columns.push(Column::new(column.clone(), values));
        }

        Ok(out)
    }
}

/// Projects `columns` and keeps the first occurrence of each distinct tuple.
#[derive(Debug, Clone)]
pub struct Distinct {
    pub columns: Vec<String>,
}

impl Operator for Distinct {
    fn name(&self) -> &'static str {
        "distinct"
    }

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        let schema = input_schema(input_schemas, 0, self.name())?;
        let fields = self
            .columns
            .iter()
            .map(|c| require(schema, c, self.name()).map(|i| schema.fields[i].clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(OpPlan::new(Schema::new(fields)).with_partitions(self.columns.clone()))
    }

    fn eval(&self, inputs: &[RowBatch]) -> Result<RowBatch, OpError> {
        let input = input(inputs, 0, self.name())?;
        let idx = input.column_indices(&self.columns)?;
        let mut seen = HashSet::new();
        let keep: Vec<usize> = (0..input.num_rows())
            .filter(|&row| seen.insert(input.group_key(&idx, row)))
            .collect();
        let projected = RowBatch::new(idx.iter().map(|&i| input.columns[i].clone()).collect());
        Ok(projected.take(&keep))
    }
}
