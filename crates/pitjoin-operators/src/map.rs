//! Column renaming (feature view field mapping).

use std::collections::BTreeMap;

use pitjoin_core::prelude::Schema;
use pitjoin_core::types::{Column, RowBatch};

use crate::plan::OpPlan;
use crate::traits::{input, input_schema, OpError, Operator};

#[derive(Debug, Default, Clone)]
pub struct Rename {
    /// Column rename map: old_name -> new_name
    pub renames: BTreeMap<String, String>,
}

impl Rename {
    fn renamed(&self, name: &str) -> String {
        self.renames
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

impl Operator for Rename {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        let mut schema = input_schema(input_schemas, 0, self.name())?.clone();

        for field in &mut schema.fields {
            field.name = self.renamed(&field.name);
        }

        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = schema.fields.iter().find(|f| !seen.insert(f.name.as_str())) {
            return Err(OpError::Schema(format!(
                "rename produces duplicate column '{}'",
                dup.name
            )));
        }

        Ok(OpPlan::new(schema))
    }

    fn eval(&self, inputs: &[RowBatch]) -> Result<RowBatch, OpError> {
        let input = input(inputs, 0, self.name())?;

        // If no renames, pass through
        if self.renames.is_empty() {
            return Ok(input.clone());
        }

        Ok(RowBatch {
            columns: input
                .columns
                .iter()
                .map(|col| Column {
                    name: self.renamed(&col.name),
                    values: col.values.clone(),
                })
                .collect(),
        })
    }
}
