//! Projection with optional output aliases.

use pitjoin_core::prelude::Schema;
use pitjoin_core::types::{Column, RowBatch};

use crate::plan::OpPlan;
use crate::traits::{input, input_schema, require, require_col, OpError, Operator};

#[derive(Debug, Default, Clone)]
pub struct Project {
    /// `(input column, output column)` in output order.
    pub columns: Vec<(String, String)>,
}

impl Project {
    /// Keep `names` as they are.
    pub fn keep(names: &[String]) -> Self {
        Self {
            columns: names.iter().map(|n| (n.clone(), n.clone())).collect(),
        }
    }
}

impl Operator for Project {
    fn name(&self) -> &'static str {
        "project"
    }

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        let schema = input_schema(input_schemas, 0, self.name())?;
        let mut fields = Vec::with_capacity(self.columns.len());
        for (src, out) in &self.columns {
            let idx = require(schema, src, self.name())?;
            let mut f = schema.fields[idx].clone();
            f.name = out.clone();
            fields.push(f);
        }
        Ok(OpPlan::new(Schema::new(fields)))
    }

    fn eval(&self, inputs: &[RowBatch]) -> Result<RowBatch, OpError> {
        let input = input(inputs, 0, self.name())?;
        let mut columns = Vec::with_capacity(self.columns.len());
        for (src, out) in &self.columns {
            let idx = require_col(input, src, self.name())?;
            columns.push(Column {
                name: out.clone(),
                values: input.columns[idx].values.clone(),
            });
        }
        Ok(RowBatch { columns })
    }
}
