//! Latest row per group.
//!
//! Within a group the row with the greatest event timestamp wins; ties go to
//! the greatest created timestamp (when configured) and then to the row seen
//! first. Nulls order below every value. Output keeps winners in input order.

use std::cmp::Ordering;
use std::collections::HashMap;

use pitjoin_core::prelude::Schema;
use pitjoin_core::types::{scalar_cmp, RowBatch, Scalar};

use crate::plan::OpPlan;
use crate::traits::{input, input_schema, require, require_col, OpError, Operator};

#[derive(Debug, Clone)]
pub struct LatestPerGroup {
    pub group_by: Vec<String>,
    pub event_timestamp_column: String,
    pub created_timestamp_column: Option<String>,
}

impl LatestPerGroup {
    fn order_columns(&self) -> Vec<&str> {
        std::iter::once(self.event_timestamp_column.as_str())
            .chain(self.created_timestamp_column.as_deref())
            .collect()
    }
}

fn newer(a: &[&Scalar], b: &[&Scalar]) -> bool {
    for (x, y) in a.iter().zip(b) {
        match scalar_cmp(x, y) {
            Ordering::Equal => continue,
            ord => return ord == Ordering::Greater,
        }
    }
    false
}

impl Operator for LatestPerGroup {
    fn name(&self) -> &'static str {
        "latest"
    }

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        let schema = input_schema(input_schemas, 0, self.name())?;
        for c in self.group_by.iter().map(String::as_str).chain(self.order_columns()) {
            require(schema, c, self.name())?;
        }
        Ok(OpPlan::new(schema.clone()).with_partitions(self.group_by.clone()))
    }

    fn eval(&self, inputs: &[RowBatch]) -> Result<RowBatch, OpError> {
        let input = input(inputs, 0, self.name())?;
        let group = input.column_indices(&self.group_by)?;
        let order = self
            .order_columns()
            .into_iter()
            .map(|c| require_col(input, c, self.name()))
            .collect::<Result<Vec<_>, _>>()?;
        let order_values = |row: usize| {
            order
                .iter()
                .map(|&ci| &input.columns[ci].values[row])
                .collect::<Vec<&Scalar>>()
        };

        let mut best: HashMap<Vec<u8>, usize> = HashMap::new();
        for row in 0..input.num_rows() {
            let slot = best.entry(input.group_key(&group, row)).or_insert(row);
            if newer(&order_values(row), &order_values(*slot)) {
                *slot = row;
            }
        }

        let mut keep: Vec<usize> = best.into_values().collect();
        keep.sort_unstable();
        Ok(input.take(&keep))
    }
}
