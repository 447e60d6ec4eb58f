//! Created-timestamp deduplication.
//!
//! For each `(row_id, event_ts)` group keeps only the rows whose created
//! timestamp equals the group maximum. Rows tied on the maximum all survive;
//! the latest selection downstream breaks the tie.

use std::cmp::Ordering;
use std::collections::HashMap;

use pitjoin_core::prelude::Schema;
use pitjoin_core::types::{scalar_cmp, RowBatch};

use crate::plan::OpPlan;
use crate::traits::{input, input_schema, require, require_col, OpError, Operator};

#[derive(Debug, Clone)]
pub struct Dedup {
    pub row_id_column: String,
    pub event_timestamp_column: String,
    pub created_timestamp_column: String,
}

impl Operator for Dedup {
    fn name(&self) -> &'static str {
        "dedup"
    }

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        let schema = input_schema(input_schemas, 0, self.name())?;
        require(schema, &self.row_id_column, self.name())?;
        require(schema, &self.event_timestamp_column, self.name())?;
        require(schema, &self.created_timestamp_column, self.name())?;
        Ok(OpPlan::new(schema.clone()).with_partitions(vec![
            self.row_id_column.clone(),
            self.event_timestamp_column.clone(),
        ]))
    }

    fn eval(&self, inputs: &[RowBatch]) -> Result<RowBatch, OpError> {
        let input = input(inputs, 0, self.name())?;
        let group = [
            require_col(input, &self.row_id_column, self.name())?,
            require_col(input, &self.event_timestamp_column, self.name())?,
        ];
        let created = &input.columns[require_col(input, &self.created_timestamp_column, self.name())?].values;

        let keys: Vec<Vec<u8>> = (0..input.num_rows())
            .map(|row| input.group_key(&group, row))
            .collect();

        let mut max_row: HashMap<&[u8], usize> = HashMap::new();
        for (row, key) in keys.iter().enumerate() {
            max_row
                .entry(key.as_slice())
                .and_modify(|best| {
                    if scalar_cmp(&created[row], &created[*best]) == Ordering::Greater {
                        *best = row;
                    }
                })
                .or_insert(row);
        }

        let keep: Vec<usize> = keys
            .iter()
            .enumerate()
            .filter(|(row, key)| {
                let best = max_row[key.as_slice()];
                scalar_cmp(&created[*row], &created[best]) == Ordering::Equal
            })
            .map(|(row, _)| row)
            .collect();
        Ok(input.take(&keep))
    }
}
