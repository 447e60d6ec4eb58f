//! Point-in-time range join.
//!
//! Pairs every source row with each entity row that shares its join keys and
//! whose timestamp satisfies `T <= entity_ts` and, when `ttl > 0`,
//! `T >= entity_ts - ttl`. Inputs: `inputs[0]` is the feature source,
//! `inputs[1]` the distinct entity subset `(join keys.., entity_timestamp, row_id)`.
//!
//! Output rows follow source scan order; matches for one source row follow
//! entity timestamp order, ties in entity order.

use std::collections::HashMap;

use pitjoin_core::prelude::Schema;
use pitjoin_core::schema::{DataType, Field};
use pitjoin_core::types::{Column, RowBatch};
use pitjoin_core::view::ENTITY_TIMESTAMP_COLUMN;

use crate::plan::OpPlan;
use crate::traits::{input, input_schema, require, require_col, OpError, Operator};

#[derive(Debug, Clone)]
pub struct RangeJoin {
    pub join_keys: Vec<String>,
    /// Event timestamp column of the source.
    pub event_timestamp_column: String,
    /// Lookback window in microseconds; 0 means unbounded.
    pub ttl_micros: i64,
    pub row_id_column: String,
}

impl RangeJoin {
    /// Upper bound of entity timestamps a source row at `ts` may match.
    fn window_end(&self, ts: i64) -> Option<i64> {
        (self.ttl_micros > 0).then(|| ts.saturating_add(self.ttl_micros))
    }
}

impl Operator for RangeJoin {
    fn name(&self) -> &'static str {
        "range_join"
    }

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        let source = input_schema(input_schemas, 0, self.name())?;
        let entity = input_schema(input_schemas, 1, self.name())?;

        for k in &self.join_keys {
            let s = require(source, k, self.name())?;
            let e = require(entity, k, self.name())?;
            let (st, et) = (source.fields[s].data_type, entity.fields[e].data_type);
            let ints = |t: DataType| matches!(t, DataType::Int32 | DataType::Int64);
            if st != et && !(ints(st) && ints(et)) {
                return Err(OpError::Schema(format!(
                    "join key '{k}' is {st:?} in the source but {et:?} in the entity frame"
                )));
            }
        }
        let ts = require(source, &self.event_timestamp_column, self.name())?;
        if !source.fields[ts].data_type.is_timestamp() {
            return Err(OpError::Schema(format!(
                "event timestamp column '{}' is not a timestamp",
                self.event_timestamp_column
            )));
        }
        require(entity, ENTITY_TIMESTAMP_COLUMN, self.name())?;
        require(entity, &self.row_id_column, self.name())?;

        let mut out = source.clone();
        for helper in [ENTITY_TIMESTAMP_COLUMN, self.row_id_column.as_str()] {
            if out.contains(helper) {
                return Err(OpError::Schema(format!(
                    "source already has reserved column '{helper}'"
                )));
            }
        }
        out.fields
            .push(Field::new(ENTITY_TIMESTAMP_COLUMN, DataType::Timestamp, false));
        out.fields
            .push(Field::new(self.row_id_column.clone(), DataType::Utf8, false));
        Ok(OpPlan::new(out).with_partitions(self.join_keys.clone()))
    }

    fn eval(&self, inputs: &[RowBatch]) -> Result<RowBatch, OpError> {
        let source = input(inputs, 0, self.name())?;
        let entity = input(inputs, 1, self.name())?;

        let source_keys = source.column_indices(&self.join_keys)?;
        let entity_keys = entity.column_indices(&self.join_keys)?;
        let source_ts = require_col(source, &self.event_timestamp_column, self.name())?;
        let entity_ts = require_col(entity, ENTITY_TIMESTAMP_COLUMN, self.name())?;
        let entity_id = require_col(entity, &self.row_id_column, self.name())?;

        // Build side: key -> entity rows sorted by timestamp. Rows with a null
        // key, timestamp, or row id can never match.
        let mut build: HashMap<Vec<u8>, Vec<(i64, usize)>> = HashMap::new();
        for row in 0..entity.num_rows() {
            if entity.columns[entity_id].values[row].is_null() {
                continue;
            }
            let Some(ts) = entity.columns[entity_ts].values[row].as_timestamp() else {
                continue;
            };
            if let Some(key) = entity.row_key(&entity_keys, row) {
                build.entry(key).or_default().push((ts, row));
            }
        }
        for rows in build.values_mut() {
            rows.sort_by_key(|(ts, _)| *ts);
        }

        let mut left = Vec::new();
        let mut right = Vec::new();
        for row in 0..source.num_rows() {
            let Some(ts) = source.columns[source_ts].values[row].as_timestamp() else {
                continue;
            };
            let Some(key) = source.row_key(&source_keys, row) else {
                continue;
            };
            let Some(candidates) = build.get(&key) else {
                continue;
            };
            let lo = candidates.partition_point(|(ets, _)| *ets < ts);
            let hi = match self.window_end(ts) {
                Some(end) => candidates.partition_point(|(ets, _)| *ets <= end),
                None => candidates.len(),
            };
            for &(_, erow) in candidates.get(lo..hi).unwrap_or(&[]) {
                left.push(row);
                right.push(erow);
            }
        }

        let mut out = source.take(&left);
        let picked = entity.take(&right);
        out.columns.push(Column::new(
            ENTITY_TIMESTAMP_COLUMN,
            picked.columns[entity_ts].values.clone(),
        ));
        out.columns.push(Column::new(
            self.row_id_column.clone(),
            picked.columns[entity_id].values.clone(),
        ));
        Ok(out)
    }
}
