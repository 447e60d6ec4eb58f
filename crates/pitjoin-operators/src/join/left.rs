//! Hash left outer join.
//!
//! Every left row appears in the output, in left order. Right columns are
//! filled with nulls when nothing matches. Right key columns are dropped and
//! a right name that is already taken becomes `{name}_right`, then
//! `{name}_right_2`, `{name}_right_3`, ... until it is unique.

use std::collections::{HashMap, HashSet};

use pitjoin_core::prelude::Schema;
use pitjoin_core::types::{Column, RowBatch, Scalar};

use crate::plan::OpPlan;
use crate::traits::{input, input_schema, require, OpError, Operator};

#[derive(Debug, Default, Clone)]
pub struct LeftJoin {
    /// `(left column, right column)` equality pairs.
    pub on: Vec<(String, String)>,
}

impl LeftJoin {
    pub fn on(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            on: vec![(left.into(), right.into())],
        }
    }

    fn right_keys(&self) -> Vec<String> {
        self.on.iter().map(|(_, r)| r.clone()).collect()
    }

    fn left_keys(&self) -> Vec<String> {
        self.on.iter().map(|(l, _)| l.clone()).collect()
    }

    /// Output names for the kept right columns, in order. Never repeats a
    /// left name or an earlier right name.
    fn right_names<'a>(
        left_names: impl IntoIterator<Item = &'a str>,
        kept: impl IntoIterator<Item = &'a str>,
    ) -> Vec<String> {
        let mut taken: HashSet<String> = left_names.into_iter().map(str::to_string).collect();
        let mut out = Vec::new();
        for name in kept {
            let mut candidate = name.to_string();
            let mut n = 1;
            while taken.contains(&candidate) {
                candidate = if n == 1 {
                    format!("{name}_right")
                } else {
                    format!("{name}_right_{n}")
                };
                n += 1;
            }
            taken.insert(candidate.clone());
            out.push(candidate);
        }
        out
    }
}

impl Operator for LeftJoin {
    fn name(&self) -> &'static str {
        "left_join"
    }

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        if self.on.is_empty() {
            return Err(OpError::Plan("left_join: no join columns".into()));
        }
        let left = input_schema(input_schemas, 0, self.name())?;
        let right = input_schema(input_schemas, 1, self.name())?;
        for (l, r) in &self.on {
            require(left, l, self.name())?;
            require(right, r, self.name())?;
        }

        let right_keys = self.right_keys();
        let kept: Vec<_> = right
            .fields
            .iter()
            .filter(|f| !right_keys.contains(&f.name))
            .collect();
        let names = Self::right_names(
            left.fields.iter().map(|f| f.name.as_str()),
            kept.iter().map(|f| f.name.as_str()),
        );
        let mut out = left.clone();
        for (f, name) in kept.into_iter().zip(names) {
            let mut f = f.clone();
            f.name = name;
            f.nullable = true;
            out.fields.push(f);
        }
        Ok(OpPlan::new(out).with_partitions(self.left_keys()))
    }

    fn eval(&self, inputs: &[RowBatch]) -> Result<RowBatch, OpError> {
        let left = input(inputs, 0, self.name())?;
        let right = input(inputs, 1, self.name())?;
        let left_idx = left.column_indices(&self.left_keys())?;
        let right_idx = right.column_indices(&self.right_keys())?;

        let mut build: HashMap<Vec<u8>, Vec<usize>> = HashMap::new();
        for row in 0..right.num_rows() {
            if let Some(key) = right.row_key(&right_idx, row) {
                build.entry(key).or_default().push(row);
            }
        }

        // `None` on the right side marks an unmatched left row.
        let mut pairs: Vec<(usize, Option<usize>)> = Vec::with_capacity(left.num_rows());
        for row in 0..left.num_rows() {
            match left.row_key(&left_idx, row).and_then(|k| build.get(&k)) {
                Some(matches) => pairs.extend(matches.iter().map(|&r| (row, Some(r)))),
                None => pairs.push((row, None)),
            }
        }

        let left_rows: Vec<usize> = pairs.iter().map(|(l, _)| *l).collect();
        let mut out = left.take(&left_rows);
        let kept: Vec<&Column> = right
            .columns
            .iter()
            .enumerate()
            .filter(|(ci, _)| !right_idx.contains(ci))
            .map(|(_, c)| c)
            .collect();
        let names = Self::right_names(
            left.columns.iter().map(|c| c.name.as_str()),
            kept.iter().map(|c| c.name.as_str()),
        );
        for (col, name) in kept.into_iter().zip(names) {
            let values = pairs
                .iter()
                .map(|(_, r)| r.map_or(Scalar::Null, |r| col.values[r].clone()))
                .collect();
            out.columns.push(Column::new(name, values));
        }
        Ok(out)
    }
}
