//! Row filters: simple predicates and inclusive time bounds.
//!
//! `Filter` is a conjunction of `col OP literal` comparisons. Literals are
//! kept as text and parsed against the column's type at evaluation.

use std::fmt;

use pitjoin_core::prelude::Schema;
use pitjoin_core::time::parse_timestamp;
use pitjoin_core::types::{RowBatch, Scalar};

use crate::plan::OpPlan;
use crate::traits::{input, input_schema, require, require_col, OpError, Operator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CmpOp {
    /// The operator with its operands swapped: `lit < col` is `col > lit`.
    pub fn flipped(self) -> Self {
        match self {
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::LtEq => CmpOp::GtEq,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::GtEq => CmpOp::LtEq,
            other => other,
        }
    }

    fn apply<T: PartialOrd + ?Sized>(self, lhs: &T, rhs: &T) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::NotEq => lhs != rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::LtEq => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::GtEq => lhs >= rhs,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CmpOp::Eq => "=",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtEq => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtEq => ">=",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub op: CmpOp,
    pub literal: String,
}

impl Predicate {
    pub fn new(column: impl Into<String>, op: CmpOp, literal: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op,
            literal: literal.into(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Filter {
    pub predicates: Vec<Predicate>,
}

impl Filter {
    pub fn all(predicates: Vec<Predicate>) -> Self {
        Self { predicates }
    }
}

impl Operator for Filter {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        let schema = input_schema(input_schemas, 0, self.name())?;
        for p in &self.predicates {
            require(schema, &p.column, self.name())?;
        }
        Ok(OpPlan::new(schema.clone()))
    }

    fn eval(&self, inputs: &[RowBatch]) -> Result<RowBatch, OpError> {
        let input = input(inputs, 0, self.name())?;

        // If no predicate, pass through
        if self.predicates.is_empty() {
            return Ok(input.clone());
        }

        let cols = self
            .predicates
            .iter()
            .map(|p| require_col(input, &p.column, self.name()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut keep = Vec::new();
        'rows: for row in 0..input.num_rows() {
            for (p, &ci) in self.predicates.iter().zip(&cols) {
                if !eval_predicate(&input.columns[ci].values[row], p.op, &p.literal)? {
                    continue 'rows;
                }
            }
            keep.push(row);
        }

        Ok(input.take(&keep))
    }
}

/// Inclusive `[lower, upper]` bound on a timestamp column; null timestamps
/// never pass.
#[derive(Debug, Clone)]
pub struct TimeBound {
    pub column: String,
    pub lower: Option<i64>,
    pub upper: Option<i64>,
}

impl TimeBound {
    pub fn contains(&self, ts: i64) -> bool {
        self.lower.map_or(true, |lo| ts >= lo) && self.upper.map_or(true, |hi| ts <= hi)
    }
}

impl Operator for TimeBound {
    fn name(&self) -> &'static str {
        "time_bound"
    }

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        let schema = input_schema(input_schemas, 0, self.name())?;
        let idx = require(schema, &self.column, self.name())?;
        if !schema.fields[idx].data_type.is_timestamp() {
            return Err(OpError::Schema(format!(
                "time_bound: column '{}' is {:?}, not a timestamp",
                self.column, schema.fields[idx].data_type
            )));
        }
        Ok(OpPlan::new(schema.clone()))
    }

    fn eval(&self, inputs: &[RowBatch]) -> Result<RowBatch, OpError> {
        let input = input(inputs, 0, self.name())?;
        let ci = require_col(input, &self.column, self.name())?;
        let keep: Vec<usize> = input.columns[ci]
            .values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.as_timestamp().map_or(false, |ts| self.contains(ts)))
            .map(|(i, _)| i)
            .collect();
        Ok(input.take(&keep))
    }
}

fn parse_lit<T: std::str::FromStr>(literal: &str, ty: &str) -> Result<T, OpError> {
    literal
        .parse::<T>()
        .map_err(|_| OpError::Exec(format!("cannot parse '{}' as {}", literal, ty)))
}

/// Evaluate one comparison; null never passes.
fn eval_predicate(val: &Scalar, op: CmpOp, literal: &str) -> Result<bool, OpError> {
    use Scalar::*;

    match val {
        Null => Ok(false),
        Bool(b) => {
            let lit = parse_lit::<bool>(literal, "bool")?;
            match op {
                CmpOp::Eq => Ok(*b == lit),
                CmpOp::NotEq => Ok(*b != lit),
                _ => Err(OpError::Exec(format!("unsupported op '{}' for bool", op))),
            }
        }
        I32(i) => Ok(op.apply(i, &parse_lit::<i32>(literal, "i32")?)),
        I64(i) => Ok(op.apply(i, &parse_lit::<i64>(literal, "i64")?)),
        F32(f) => Ok(op.apply(f, &parse_lit::<f32>(literal, "f32")?)),
        F64(f) => Ok(op.apply(f, &parse_lit::<f64>(literal, "f64")?)),
        Str(s) => Ok(op.apply(s.as_str(), literal)),
        Timestamp(t) => {
            let lit = parse_timestamp(literal).ok_or_else(|| {
                OpError::Exec(format!("cannot parse '{}' as timestamp", literal))
            })?;
            Ok(op.apply(t, &lit))
        }
        Bin(_) => Err(OpError::Exec("cannot filter on binary data".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitjoin_core::types::Column;

    fn batch() -> RowBatch {
        RowBatch::new(vec![
            Column::new("id", vec![Scalar::I64(1), Scalar::I64(2), Scalar::I64(3)]),
            Column::new(
                "city",
                vec![
                    Scalar::Str("oslo".into()),
                    Scalar::Null,
                    Scalar::Str("rome".into()),
                ],
            ),
            Column::new(
                "ts",
                vec![
                    Scalar::Timestamp(parse_timestamp("2023-01-01").unwrap()),
                    Scalar::Null,
                    Scalar::Timestamp(parse_timestamp("2023-01-09").unwrap()),
                ],
            ),
        ])
    }

    #[test]
    fn conjunction_of_predicates() {
        let f = Filter::all(vec![
            Predicate::new("id", CmpOp::GtEq, "2"),
            Predicate::new("city", CmpOp::Eq, "rome"),
        ]);
        assert_eq!(f.predicates.len(), 2);
        let out = f.eval(&[batch()]).unwrap();
        assert_eq!(out.num_rows(), 1);
        assert_eq!(out.columns[0].values[0], Scalar::I64(3));
    }

    #[test]
    fn timestamp_literals_compare_as_instants() {
        let f = Filter::all(vec![Predicate::new("ts", CmpOp::Lt, "2023-01-05")]);
        let out = f.eval(&[batch()]).unwrap();
        assert_eq!(out.num_rows(), 1);
        assert_eq!(out.columns[0].values[0], Scalar::I64(1));
    }

    #[test]
    fn literal_of_the_wrong_type_fails() {
        let f = Filter::all(vec![Predicate::new("id", CmpOp::Gt, "abc")]);
        assert!(matches!(f.eval(&[batch()]), Err(OpError::Exec(_))));
    }

    #[test]
    fn flipping_swaps_only_ordering_ops() {
        assert_eq!(CmpOp::Lt.flipped(), CmpOp::Gt);
        assert_eq!(CmpOp::GtEq.flipped(), CmpOp::LtEq);
        assert_eq!(CmpOp::NotEq.flipped(), CmpOp::NotEq);
    }

    #[test]
    fn plan_rejects_unknown_columns() {
        let schema = batch().infer_schema().unwrap();
        let f = Filter::all(vec![Predicate::new("nope", CmpOp::Gt, "1")]);
        assert!(matches!(f.plan(&[schema]), Err(OpError::Schema(_))));
    }

    #[test]
    fn time_bound_is_inclusive_and_drops_nulls() {
        let op = TimeBound {
            column: "ts".into(),
            lower: None,
            upper: parse_timestamp("2023-01-09"),
        };
        let out = op.eval(&[batch()]).unwrap();
        assert_eq!(out.num_rows(), 2);

        let op = TimeBound {
            column: "ts".into(),
            lower: parse_timestamp("2023-01-02"),
            upper: None,
        };
        let out = op.eval(&[batch()]).unwrap();
        assert_eq!(out.columns[0].values, vec![Scalar::I64(3)]);
    }
}
