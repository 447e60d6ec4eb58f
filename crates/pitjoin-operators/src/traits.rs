//! Operator trait + common interfaces.
//!
//! The executor calls `plan(...)` to obtain the output schema, then invokes
//! `eval(...)` once per input set. Operators are synchronous and pure: the
//! same inputs always give the same output, row order included.

use pitjoin_core::prelude::Schema;
use pitjoin_core::types::RowBatch;

use crate::plan::OpPlan;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("planning error: {0}")]
    Plan(String),

    #[error("execution error: {0}")]
    Exec(String),

    #[error("schema error: {0}")]
    Schema(String),
}

impl From<pitjoin_core::Error> for OpError {
    fn from(e: pitjoin_core::Error) -> Self {
        match e {
            pitjoin_core::Error::Schema(msg) => OpError::Schema(msg),
            other => OpError::Exec(other.to_string()),
        }
    }
}

impl From<OpError> for pitjoin_core::Error {
    fn from(e: OpError) -> Self {
        match e {
            OpError::Plan(msg) => pitjoin_core::Error::Plan(msg),
            OpError::Schema(msg) => pitjoin_core::Error::Schema(msg),
            OpError::Exec(msg) => pitjoin_core::Error::Backend(msg),
        }
    }
}

/// Trait that all operators must implement.
///
/// Invariants:
/// - `eval` must be deterministic given the same inputs.
/// - `eval` output columns match `plan(..).output_schema` by name and order.
pub trait Operator: Send + Sync {
    /// Human-readable operator name (stable).
    fn name(&self) -> &'static str;

    /// Given input schemas, return the output schema and partitioning hints.
    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError>;

    /// Evaluate over full inputs. Unary ops read `inputs[0]`; binary ops
    /// (joins) read `inputs[0]` as the probe side and `inputs[1]` as build.
    fn eval(&self, inputs: &[RowBatch]) -> Result<RowBatch, OpError>;
}

/// Fetch input `idx` or fail with an operator-specific message.
pub(crate) fn input<'a, T>(inputs: &'a [T], idx: usize, op: &str) -> Result<&'a T, OpError> {
    inputs
        .get(idx)
        .ok_or_else(|| OpError::Exec(format!("{op}: missing input {idx}")))
}

/// Fetch schema `idx` or fail at planning time.
pub(crate) fn input_schema<'a>(
    schemas: &'a [Schema],
    idx: usize,
    op: &str,
) -> Result<&'a Schema, OpError> {
    schemas
        .get(idx)
        .ok_or_else(|| OpError::Plan(format!("{op}: missing input schema {idx}")))
}

/// Require `name` in `schema`, returning its index.
pub(crate) fn require(schema: &Schema, name: &str, op: &str) -> Result<usize, OpError> {
    schema
        .index_of(name)
        .ok_or_else(|| OpError::Schema(format!("{op}: column '{name}' not found")))
}

/// Require `name` in a batch, returning its index.
pub(crate) fn require_col(batch: &RowBatch, name: &str, op: &str) -> Result<usize, OpError> {
    batch
        .column_index(name)
        .ok_or_else(|| OpError::Schema(format!("{op}: column '{name}' not found")))
}
