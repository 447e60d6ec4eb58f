//! Operator planning surface.

use pitjoin_core::prelude::Schema;
use serde::{Deserialize, Serialize};

/// Operator plan: output schema plus optional partitioning columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpPlan {
    pub output_schema: Schema,

    /// Columns the operator groups or joins on; a distributed backend could
    /// partition by these.
    pub partitions: Vec<String>,
}

impl OpPlan {
    pub fn new(output_schema: Schema) -> Self {
        Self {
            output_schema,
            partitions: vec![],
        }
    }

    pub fn with_partitions(mut self, cols: Vec<String>) -> Self {
        self.partitions = cols;
        self
    }
}
