//! Run manifest emitted by every materialization.
//!
//! Two runs of the same plan over unchanged inputs carry the same
//! `plan_hash` and the same `outputs_digest`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::Hash256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub id: ManifestId,

    /// Stable hash of the serialized plan.
    pub plan_hash: Hash256,

    /// Backend that executed the plan.
    pub backend: String,

    /// Engine version string for provenance.
    pub engine_version: String,

    /// Order-independent digest of the produced rows.
    pub outputs_digest: Option<Hash256>,

    pub output_rows: usize,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl RunManifest {
    pub fn new(plan_hash: Hash256, backend: impl Into<String>, started_ms: u64) -> Self {
        Self {
            id: ManifestId(Uuid::new_v4()),
            plan_hash,
            backend: backend.into(),
            engine_version: crate::VERSION.to_string(),
            outputs_digest: None,
            output_rows: 0,
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn finish(mut self, finished_ms: u64, outputs_digest: Hash256, output_rows: usize) -> Self {
        self.finished_ms = finished_ms;
        self.outputs_digest = Some(outputs_digest);
        self.output_rows = output_rows;
        self
    }
}
