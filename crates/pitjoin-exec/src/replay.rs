//! Deterministic replay & provenance helpers.
//!
//! A plan hash is the blake3 digest of the serialized plan. With unchanged
//! inputs, two runs of plans with equal hashes produce equal output digests.

use pitjoin_core::dag::JobPlan;
use pitjoin_core::hash::{hash_serde, Hash256};
use pitjoin_core::manifest::RunManifest;

use crate::ExecError;

pub fn hash_plan(plan: &JobPlan) -> Result<Hash256, ExecError> {
    hash_serde(plan).map_err(|e| ExecError::Hash(e.to_string()))
}

/// Whether two runs executed the same plan and produced the same rows.
pub fn is_replay(a: &RunManifest, b: &RunManifest) -> bool {
    a.plan_hash == b.plan_hash && a.outputs_digest.is_some() && a.outputs_digest == b.outputs_digest
}
