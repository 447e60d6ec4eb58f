#![forbid(unsafe_code)]
//! pitjoin: point-in-time correct feature retrieval.
//!
//! Joins timestamped entity rows against feature view sources so that each
//! entity row sees, per view, only the latest feature row at or before its
//! own timestamp (and within the view's TTL).
//!
//! This crate only re-exports the workspace members; see `pitjoin-exec` for
//! the retrieval entry points.

pub use pitjoin_core as core;
pub use pitjoin_exec as exec;
pub use pitjoin_operators as operators;
pub use pitjoin_planner as planner;

pub use pitjoin_core::config::SessionConfig;
pub use pitjoin_core::source::SourceDescriptor;
pub use pitjoin_core::view::{FeatureViewSpec, OnDemandFeatureView};
pub use pitjoin_core::{Error, Result};
pub use pitjoin_exec::{ExecError, MemoryBackend, OfflineStore, RetrievalJob, Session};
pub use pitjoin_planner::{EntityInput, FeatureRegistry, InMemoryRegistry, PullLatestRequest};
