#![forbid(unsafe_code)]
//! pitjoin-planner: entity frame + feature views → point-in-time plan.
//!
//! Design:
//! - We reuse `pitjoin-core::dag::{HistoricalPlan, LatestPlan, ViewStep}`.
//! - This crate adds:
//!     * entity frame preparation (registration, timestamp inference)
//!     * the query context and the read-only registry collaborator
//!     * per-view temporal join planning and the multi-view merge
//!     * pull-latest planning
//!     * a YAML registry loader
//! - Every step is validated through the operators' own planning surface,
//!   so shape errors surface here and never during execution.
//!
//! NOTE: Planning never scans data; the backend is only asked for schemas
//! (and to register the entity frame).

pub mod context;
pub mod dsl;
pub mod entity;
pub mod latest;
pub mod lower;
pub mod merge;
pub mod registry;
pub mod temporal;

pub use context::{resolve_feature_refs, FeatureRef, FeatureRegistry, QueryContext, ResolvedFeatures};
pub use dsl::yaml::parse_registry_yaml;
pub use entity::{EntityFramePreparer, EntityInput, PreparedEntityFrame};
pub use latest::{plan_pull_latest, PullLatestRequest};
pub use lower::plan_historical;
pub use merge::{plan_merge, MergePlan};
pub use registry::InMemoryRegistry;
pub use temporal::{plan_view, PlannedView};
