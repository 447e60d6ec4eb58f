//! Convenient re-exports for downstream crates.

pub use crate::backend::ExecutionBackend;
pub use crate::config::SessionConfig;
pub use crate::dag::{EntityPlan, HistoricalPlan, JobPlan, LatestPlan, ViewPlan, ViewStep};
pub use crate::error::{Error, Result};
pub use crate::manifest::{ManifestId, RunManifest};
pub use crate::schema::{DataType, Field, Schema};
pub use crate::source::SourceDescriptor;
pub use crate::types::{Column, Relation, RowBatch, Scalar};
pub use crate::view::{FeatureViewSpec, OnDemandFeatureView};
