//! Plan representations produced by the planner and run by the executor.
//!
//! Plans are pure data: building one performs no I/O, and the same inputs
//! always produce the same (serializable, hashable) plan. Anything that
//! depends on the rows themselves, such as the prefilter bounds, is recorded
//! symbolically and resolved at execution time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::Schema;
use crate::source::SourceDescriptor;

/// One step of a per-view pipeline. Steps run in order over the source rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewStep {
    /// Rename source columns (field mapping).
    Rename { mapping: BTreeMap<String, String> },

    /// Loose global bound from the entity frame: `T <= max(entity ts)` and,
    /// with a TTL, `T >= min(entity ts) - ttl`. An optimization only.
    Prefilter { column: String, ttl_seconds: u64 },

    /// Fixed inclusive time range on `column`.
    TimeRange {
        column: String,
        start: Option<i64>,
        end: Option<i64>,
    },

    /// Exact per-row point-in-time join against the entity frame.
    RangeJoin {
        join_keys: Vec<String>,
        event_timestamp_column: String,
        ttl_seconds: u64,
        row_id_column: String,
    },

    /// Keep, per `(row id, T)`, only the rows carrying the greatest `C`.
    Dedup {
        row_id_column: String,
        event_timestamp_column: String,
        created_timestamp_column: String,
    },

    /// Keep one row per group: greatest `T`, then greatest `C`, then first seen.
    Latest {
        group_by: Vec<String>,
        event_timestamp_column: String,
        created_timestamp_column: Option<String>,
    },

    /// Select and rename: `(input column, output column)`.
    Project { columns: Vec<(String, String)> },
}

impl ViewStep {
    /// Stable operator key, in the spirit of the exec registry keys.
    pub fn key(&self) -> &'static str {
        match self {
            ViewStep::Rename { .. } => "rename",
            ViewStep::Prefilter { .. } => "prefilter",
            ViewStep::TimeRange { .. } => "time_range",
            ViewStep::RangeJoin { .. } => "range_join",
            ViewStep::Dedup { .. } => "dedup",
            ViewStep::Latest { .. } => "latest",
            ViewStep::Project { .. } => "project",
        }
    }
}

/// How the entity frame is read and decorated before any view runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityPlan {
    /// Registered relation holding the entity rows.
    pub relation: String,
    pub schema: Schema,
    pub timestamp_column: String,
    /// Per-view row id columns to compute: `(row id column, join keys)`.
    pub row_ids: Vec<(String, Vec<String>)>,
}

/// The point-in-time pipeline for one feature view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewPlan {
    pub view: String,
    pub source: SourceDescriptor,
    pub join_keys: Vec<String>,
    pub row_id_column: String,
    pub steps: Vec<ViewStep>,
    /// Output names of the features this view contributes, in order.
    pub output_features: Vec<String>,
}

/// Fan-out over views, fan-in through left joins on the entity frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalPlan {
    pub entity: EntityPlan,
    pub views: Vec<ViewPlan>,
    pub full_feature_names: bool,
    /// Final projection; helper columns never appear here.
    pub output_columns: Vec<String>,
    pub output_schema: Schema,
}

/// Latest row per join key within a fixed time range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestPlan {
    pub source: SourceDescriptor,
    pub steps: Vec<ViewStep>,
    pub output_schema: Schema,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobPlan {
    Historical(HistoricalPlan),
    Latest(LatestPlan),
}

impl JobPlan {
    pub fn output_schema(&self) -> &Schema {
        match self {
            JobPlan::Historical(p) => &p.output_schema,
            JobPlan::Latest(p) => &p.output_schema,
        }
    }

    /// Relations a run reads, in plan order.
    pub fn sources(&self) -> Vec<&SourceDescriptor> {
        match self {
            JobPlan::Historical(p) => p.views.iter().map(|v| &v.source).collect(),
            JobPlan::Latest(p) => vec![&p.source],
        }
    }
}
