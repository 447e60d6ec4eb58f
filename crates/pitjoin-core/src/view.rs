//! Planning-ready projection of a feature view definition.
//!
//! Registries own the full definitions; the core only ever sees these fields.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::source::SourceDescriptor;

/// Per-view helper column carrying the EntityRowUniqueId.
pub const ROW_ID_SUFFIX: &str = "__entity_row_unique_id";

/// Unified entity event timestamp helper column.
pub const ENTITY_TIMESTAMP_COLUMN: &str = "entity_timestamp";

/// Separator between feature view name and feature in full feature names.
pub const FULL_NAME_SEPARATOR: &str = "__";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureViewSpec {
    pub name: String,
    /// Entity join key columns, in declaration order.
    pub join_keys: Vec<String>,
    pub features: Vec<String>,
    pub event_timestamp_column: String,
    #[serde(default)]
    pub created_timestamp_column: Option<String>,
    /// Maximum feature age in seconds; 0 disables the TTL filter.
    #[serde(default)]
    pub ttl_seconds: u64,
    pub source: SourceDescriptor,
    /// Source column → logical column renames applied right after the scan.
    #[serde(default)]
    pub field_mapping: BTreeMap<String, String>,
}

impl FeatureViewSpec {
    pub fn new(
        name: impl Into<String>,
        join_keys: Vec<String>,
        features: Vec<String>,
        event_timestamp_column: impl Into<String>,
        source: SourceDescriptor,
    ) -> Self {
        Self {
            name: name.into(),
            join_keys,
            features,
            event_timestamp_column: event_timestamp_column.into(),
            created_timestamp_column: None,
            ttl_seconds: 0,
            source,
            field_mapping: BTreeMap::new(),
        }
    }

    pub fn with_created_timestamp(mut self, column: impl Into<String>) -> Self {
        self.created_timestamp_column = Some(column.into());
        self
    }

    pub fn with_ttl_seconds(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    pub fn with_field_mapping(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.field_mapping.insert(from.into(), to.into());
        self
    }

    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_seconds > 0).then(|| Duration::from_secs(self.ttl_seconds))
    }

    pub fn row_id_column(&self) -> String {
        format!("{}{}", self.name, ROW_ID_SUFFIX)
    }

    /// Output column name for one of this view's features.
    pub fn output_name(&self, feature: &str, full_feature_names: bool) -> String {
        if full_feature_names {
            format!("{}{}{}", self.name, FULL_NAME_SEPARATOR, feature)
        } else {
            feature.to_string()
        }
    }
}

/// Derived view applied downstream; carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnDemandFeatureView {
    pub name: String,
    #[serde(default)]
    pub definition: serde_json::Value,
}
