//! YAML → registry loader.
//!
//! Example:
//! ```yaml
//! projects:
//!   ranking:
//!     feature_views:
//!       - name: driver_hourly_stats
//!         join_keys: [driver_id]
//!         features: [conv_rate, acc_rate]
//!         event_timestamp_column: event_timestamp
//!         created_timestamp_column: created
//!         ttl_seconds: 86400
//!         source: { kind: table, value: driver_hourly_src }
//!         field_mapping: { ts_raw: event_timestamp }
//!     on_demand_feature_views:
//!       - name: conv_plus_acc
//! ```
//!
//! `source.kind` is `table` or `query`.

use std::collections::BTreeSet;

use pitjoin_core::error::{Error, Result};

use crate::registry::InMemoryRegistry;

/// Parse and sanity-check a registry document.
pub fn parse_registry_yaml(yaml_src: &str) -> Result<InMemoryRegistry> {
    let registry: InMemoryRegistry = serde_yaml::from_str(yaml_src)?;

    for (project, defs) in &registry.projects {
        let mut names = BTreeSet::new();
        for view in &defs.feature_views {
            if !names.insert(view.name.as_str()) {
                return Err(Error::Config(format!(
                    "project '{project}' defines feature view '{}' twice",
                    view.name
                )));
            }
            if view.join_keys.is_empty() {
                return Err(Error::Config(format!(
                    "feature view '{}' declares no join keys",
                    view.name
                )));
            }
        }
        for odfv in &defs.on_demand_feature_views {
            if !names.insert(odfv.name.as_str()) {
                return Err(Error::Config(format!(
                    "project '{project}' defines view '{}' twice",
                    odfv.name
                )));
            }
        }
    }

    Ok(registry)
}
