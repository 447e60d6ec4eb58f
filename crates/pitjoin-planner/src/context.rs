//! Query context: the validated, planning-ready view of one retrieval.
//!
//! Feature view definitions come from a read-only registry collaborator; the
//! planner only ever sees the projected `FeatureViewSpec` fields.

use std::collections::BTreeSet;

use pitjoin_core::error::{Error, Result};
use pitjoin_core::schema::Schema;
use pitjoin_core::view::{FeatureViewSpec, OnDemandFeatureView};
use serde::{Deserialize, Serialize};

use crate::entity::{validate_join_keys, PreparedEntityFrame};

/// Read-only lookup of feature view metadata.
pub trait FeatureRegistry: Send + Sync {
    /// The view named `name` in `project`, if any.
    fn feature_view(&self, project: &str, name: &str) -> Option<FeatureViewSpec>;

    /// All on-demand views of `project`.
    fn on_demand_feature_views(&self, project: &str) -> Vec<OnDemandFeatureView>;
}

/// A `"view:feature"` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureRef {
    pub view: String,
    pub feature: String,
}

impl FeatureRef {
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((view, feature))
                if !view.is_empty() && !feature.is_empty() && !feature.contains(':') =>
            {
                Ok(Self {
                    view: view.to_string(),
                    feature: feature.to_string(),
                })
            }
            _ => Err(Error::InvalidFeatureRef(s.to_string())),
        }
    }
}

/// Views selected by a list of feature references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedFeatures {
    /// Views in first-reference order, narrowed to the requested features.
    pub views: Vec<FeatureViewSpec>,
    /// Requested on-demand views, passed through untouched.
    pub on_demand: Vec<OnDemandFeatureView>,
}

/// Resolve `refs` against `registry`.
///
/// Features keep request order within their view and duplicates are
/// dropped. A reference naming an on-demand view selects that view for
/// passthrough.
pub fn resolve_feature_refs(
    registry: &dyn FeatureRegistry,
    project: &str,
    refs: &[&str],
) -> Result<ResolvedFeatures> {
    let on_demand_all = registry.on_demand_feature_views(project);
    let mut resolved = ResolvedFeatures::default();
    // Full feature lists of the resolved views, parallel to `resolved.views`.
    let mut declared: Vec<Vec<String>> = Vec::new();

    for raw in refs {
        let r = FeatureRef::parse(raw)?;

        if let Some(odfv) = on_demand_all.iter().find(|v| v.name == r.view) {
            if !resolved.on_demand.iter().any(|v| v.name == odfv.name) {
                resolved.on_demand.push(odfv.clone());
            }
            continue;
        }

        let pos = match resolved.views.iter().position(|v| v.name == r.view) {
            Some(pos) => pos,
            None => {
                let mut view = registry
                    .feature_view(project, &r.view)
                    .ok_or_else(|| Error::UnknownFeatureView(r.view.clone()))?;
                declared.push(std::mem::take(&mut view.features));
                resolved.views.push(view);
                resolved.views.len() - 1
            }
        };

        if !declared[pos].contains(&r.feature) {
            return Err(Error::UnknownFeature {
                view: r.view,
                feature: r.feature,
            });
        }
        let features = &mut resolved.views[pos].features;
        if !features.contains(&r.feature) {
            features.push(r.feature);
        }
    }

    Ok(resolved)
}

/// Everything the temporal planner needs for one retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryContext {
    pub views: Vec<FeatureViewSpec>,
    pub full_feature_names: bool,
    /// Registered name of the entity frame.
    pub entity_relation: String,
    pub entity_schema: Schema,
    pub entity_timestamp_column: String,
}

impl QueryContext {
    /// Validate `views` against the prepared entity frame.
    pub fn build(
        views: Vec<FeatureViewSpec>,
        entity: &PreparedEntityFrame,
        full_feature_names: bool,
    ) -> Result<Self> {
        let mut names = BTreeSet::new();
        for v in &views {
            if !names.insert(v.name.as_str()) {
                return Err(Error::Plan(format!(
                    "feature view '{}' requested more than once",
                    v.name
                )));
            }
            if v.join_keys.is_empty() {
                return Err(Error::Plan(format!(
                    "feature view '{}' declares no join keys",
                    v.name
                )));
            }
        }
        validate_join_keys(&entity.schema, &views)?;

        Ok(Self {
            views,
            full_feature_names,
            entity_relation: entity.relation.clone(),
            entity_schema: entity.schema.clone(),
            entity_timestamp_column: entity.timestamp_column.clone(),
        })
    }
}
