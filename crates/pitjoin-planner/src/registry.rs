//! In-memory feature registry.

use std::collections::BTreeMap;

use pitjoin_core::error::Result;
use pitjoin_core::view::{FeatureViewSpec, OnDemandFeatureView};
use serde::{Deserialize, Serialize};

use crate::context::FeatureRegistry;

/// Definitions of one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectDefinitions {
    pub feature_views: Vec<FeatureViewSpec>,
    pub on_demand_feature_views: Vec<OnDemandFeatureView>,
}

/// Registry backed by plain maps, keyed by project name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryRegistry {
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectDefinitions>,
}

impl InMemoryRegistry {
    /// Load from YAML; see [`crate::dsl::yaml`] for the layout.
    pub fn from_yaml(text: &str) -> Result<Self> {
        crate::dsl::yaml::parse_registry_yaml(text)
    }

    /// Add or replace a feature view.
    pub fn add_feature_view(&mut self, project: &str, view: FeatureViewSpec) {
        let views = &mut self.projects.entry(project.to_string()).or_default().feature_views;
        views.retain(|v| v.name != view.name);
        views.push(view);
    }

    /// Add or replace an on-demand view.
    pub fn add_on_demand_feature_view(&mut self, project: &str, view: OnDemandFeatureView) {
        let views = &mut self
            .projects
            .entry(project.to_string())
            .or_default()
            .on_demand_feature_views;
        views.retain(|v| v.name != view.name);
        views.push(view);
    }
}

impl FeatureRegistry for InMemoryRegistry {
    fn feature_view(&self, project: &str, name: &str) -> Option<FeatureViewSpec> {
        self.projects
            .get(project)?
            .feature_views
            .iter()
            .find(|v| v.name == name)
            .cloned()
    }

    fn on_demand_feature_views(&self, project: &str) -> Vec<OnDemandFeatureView> {
        self.projects
            .get(project)
            .map(|p| p.on_demand_feature_views.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitjoin_core::source::SourceDescriptor;

    #[test]
    fn add_replaces_by_name() {
        let mut reg = InMemoryRegistry::default();
        let v = FeatureViewSpec::new("v", vec!["k".into()], vec!["a".into()], "ts", SourceDescriptor::table("t"));
        reg.add_feature_view("p", v.clone());
        reg.add_feature_view("p", v.with_ttl_seconds(10));
        assert_eq!(reg.projects["p"].feature_views.len(), 1);
        assert_eq!(reg.feature_view("p", "v").unwrap().ttl_seconds, 10);
        assert!(reg.feature_view("q", "v").is_none());
        assert!(reg.on_demand_feature_views("q").is_empty());
    }
}
