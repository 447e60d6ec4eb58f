//! Session configuration that downstream crates can serialize/deserialize.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Settings every session must carry regardless of what the caller supplied.
pub const REQUIRED_CONF: &[(&str, &str)] = &[("pitjoin.timestamps.timezone", "UTC")];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Backend selector (e.g. "memory").
    pub backend: String,

    /// Upper bound on feature views evaluated at once.
    pub max_parallel_views: usize,

    /// Prefix for relations registered from entity frames.
    pub entity_relation_prefix: String,

    /// Free-form overlay handed to the backend when the session is created.
    pub conf: BTreeMap<String, String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            max_parallel_views: 4,
            entity_relation_prefix: "entity_frame".to_string(),
            conf: BTreeMap::new(),
        }
    }
}

impl SessionConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `PITJOIN_BACKEND`: backend selector
    /// - `PITJOIN_MAX_PARALLEL_VIEWS`: per-view fan-out bound
    /// - `PITJOIN_ENTITY_RELATION_PREFIX`: registered entity relation prefix
    /// - `PITJOIN_CONF_<KEY>`: one overlay entry, key lower-cased with `_` → `.`
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    fn from_vars(vars: impl Iterator<Item = (String, String)>) -> Self {
        let mut cfg = Self::default();

        for (k, v) in vars {
            match k.as_str() {
                "PITJOIN_BACKEND" => cfg.backend = v,
                "PITJOIN_MAX_PARALLEL_VIEWS" => {
                    if let Ok(n) = v.parse::<usize>() {
                        cfg.max_parallel_views = n;
                    }
                }
                "PITJOIN_ENTITY_RELATION_PREFIX" => cfg.entity_relation_prefix = v,
                _ => {
                    if let Some(key) = k.strip_prefix("PITJOIN_CONF_") {
                        cfg.conf
                            .insert(key.to_ascii_lowercase().replace('_', "."), v);
                    }
                }
            }
        }

        cfg
    }

    /// Parse a YAML document; missing keys take their defaults.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Overlay with the settings the engine relies on.
    pub fn with_required_conf(mut self) -> Self {
        for (k, v) in REQUIRED_CONF {
            self.conf.insert((*k).to_string(), (*v).to_string());
        }
        self
    }

    /// Whether every required setting is present with its required value.
    pub fn has_required_conf(&self) -> bool {
        REQUIRED_CONF
            .iter()
            .all(|(k, v)| self.conf.get(*k).map(String::as_str) == Some(*v))
    }

    /// Parallelism actually used; zero is treated as one.
    pub fn effective_parallelism(&self) -> usize {
        self.max_parallel_views.max(1)
    }
}
