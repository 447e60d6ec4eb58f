use thiserror::Error;

/// Canonical result for core and planning.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported entity frame input: {0}")]
    InvalidInputType(String),

    #[error("feature view '{view}' requires join key '{key}' which is missing from the entity frame")]
    MissingJoinKey { view: String, key: String },

    #[error("cannot infer entity event timestamp column: {0}")]
    AmbiguousTimestamp(String),

    #[error("data source not found: {0}")]
    SourceNotFound(String),

    #[error("source descriptor could not be decoded: {0}")]
    DescriptorCorrupt(String),

    #[error("invalid feature reference '{0}', expected 'view:feature'")]
    InvalidFeatureRef(String),

    #[error("unknown feature view '{0}'")]
    UnknownFeatureView(String),

    #[error("feature view '{view}' has no feature '{feature}'")]
    UnknownFeature { view: String, feature: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Planning error: {0}")]
    Plan(String),

    #[error("Hashing error: {0}")]
    Hash(String),

    /// Backend failures are carried through as-is; the core never retries them.
    #[error("backend error: {0}")]
    Backend(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(e.to_string())
    }
}
