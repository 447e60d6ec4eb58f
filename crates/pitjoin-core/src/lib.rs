#![forbid(unsafe_code)]
//! pitjoin-core: shared data model for point-in-time feature retrieval.
//!
//! Pure data and contracts only: scalars and row batches, schemas, source
//! descriptors, feature view projections, plan nodes, the backend capability
//! trait, hashing and manifests. No I/O and no threads live here.

pub mod backend;
pub mod config;
pub mod dag;
pub mod error;
pub mod hash;
pub mod manifest;
pub mod prelude;
pub mod schema;
pub mod source;
pub mod time;
pub mod types;
pub mod view;

pub use error::{Error, Result};

/// Engine version recorded in run manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
