//! Grouped row selection: per-group maximum created timestamp and latest row.

pub mod dedup;
pub mod latest;

pub use dedup::Dedup;
pub use latest::LatestPerGroup;
