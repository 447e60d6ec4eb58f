#![forbid(unsafe_code)]
//! pitjoin-operators: the relational building blocks of point-in-time joins
//! (filter/rename/project/range join/left join/dedup/latest).
//!
//! Design intent:
//! - Keep this crate pure and synchronous (no async, no I/O).
//! - Each operator exposes a planning surface (`OpPlan`) so schema errors
//!   surface before any rows are read.
//! - Output row order is a function of the inputs alone.

pub mod plan;
pub mod registry;
pub mod traits;

pub mod aggregate;
pub mod entity;
pub mod filter;
pub mod map;
pub mod project;

pub mod join;

pub use plan::OpPlan;
pub use registry::{instantiate, EntityBounds};
pub use traits::{OpError, Operator};
