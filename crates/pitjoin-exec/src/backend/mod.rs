//! Execution backends shipped with the engine.

pub mod memory;
pub mod query;

pub use memory::MemoryBackend;
