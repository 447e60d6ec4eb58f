#![forbid(unsafe_code)]
//! pitjoin-exec: runs point-in-time plans and exposes the retrieval API.
//!
//! - `backend`: the in-memory execution backend (tables + simple queries)
//! - `runtime`: per-view fan-out, left-join fan-in
//! - `session`: process-wide backend session
//! - `job`/`store`: lazy retrieval jobs and the offline store facade
//! - `columnar`: Arrow export
//! - `replay`: plan hashing and run comparison
//!
//! Feature flags:
//! - `async-scheduler`: tokio-based view fan-out
//! - `failpoints`: named failure injection for retry tests
//! - `tracing`: structured logs and metric spans

pub mod backend;
pub mod columnar;
pub mod failpoints;
pub mod job;
pub mod metrics;
pub mod replay;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod store;

pub use backend::MemoryBackend;
pub use job::RetrievalJob;
pub use runtime::{ExecError, Executor};
pub use session::{default_backend_factory, process_session, Session, SessionHandle};
pub use store::OfflineStore;
