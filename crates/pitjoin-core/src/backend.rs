//! Execution backend capability interface.
//!
//! Concrete backends live in `pitjoin-exec` (or outside this workspace). Core
//! keeps only the trait so the planner can discover schemas and register
//! entity frames without depending on any engine.

use crate::dag::JobPlan;
use crate::error::Result;
use crate::schema::Schema;
use crate::source::SourceDescriptor;
use crate::types::Relation;

/// What the core needs from an execution engine.
///
/// Invariants:
/// - `discover_schema` on a missing table fails with `Error::SourceNotFound`.
/// - `load` returns rows in a stable scan order for unchanged inputs.
/// - Every failure during `load`/`submit` is reported as-is; callers do not retry.
pub trait ExecutionBackend: Send + Sync {
    /// Stable backend name for logs and manifests.
    fn name(&self) -> &str;

    /// Column names and types of the relation the descriptor resolves to.
    fn discover_schema(&self, source: &SourceDescriptor) -> Result<Schema>;

    /// Make a relation addressable by `name` (replacing any previous one).
    fn register(&self, name: &str, relation: Relation) -> Result<()>;

    /// Drop a registered relation; unknown names are ignored.
    fn deregister(&self, name: &str) -> Result<()>;

    /// Scan the relation the descriptor resolves to.
    fn load(&self, source: &SourceDescriptor) -> Result<Relation>;

    /// Run a whole plan natively. `Ok(None)` means the backend has no native
    /// plan execution and the in-process engine should evaluate it.
    fn submit(&self, _plan: &JobPlan) -> Result<Option<Relation>> {
        Ok(None)
    }
}
