//! Runtime: evaluate a `JobPlan` against a backend.
//!
//! Historical plans fan out one pipeline per feature view and fan back in
//! through left joins on the decorated entity frame. All backend I/O of a
//! retrieval happens here; a failed run leaves nothing behind, so callers can
//! simply run again.

use std::sync::Arc;

use thiserror::Error;

use pitjoin_core::backend::ExecutionBackend;
use pitjoin_core::dag::{HistoricalPlan, JobPlan, LatestPlan, ViewPlan, ViewStep};
use pitjoin_core::source::SourceDescriptor;
use pitjoin_core::types::RowBatch;
use pitjoin_core::view::ENTITY_TIMESTAMP_COLUMN;

use pitjoin_operators::entity::{Distinct, EntityRowIds};
use pitjoin_operators::join::LeftJoin;
use pitjoin_operators::project::Project;
use pitjoin_operators::registry::{instantiate, EntityBounds};
use pitjoin_operators::{OpError, Operator};

use pitjoin_planner::temporal::entity_subset_columns_for;

use crate::fail_point;
use crate::metrics::ViewStats;
use crate::scheduler::run_bounded;

#[derive(Debug, Error)]
pub enum ExecError {
    /// Planning and backend errors, passed through unchanged.
    #[error(transparent)]
    Core(#[from] pitjoin_core::Error),
    #[error("invalid plan: {0}")]
    Invalid(String),
    #[error("hashing error: {0}")]
    Hash(String),
    #[error("columnar conversion: {0}")]
    Columnar(String),
    #[error("scheduler: {0}")]
    Scheduler(String),
    #[error("session: {0}")]
    Session(String),
}

/// Operator failures carry the same meaning as planning failures.
impl From<OpError> for ExecError {
    fn from(e: OpError) -> Self {
        ExecError::Core(e.into())
    }
}

/// Evaluates plans; cheap to clone.
#[derive(Clone)]
pub struct Executor {
    backend: Arc<dyn ExecutionBackend>,
    max_parallel: usize,
}

impl Executor {
    pub fn new(backend: Arc<dyn ExecutionBackend>, max_parallel: usize) -> Self {
        Self {
            backend,
            max_parallel: max_parallel.max(1),
        }
    }

    pub fn backend(&self) -> &Arc<dyn ExecutionBackend> {
        &self.backend
    }

    /// Run `plan` and return the output rows (in `plan.output_schema()` order).
    pub fn run(&self, plan: &JobPlan) -> Result<RowBatch, ExecError> {
        if let Some(relation) = self.backend.submit(plan)? {
            return Ok(relation.batch);
        }
        match plan {
            JobPlan::Historical(p) => self.run_historical(p),
            JobPlan::Latest(p) => self.run_latest(p),
        }
    }

    fn run_historical(&self, plan: &HistoricalPlan) -> Result<RowBatch, ExecError> {
        let decorated = decorate_entity_frame(self.backend.as_ref(), plan)?;
        let bounds = entity_bounds(&decorated)?;

        let backend = self.backend.as_ref();
        let cleaned = run_bounded(&plan.views, self.max_parallel, |view| {
            run_view(backend, view, &decorated, bounds)
        })?;

        merge(plan, decorated, cleaned)
    }

    #[cfg(feature = "async-scheduler")]
    pub async fn run_async(&self, plan: &JobPlan) -> Result<RowBatch, ExecError> {
        if let Some(relation) = self.backend.submit(plan)? {
            return Ok(relation.batch);
        }
        let plan = match plan {
            JobPlan::Historical(p) => p,
            JobPlan::Latest(p) => return self.run_latest(p),
        };
        let decorated = Arc::new(decorate_entity_frame(self.backend.as_ref(), plan)?);
        let bounds = entity_bounds(&decorated)?;

        let backend = Arc::clone(&self.backend);
        let frame = Arc::clone(&decorated);
        let cleaned = crate::scheduler::run_bounded_async(
            plan.views.clone(),
            self.max_parallel,
            move |view| run_view(backend.as_ref(), &view, &frame, bounds),
        )
        .await?;

        let decorated = Arc::try_unwrap(decorated).unwrap_or_else(|shared| (*shared).clone());
        merge(plan, decorated, cleaned)
    }

    fn run_latest(&self, plan: &LatestPlan) -> Result<RowBatch, ExecError> {
        let mut batch = self.backend.load(&plan.source)?.batch;
        for step in &plan.steps {
            batch = instantiate(step, None).eval(&[batch])?;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(source = %plan.source.label(), rows = batch.num_rows(), "pulled latest rows");

        Ok(batch)
    }
}

/// Load the entity frame and add `entity_timestamp` plus every row id column.
fn decorate_entity_frame(
    backend: &dyn ExecutionBackend,
    plan: &HistoricalPlan,
) -> Result<RowBatch, ExecError> {
    let entity = backend
        .load(&SourceDescriptor::table(plan.entity.relation.clone()))?
        .batch;
    fail_point!("entity_load");
    Ok(EntityRowIds {
        timestamp_column: plan.entity.timestamp_column.clone(),
        row_ids: plan.entity.row_ids.clone(),
    }
    .eval(&[entity])?)
}

fn entity_bounds(decorated: &RowBatch) -> Result<Option<EntityBounds>, ExecError> {
    let ts = decorated
        .column(ENTITY_TIMESTAMP_COLUMN)
        .ok_or_else(|| ExecError::Invalid("decorated entity frame lacks entity_timestamp".into()))?;
    Ok(EntityBounds::observe(
        ts.values.iter().filter_map(|v| v.as_timestamp()),
    ))
}

/// One view's pipeline: scan, then the planned steps. Produces
/// `row id ++ output features`, at most one row per row id.
fn run_view(
    backend: &dyn ExecutionBackend,
    view: &ViewPlan,
    decorated: &RowBatch,
    bounds: Option<EntityBounds>,
) -> Result<RowBatch, ExecError> {
    let subset_cols = entity_subset_columns_for(&view.join_keys, &view.row_id_column);
    let mut subset = Some(
        Distinct {
            columns: subset_cols,
        }
        .eval(std::slice::from_ref(decorated))?,
    );

    let mut batch = backend.load(&view.source)?.batch;
    fail_point!("view_scan");
    let scanned = batch.num_rows();

    for step in &view.steps {
        let op = instantiate(step, bounds);
        let inputs = match step {
            ViewStep::RangeJoin { .. } => {
                let entity = subset.take().ok_or_else(|| {
                    ExecError::Invalid(format!("view '{}' has more than one range join", view.view))
                })?;
                vec![batch, entity]
            }
            _ => vec![batch],
        };
        batch = op.eval(&inputs)?;
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(view = %view.view, scanned, resolved = batch.num_rows(), "evaluated feature view");
    ViewStats::new(view.view.as_str(), scanned, batch.num_rows()).emit();

    Ok(batch)
}

/// Fan-in: left-join every view's cleaned rows, then drop helper columns.
fn merge(plan: &HistoricalPlan, decorated: RowBatch, cleaned: Vec<RowBatch>) -> Result<RowBatch, ExecError> {
    if cleaned.len() != plan.views.len() {
        return Err(ExecError::Invalid(format!(
            "expected {} view results, got {}",
            plan.views.len(),
            cleaned.len()
        )));
    }
    let mut merged = decorated;
    for (view, rows) in plan.views.iter().zip(cleaned) {
        merged = LeftJoin::on(view.row_id_column.as_str(), view.row_id_column.as_str())
            .eval(&[merged, rows])?;
    }
    Ok(Project::keep(&plan.output_columns).eval(&[merged])?)
}
