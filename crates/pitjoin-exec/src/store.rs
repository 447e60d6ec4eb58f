//! Offline store facade: the retrieval entry points.
//!
//! Every call plans eagerly (so shape errors surface immediately) and hands
//! back a lazy [`RetrievalJob`].

use std::sync::Arc;

use pitjoin_core::config::SessionConfig;
use pitjoin_core::dag::JobPlan;
use pitjoin_core::view::{FeatureViewSpec, OnDemandFeatureView};

use pitjoin_planner::{
    plan_historical, plan_pull_latest, resolve_feature_refs, EntityFramePreparer, EntityInput,
    FeatureRegistry, PullLatestRequest, QueryContext,
};

use crate::job::RetrievalJob;
use crate::session::{process_session, Session};
use crate::ExecError;

#[derive(Debug, Clone)]
pub struct OfflineStore {
    session: Arc<Session>,
}

impl OfflineStore {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Store on the process-wide session, creating it from `config` if needed.
    pub fn from_config(config: SessionConfig) -> Result<Self, ExecError> {
        Ok(Self::new(process_session().acquire(config)?))
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn max_parallel(&self) -> usize {
        self.session.config().effective_parallelism()
    }

    /// Point-in-time correct feature values for every entity row.
    ///
    /// The result has one row per entity row, in entity order: every entity
    /// column, then each view's features (prefixed `view__` when
    /// `full_feature_names`).
    pub fn get_historical_features(
        &self,
        views: Vec<FeatureViewSpec>,
        entity: EntityInput,
        full_feature_names: bool,
        on_demand: Vec<OnDemandFeatureView>,
    ) -> Result<RetrievalJob, ExecError> {
        let backend = Arc::clone(self.session.backend());
        let prepared =
            EntityFramePreparer::new(backend.as_ref(), self.session.config()).prepare(entity, &views)?;

        let planned = QueryContext::build(views, &prepared, full_feature_names)
            .and_then(|ctx| plan_historical(&ctx, backend.as_ref()))
            .map_err(ExecError::from)
            .and_then(|plan| RetrievalJob::new(Arc::clone(&backend), JobPlan::Historical(plan), self.max_parallel()));

        match planned {
            Ok(job) => Ok(job
                .with_entity_relation(prepared.relation)
                .with_on_demand_feature_views(on_demand)),
            Err(e) => {
                let _ = backend.deregister(&prepared.relation);
                Err(e)
            }
        }
    }

    /// Resolve `"view:feature"` references through `registry`, then retrieve.
    pub fn get_historical_features_from_registry(
        &self,
        registry: &dyn FeatureRegistry,
        project: &str,
        feature_refs: &[&str],
        entity: EntityInput,
        full_feature_names: bool,
    ) -> Result<RetrievalJob, ExecError> {
        let resolved = resolve_feature_refs(registry, project, feature_refs)?;
        self.get_historical_features(resolved.views, entity, full_feature_names, resolved.on_demand)
    }

    /// The newest row per join key with `start <= T <= end`.
    pub fn pull_latest_from_table_or_query(
        &self,
        request: &PullLatestRequest,
    ) -> Result<RetrievalJob, ExecError> {
        let backend = Arc::clone(self.session.backend());
        let schema = request.source.schema(backend.as_ref())?;
        let plan = plan_pull_latest(request, &schema)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(source = %request.source.label(), start = request.start, end = request.end, "planned pull latest");

        RetrievalJob::new(backend, JobPlan::Latest(plan), self.max_parallel())
    }
}
