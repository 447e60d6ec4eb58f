//! Retrieval jobs: a planned retrieval that has not read any rows yet.
//!
//! Materializing runs the plan; it may be called any number of times and
//! returns the same rows each time while the sources are unchanged. The
//! registered entity frame lives as long as the job.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use arrow_array::RecordBatch;

use pitjoin_core::backend::ExecutionBackend;
use pitjoin_core::dag::JobPlan;
use pitjoin_core::hash::{hash_rows_unordered, Hash256};
use pitjoin_core::manifest::RunManifest;
use pitjoin_core::schema::Schema;
use pitjoin_core::types::Relation;
use pitjoin_core::view::OnDemandFeatureView;

use crate::columnar::to_record_batch;
use crate::replay::hash_plan;
use crate::runtime::Executor;
use crate::ExecError;

pub struct RetrievalJob {
    executor: Executor,
    plan: JobPlan,
    plan_hash: Hash256,
    full_feature_names: bool,
    on_demand: Vec<OnDemandFeatureView>,
    /// Registered entity frame owned by this job, dropped with it.
    entity_relation: Option<String>,
}

impl RetrievalJob {
    pub fn new(
        backend: Arc<dyn ExecutionBackend>,
        plan: JobPlan,
        max_parallel: usize,
    ) -> Result<Self, ExecError> {
        let plan_hash = hash_plan(&plan)?;
        let full_feature_names = match &plan {
            JobPlan::Historical(p) => p.full_feature_names,
            JobPlan::Latest(_) => false,
        };
        Ok(Self {
            executor: Executor::new(backend, max_parallel),
            plan,
            plan_hash,
            full_feature_names,
            on_demand: Vec::new(),
            entity_relation: None,
        })
    }

    /// Hand the registered entity frame to the job for cleanup.
    pub fn with_entity_relation(mut self, name: impl Into<String>) -> Self {
        self.entity_relation = Some(name.into());
        self
    }

    pub fn with_on_demand_feature_views(mut self, views: Vec<OnDemandFeatureView>) -> Self {
        self.on_demand = views;
        self
    }

    pub fn plan(&self) -> &JobPlan {
        &self.plan
    }

    pub fn plan_hash(&self) -> Hash256 {
        self.plan_hash
    }

    pub fn output_schema(&self) -> &Schema {
        self.plan.output_schema()
    }

    pub fn full_feature_names(&self) -> bool {
        self.full_feature_names
    }

    /// On-demand views requested alongside; not evaluated here.
    pub fn on_demand_feature_views(&self) -> &[OnDemandFeatureView] {
        &self.on_demand
    }

    /// Run the plan and return the rows with the planned schema.
    pub fn materialize_to_table(&self) -> Result<Relation, ExecError> {
        let batch = self.executor.run(&self.plan)?;
        Ok(Relation::new(self.output_schema().clone(), batch)?)
    }

    /// Like [`materialize_to_table`](Self::materialize_to_table), plus a
    /// manifest carrying the plan hash and an order-independent row digest.
    pub fn materialize_with_manifest(&self) -> Result<(Relation, RunManifest), ExecError> {
        let manifest = RunManifest::new(self.plan_hash, self.executor.backend().name(), now_millis());
        let relation = self.materialize_to_table()?;
        let digest = hash_rows_unordered(&relation.batch);

        #[cfg(feature = "tracing")]
        tracing::info!(
            plan = %self.plan_hash,
            rows = relation.num_rows(),
            digest = %digest,
            "materialized retrieval"
        );

        let rows = relation.num_rows();
        Ok((relation, manifest.finish(now_millis(), digest, rows)))
    }

    /// The result as one Arrow record batch.
    pub fn materialize_to_columnar(&self) -> Result<RecordBatch, ExecError> {
        to_record_batch(&self.materialize_to_table()?)
    }

    #[cfg(feature = "async-scheduler")]
    pub async fn materialize_to_table_async(&self) -> Result<Relation, ExecError> {
        let batch = self.executor.run_async(&self.plan).await?;
        Ok(Relation::new(self.output_schema().clone(), batch)?)
    }
}

impl std::fmt::Debug for RetrievalJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalJob")
            .field("plan_hash", &self.plan_hash)
            .field("full_feature_names", &self.full_feature_names)
            .field("entity_relation", &self.entity_relation)
            .finish()
    }
}

impl Drop for RetrievalJob {
    fn drop(&mut self) {
        if let Some(name) = self.entity_relation.take() {
            // Best effort; the backend may already be gone.
            let _ = self.executor.backend().deregister(&name);
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
