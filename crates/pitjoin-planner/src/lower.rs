//! Lowering: query context → executable historical plan.
//!
//! The only backend interaction is schema discovery; nothing is scanned.

use pitjoin_core::backend::ExecutionBackend;
use pitjoin_core::dag::{EntityPlan, HistoricalPlan};
use pitjoin_core::error::Result;

use crate::context::QueryContext;
use crate::merge::plan_merge;
use crate::temporal::plan_view;

pub fn plan_historical(ctx: &QueryContext, backend: &dyn ExecutionBackend) -> Result<HistoricalPlan> {
    let mut planned = Vec::with_capacity(ctx.views.len());
    for view in &ctx.views {
        let source_schema = view.source.schema(backend)?;
        let p = plan_view(
            view,
            &source_schema,
            &ctx.entity_schema,
            &ctx.entity_timestamp_column,
            ctx.full_feature_names,
        )?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            view = %view.name,
            source = %view.source.label(),
            steps = p.plan.steps.len(),
            ttl_seconds = view.ttl_seconds,
            "planned feature view"
        );

        planned.push(p);
    }

    let merge = plan_merge(&ctx.entity_schema, &ctx.entity_timestamp_column, &planned)?;

    Ok(HistoricalPlan {
        entity: EntityPlan {
            relation: ctx.entity_relation.clone(),
            schema: ctx.entity_schema.clone(),
            timestamp_column: ctx.entity_timestamp_column.clone(),
            row_ids: merge.row_ids,
        },
        views: planned.into_iter().map(|p| p.plan).collect(),
        full_feature_names: ctx.full_feature_names,
        output_columns: merge.output_columns,
        output_schema: merge.output_schema,
    })
}
