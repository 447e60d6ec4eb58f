//! Multi-view merge planning.
//!
//! The entity frame is decorated once with `entity_timestamp` and one row id
//! column per view, then left-joined with each view's cleaned result on that
//! view's row id. Helper columns are projected away at the end, leaving the
//! original entity columns followed by every view's features.
//!
//! With bare feature names nothing stops two views (or a view and the entity
//! frame) from producing the same column name; later columns then carry the
//! left-join suffixes `_right`, `_right_2`, ... so every output name is unique.

use std::collections::BTreeSet;

use pitjoin_core::error::Result;
use pitjoin_core::schema::Schema;
use pitjoin_core::view::ENTITY_TIMESTAMP_COLUMN;
use pitjoin_operators::entity::EntityRowIds;
use pitjoin_operators::join::LeftJoin;
use pitjoin_operators::Operator;

use crate::temporal::PlannedView;

#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan {
    /// `(row id column, join keys)` per view, in view order.
    pub row_ids: Vec<(String, Vec<String>)>,
    pub output_columns: Vec<String>,
    pub output_schema: Schema,
}

pub fn plan_merge(
    entity_schema: &Schema,
    entity_timestamp_column: &str,
    views: &[PlannedView],
) -> Result<MergePlan> {
    let row_ids: Vec<(String, Vec<String>)> = views
        .iter()
        .map(|v| (v.plan.row_id_column.clone(), v.plan.join_keys.clone()))
        .collect();

    let mut merged = EntityRowIds {
        timestamp_column: entity_timestamp_column.to_string(),
        row_ids: row_ids.clone(),
    }
    .plan(&[entity_schema.clone()])?
    .output_schema;

    for v in views {
        let row_id = &v.plan.row_id_column;
        merged = LeftJoin::on(row_id.as_str(), row_id.as_str())
            .plan(&[merged, v.output_schema.clone()])?
            .output_schema;
    }

    let helpers: BTreeSet<&str> = std::iter::once(ENTITY_TIMESTAMP_COLUMN)
        .chain(row_ids.iter().map(|(c, _)| c.as_str()))
        .collect();
    let output_schema = Schema::new(
        merged
            .fields
            .into_iter()
            .filter(|f| !helpers.contains(f.name.as_str()))
            .collect(),
    );

    Ok(MergePlan {
        output_columns: output_schema.names(),
        output_schema,
        row_ids,
    })
}
