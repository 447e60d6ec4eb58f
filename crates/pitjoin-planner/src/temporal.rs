//! Temporal join planning for a single feature view.
//!
//! A view's pipeline is:
//!
//! 1. rename (field mapping) and narrow the source to the needed columns
//! 2. prefilter on the global entity time bounds (optimization only)
//! 3. range join on join keys with `T <= entity_ts` and the TTL lower bound
//! 4. dedup on `(row id, T)` keeping the greatest `C` (when `C` is declared)
//! 5. latest row per row id, ties broken by `C` and then scan order
//! 6. project to `row id ++ features` under their output names
//!
//! Planning runs every step's operator planning surface over the discovered
//! source schema, so a plan that builds will not fail on shape at execution.

use pitjoin_core::dag::{ViewPlan, ViewStep};
use pitjoin_core::error::{Error, Result};
use pitjoin_core::schema::Schema;
use pitjoin_core::view::{FeatureViewSpec, ENTITY_TIMESTAMP_COLUMN};
use pitjoin_operators::entity::{Distinct, EntityRowIds};
use pitjoin_operators::registry::instantiate;
use pitjoin_operators::Operator;

/// A view plan together with the schema of its cleaned result.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedView {
    pub plan: ViewPlan,
    /// `row id ++ output features`.
    pub output_schema: Schema,
}

/// Columns of the distinct entity subset a view's range join reads.
pub fn entity_subset_columns(view: &FeatureViewSpec) -> Vec<String> {
    entity_subset_columns_for(&view.join_keys, &view.row_id_column())
}

/// `join keys ++ entity_timestamp ++ row id`.
pub fn entity_subset_columns_for(join_keys: &[String], row_id_column: &str) -> Vec<String> {
    let mut cols = join_keys.to_vec();
    cols.push(ENTITY_TIMESTAMP_COLUMN.to_string());
    cols.push(row_id_column.to_string());
    cols
}

/// Schema of the distinct entity subset for `view`.
pub fn entity_subset_schema(
    view: &FeatureViewSpec,
    entity_schema: &Schema,
    entity_timestamp_column: &str,
) -> Result<Schema> {
    let decorated = EntityRowIds {
        timestamp_column: entity_timestamp_column.to_string(),
        row_ids: vec![(view.row_id_column(), view.join_keys.clone())],
    }
    .plan(&[entity_schema.clone()])?
    .output_schema;
    let subset = Distinct {
        columns: entity_subset_columns(view),
    }
    .plan(&[decorated])?
    .output_schema;
    Ok(subset)
}

/// Run `steps` through their operators' planning surfaces.
pub(crate) fn plan_steps(steps: &[ViewStep], input: &Schema, entity_subset: Option<&Schema>) -> Result<Schema> {
    let mut schema = input.clone();
    for step in steps {
        let op = instantiate(step, None);
        let mut inputs = vec![schema];
        if let ViewStep::RangeJoin { .. } = step {
            let subset = entity_subset.ok_or_else(|| {
                Error::Invariant("range join planned without an entity subset".into())
            })?;
            inputs.push(subset.clone());
        }
        schema = op.plan(&inputs)?.output_schema;
    }
    Ok(schema)
}

/// Order-preserving de-duplication.
pub(crate) fn unique(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for n in names {
        if !out.contains(&n) {
            out.push(n);
        }
    }
    out
}

/// Check the (mapped) source schema carries everything the view declares.
pub(crate) fn check_source_columns(
    label: &str,
    schema: &Schema,
    join_keys: &[String],
    features: &[String],
    event_timestamp_column: &str,
    created_timestamp_column: Option<&str>,
) -> Result<()> {
    let missing = |kind: &str, col: &str| {
        Error::Schema(format!("{label}: {kind} column '{col}' not found in source"))
    };
    for k in join_keys {
        schema.field_by_name(k).ok_or_else(|| missing("join key", k.as_str()))?;
    }
    for f in features {
        schema.field_by_name(f).ok_or_else(|| missing("feature", f.as_str()))?;
    }
    let timestamps = std::iter::once(("event timestamp", event_timestamp_column))
        .chain(created_timestamp_column.map(|c| ("created timestamp", c)));
    for (kind, col) in timestamps {
        let field = schema.field_by_name(col).ok_or_else(|| missing(kind, col))?;
        if !field.data_type.is_timestamp() {
            return Err(Error::Schema(format!(
                "{label}: {kind} column '{col}' is {:?}, not a timestamp",
                field.data_type
            )));
        }
    }
    Ok(())
}

/// Plan the point-in-time pipeline of one view.
pub fn plan_view(
    view: &FeatureViewSpec,
    source_schema: &Schema,
    entity_schema: &Schema,
    entity_timestamp_column: &str,
    full_feature_names: bool,
) -> Result<PlannedView> {
    let t = view.event_timestamp_column.clone();
    let c = view.created_timestamp_column.clone();
    let row_id = view.row_id_column();

    let mut steps = Vec::new();
    if !view.field_mapping.is_empty() {
        steps.push(ViewStep::Rename {
            mapping: view.field_mapping.clone(),
        });
    }
    let mapped = plan_steps(&steps, source_schema, None)?;
    check_source_columns(
        &format!("feature view '{}'", view.name),
        &mapped,
        &view.join_keys,
        &view.features,
        &t,
        c.as_deref(),
    )?;

    let needed = unique(
        view.join_keys
            .iter()
            .chain(&view.features)
            .chain(std::iter::once(&t))
            .chain(c.iter())
            .cloned(),
    );
    steps.push(ViewStep::Project {
        columns: needed.into_iter().map(|n| (n.clone(), n)).collect(),
    });
    steps.push(ViewStep::Prefilter {
        column: t.clone(),
        ttl_seconds: view.ttl_seconds,
    });
    steps.push(ViewStep::RangeJoin {
        join_keys: view.join_keys.clone(),
        event_timestamp_column: t.clone(),
        ttl_seconds: view.ttl_seconds,
        row_id_column: row_id.clone(),
    });
    if let Some(c) = &c {
        steps.push(ViewStep::Dedup {
            row_id_column: row_id.clone(),
            event_timestamp_column: t.clone(),
            created_timestamp_column: c.clone(),
        });
    }
    steps.push(ViewStep::Latest {
        group_by: vec![row_id.clone()],
        event_timestamp_column: t,
        created_timestamp_column: c,
    });

    let output_features: Vec<String> = view
        .features
        .iter()
        .map(|f| view.output_name(f, full_feature_names))
        .collect();
    let mut columns = vec![(row_id.clone(), row_id.clone())];
    columns.extend(view.features.iter().cloned().zip(output_features.iter().cloned()));
    steps.push(ViewStep::Project { columns });

    let subset = entity_subset_schema(view, entity_schema, entity_timestamp_column)?;
    let output_schema = plan_steps(&steps, source_schema, Some(&subset))?;

    Ok(PlannedView {
        plan: ViewPlan {
            view: view.name.clone(),
            source: view.source.clone(),
            join_keys: view.join_keys.clone(),
            row_id_column: row_id,
            steps,
            output_features,
        },
        output_schema,
    })
}
