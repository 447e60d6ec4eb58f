//! Instantiate operators from plan steps.

use pitjoin_core::dag::ViewStep;
use pitjoin_core::time::seconds_to_micros;

use crate::aggregate::{Dedup, LatestPerGroup};
use crate::filter::TimeBound;
use crate::join::RangeJoin;
use crate::map::Rename;
use crate::project::Project;
use crate::traits::Operator;

/// Observed `[min, max]` of the entity timestamps, used to resolve prefilters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityBounds {
    pub min: i64,
    pub max: i64,
}

impl EntityBounds {
    /// Bounds over the non-null timestamps; `None` when there are none.
    pub fn observe(timestamps: impl IntoIterator<Item = i64>) -> Option<Self> {
        timestamps.into_iter().fold(None, |acc, ts| {
            Some(match acc {
                None => EntityBounds { min: ts, max: ts },
                Some(b) => EntityBounds {
                    min: b.min.min(ts),
                    max: b.max.max(ts),
                },
            })
        })
    }
}

/// Build the operator for `step`. Range joins read the entity subset as
/// their second input; every other step is unary.
pub fn instantiate(step: &ViewStep, bounds: Option<EntityBounds>) -> Box<dyn Operator> {
    match step {
        ViewStep::Rename { mapping } => Box::new(Rename {
            renames: mapping.clone(),
        }),
        ViewStep::Prefilter {
            column,
            ttl_seconds,
        } => {
            let lower = bounds
                .filter(|_| *ttl_seconds > 0)
                .map(|b| b.min.saturating_sub(seconds_to_micros(*ttl_seconds)));
            Box::new(TimeBound {
                column: column.clone(),
                lower,
                upper: bounds.map(|b| b.max),
            })
        }
        ViewStep::TimeRange { column, start, end } => Box::new(TimeBound {
            column: column.clone(),
            lower: *start,
            upper: *end,
        }),
        ViewStep::RangeJoin {
            join_keys,
            event_timestamp_column,
            ttl_seconds,
            row_id_column,
        } => Box::new(RangeJoin {
            join_keys: join_keys.clone(),
            event_timestamp_column: event_timestamp_column.clone(),
            ttl_micros: seconds_to_micros(*ttl_seconds),
            row_id_column: row_id_column.clone(),
        }),
        ViewStep::Dedup {
            row_id_column,
            event_timestamp_column,
            created_timestamp_column,
        } => Box::new(Dedup {
            row_id_column: row_id_column.clone(),
            event_timestamp_column: event_timestamp_column.clone(),
            created_timestamp_column: created_timestamp_column.clone(),
        }),
        ViewStep::Latest {
            group_by,
            event_timestamp_column,
            created_timestamp_column,
        } => Box::new(LatestPerGroup {
            group_by: group_by.clone(),
            event_timestamp_column: event_timestamp_column.clone(),
            created_timestamp_column: created_timestamp_column.clone(),
        }),
        ViewStep::Project { columns } => Box::new(Project {
            columns: columns.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitjoin_core::types::{Column, RowBatch, Scalar};

    #[test]
    fn prefilter_resolves_against_entity_bounds() {
        let batch = RowBatch::new(vec![Column::new(
            "ts",
            (0..10).map(|s| Scalar::Timestamp(s * 1_000_000)).collect(),
        )]);
        let bounds = EntityBounds::observe([5_000_000, 7_000_000]);
        let op = instantiate(
            &ViewStep::Prefilter {
                column: "ts".into(),
                ttl_seconds: 2,
            },
            bounds,
        );
        assert_eq!(op.name(), "time_bound");
        // [5s - 2s, 7s]
        assert_eq!(op.eval(&[batch.clone()]).unwrap().num_rows(), 5);

        let op = instantiate(
            &ViewStep::Prefilter {
                column: "ts".into(),
                ttl_seconds: 0,
            },
            bounds,
        );
        assert_eq!(op.eval(&[batch]).unwrap().num_rows(), 8);
    }

    #[test]
    fn keys_map_to_operators() {
        let step = ViewStep::Latest {
            group_by: vec!["k".into()],
            event_timestamp_column: "ts".into(),
            created_timestamp_column: None,
        };
        assert_eq!(instantiate(&step, None).name(), step.key());
        assert_eq!(EntityBounds::observe(std::iter::empty()), None);
    }
}
