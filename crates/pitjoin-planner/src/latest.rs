//! Pull-latest planning: the newest row per join key inside a time range.

use pitjoin_core::dag::{LatestPlan, ViewStep};
use pitjoin_core::error::{Error, Result};
use pitjoin_core::schema::Schema;
use pitjoin_core::source::SourceDescriptor;
use serde::{Deserialize, Serialize};

use crate::temporal::{check_source_columns, plan_steps, unique};

/// Arguments of a pull-latest retrieval. Bounds are inclusive, in UTC
/// microseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullLatestRequest {
    pub source: SourceDescriptor,
    pub join_keys: Vec<String>,
    pub features: Vec<String>,
    pub event_timestamp_column: String,
    pub created_timestamp_column: Option<String>,
    pub start: i64,
    pub end: i64,
}

impl PullLatestRequest {
    /// `join_keys ++ features ++ [T] ++ [C]`, duplicates removed.
    pub fn output_columns(&self) -> Vec<String> {
        unique(
            self.join_keys
                .iter()
                .chain(&self.features)
                .chain(std::iter::once(&self.event_timestamp_column))
                .chain(self.created_timestamp_column.iter())
                .cloned(),
        )
    }
}

pub fn plan_pull_latest(req: &PullLatestRequest, source_schema: &Schema) -> Result<LatestPlan> {
    if req.start > req.end {
        return Err(Error::Plan(format!(
            "pull latest: start {} is after end {}",
            req.start, req.end
        )));
    }
    check_source_columns(
        &format!("source {}", req.source.label()),
        source_schema,
        &req.join_keys,
        &req.features,
        &req.event_timestamp_column,
        req.created_timestamp_column.as_deref(),
    )?;

    let columns = req.output_columns();
    let steps = vec![
        ViewStep::TimeRange {
            column: req.event_timestamp_column.clone(),
            start: Some(req.start),
            end: Some(req.end),
        },
        ViewStep::Latest {
            group_by: req.join_keys.clone(),
            event_timestamp_column: req.event_timestamp_column.clone(),
            created_timestamp_column: req.created_timestamp_column.clone(),
        },
        ViewStep::Project {
            columns: columns.into_iter().map(|c| (c.clone(), c)).collect(),
        },
    ];
    let output_schema = plan_steps(&steps, source_schema, None)?;

    Ok(LatestPlan {
        source: req.source.clone(),
        steps,
        output_schema,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitjoin_core::schema::{DataType, Field};

    fn request() -> PullLatestRequest {
        PullLatestRequest {
            source: SourceDescriptor::table("driver_src"),
            join_keys: vec!["driver_id".into()],
            features: vec!["conv_rate".into()],
            event_timestamp_column: "ts".into(),
            created_timestamp_column: Some("created".into()),
            start: 0,
            end: 100,
        }
    }

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("conv_rate", DataType::Float64, true),
            Field::new("created", DataType::Timestamp, true),
            Field::new("driver_id", DataType::Int64, false),
            Field::new("ts", DataType::Timestamp, false),
        ])
    }

    #[test]
    fn output_is_keys_features_then_timestamps() {
        let plan = plan_pull_latest(&request(), &schema()).unwrap();
        assert_eq!(
            plan.output_schema.names(),
            vec!["driver_id", "conv_rate", "ts", "created"]
        );
        assert_eq!(plan.steps[0].key(), "time_range");
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut req = request();
        req.start = 200;
        assert!(matches!(plan_pull_latest(&req, &schema()), Err(Error::Plan(_))));
    }
}
