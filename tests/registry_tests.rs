//! Retrieval driven by `"view:feature"` references against a YAML registry.


use pitjoin_core::error::Error;
use pitjoin_core::types::{Column, RowBatch, Scalar};
use pitjoin_exec::ExecError;
use pitjoin_planner::{parse_registry_yaml, FeatureRegistry};
use test_data_gen::*;

const REGISTRY: &str = r#"
projects:
  ranking:
    feature_views:
      - name: driver_hourly_stats
        join_keys: [driver_id]
        features: [conv_rate, acc_rate, avg_daily_trips]
        event_timestamp_column: event_timestamp
        created_timestamp_column: created
        ttl_seconds: 86400
        source: { kind: table, value: driver_hourly_src }
      - name: customer_profile
        join_keys: [customer_id]
        features: [avg_orders]
        event_timestamp_column: ts
        source: { kind: query, value: "SELECT * FROM customer_src" }
    on_demand_feature_views:
      - name: conv_rate_plus_acc
        definition: { inputs: [conv_rate, acc_rate] }
"#;

#[test]
fn refs_select_views_and_features_in_request_order() {
    let registry = parse_registry_yaml(REGISTRY).unwrap();
    let (store, backend) = memory_store();
    backend
        .insert_batch("driver_hourly_src", driver_stats(&[1001], 2))
        .unwrap();
    backend.insert_batch("customer_src", customer_profiles()).unwrap();

    let entity = RowBatch::new(vec![
        Column::new("driver_id", vec![int(1001), int(1001)]),
        Column::new("customer_id", vec![text("c2"), text("c1")]),
        Column::new(
            "event_timestamp",
            vec![ts("2023-01-01T12:30:00Z"), ts("2023-01-03")],
        ),
    ]);

    let job = store
        .get_historical_features_from_registry(
            &registry,
            "ranking",
            &[
                "customer_profile:avg_orders",
                "driver_hourly_stats:avg_daily_trips",
                "conv_rate_plus_acc:total",
                "driver_hourly_stats:conv_rate",
            ],
            entity.into(),
            false,
        )
        .unwrap();

    assert_eq!(job.on_demand_feature_views().len(), 1);
    assert_eq!(job.on_demand_feature_views()[0].name, "conv_rate_plus_acc");

    let out = job.materialize_to_table().unwrap();
    assert_eq!(
        out.schema.names(),
        vec![
            "driver_id",
            "customer_id",
            "event_timestamp",
            "avg_orders",
            "avg_daily_trips",
            "conv_rate"
        ]
    );
    // c2's only snapshot is newer than the first entity row.
    assert_eq!(column(&out, "avg_orders"), &[Scalar::Null, float(1.5)]);
    // Hour 12 on day 1 for the first row; the second is past the 2-day
    // history but the last row (hour 47) is within the 1-day TTL.
    assert_eq!(
        column(&out, "avg_daily_trips"),
        &[int((1001 + 12) % 50), int((1001 + 47) % 50)]
    );
}

#[test]
fn bad_references() {
    let registry = parse_registry_yaml(REGISTRY).unwrap();
    let (store, _) = memory_store();
    let retrieve = |refs: &[&str]| {
        store
            .get_historical_features_from_registry(
                &registry,
                "ranking",
                refs,
                entity_rows(&[(1, "2023-01-10")]).into(),
                true,
            )
            .unwrap_err()
    };

    assert!(matches!(
        retrieve(&["driver_hourly_stats.conv_rate"]),
        ExecError::Core(Error::InvalidFeatureRef(_))
    ));
    assert!(matches!(
        retrieve(&["unknown_view:x"]),
        ExecError::Core(Error::UnknownFeatureView(_))
    ));
    assert!(matches!(
        retrieve(&["driver_hourly_stats:nope"]),
        ExecError::Core(Error::UnknownFeature { .. })
    ));
}

#[test]
fn registry_lookups() {
    let registry = parse_registry_yaml(REGISTRY).unwrap();
    let view = registry.feature_view("ranking", "driver_hourly_stats").unwrap();
    assert_eq!(view.ttl_seconds, DAY_SECONDS);
    assert!(registry.feature_view("other", "driver_hourly_stats").is_none());
    assert!(registry.on_demand_feature_views("other").is_empty());
}
