//! Pull-latest retrieval: newest row per join key inside a time range.


use pitjoin_core::error::Error;
use pitjoin_core::source::SourceDescriptor;
use pitjoin_core::types::{Column, RowBatch, Scalar};
use pitjoin_exec::ExecError;
use pitjoin_planner::PullLatestRequest;
use test_data_gen::*;

fn request(start: &str, end: &str) -> PullLatestRequest {
    PullLatestRequest {
        source: SourceDescriptor::table("driver_hourly_src"),
        join_keys: vec!["driver_id".into()],
        features: vec!["conv_rate".into()],
        event_timestamp_column: "event_timestamp".into(),
        created_timestamp_column: Some("created".into()),
        start: micros(start),
        end: micros(end),
    }
}

#[test]
fn newest_row_per_key_with_inclusive_bounds() {
    let (store, backend) = memory_store();
    backend
        .insert_batch("driver_hourly_src", driver_stats(&[1001, 1002], 3))
        .unwrap();

    let out = store
        .pull_latest_from_table_or_query(&request("2023-01-01T10:00:00Z", "2023-01-02"))
        .unwrap()
        .materialize_to_table()
        .unwrap();

    assert_eq!(
        out.schema.names(),
        vec!["driver_id", "conv_rate", "event_timestamp", "created"]
    );
    assert_eq!(column(&out, "driver_id"), &[int(1001), int(1002)]);
    assert_eq!(
        column(&out, "event_timestamp"),
        &[ts("2023-01-02"), ts("2023-01-02")]
    );
    assert_eq!(column(&out, "conv_rate")[1], float(((1002 * 31 + 24) % 100) as f64 / 100.0));
}

#[test]
fn created_timestamp_decides_equal_event_times() {
    let (store, backend) = memory_store();
    backend
        .insert_batch(
            "driver_hourly_src",
            RowBatch::new(vec![
                Column::new("driver_id", vec![int(7), int(7), int(7)]),
                Column::new(
                    "event_timestamp",
                    vec![ts("2023-01-05"), ts("2023-01-05"), ts("2023-01-04")],
                ),
                Column::new(
                    "created",
                    vec![ts("2023-01-05T02:00:00Z"), ts("2023-01-05T01:00:00Z"), ts("2023-01-06")],
                ),
                Column::new("conv_rate", vec![float(0.2), float(0.1), float(0.9)]),
            ]),
        )
        .unwrap();

    let out = store
        .pull_latest_from_table_or_query(&request("2023-01-01", "2023-01-31"))
        .unwrap()
        .materialize_to_table()
        .unwrap();
    assert_eq!(column(&out, "conv_rate"), &[float(0.2)]);
}

#[test]
fn empty_range_gives_no_rows() {
    let (store, backend) = memory_store();
    backend
        .insert_batch("driver_hourly_src", driver_stats(&[1001], 1))
        .unwrap();

    let out = store
        .pull_latest_from_table_or_query(&request("2024-01-01", "2024-02-01"))
        .unwrap()
        .materialize_to_table()
        .unwrap();
    assert_eq!(out.num_rows(), 0);
    assert_eq!(out.schema.names().len(), 4);
}

#[test]
fn null_keys_form_their_own_group() {
    let (store, backend) = memory_store();
    backend
        .insert_batch(
            "driver_hourly_src",
            RowBatch::new(vec![
                Column::new("driver_id", vec![Scalar::Null, int(1), Scalar::Null]),
                Column::new(
                    "event_timestamp",
                    vec![ts("2023-01-01"), ts("2023-01-01"), ts("2023-01-02")],
                ),
                Column::new("created", vec![ts("2023-01-01"), ts("2023-01-01"), ts("2023-01-02")]),
                Column::new("conv_rate", vec![float(0.1), float(0.5), float(0.3)]),
            ]),
        )
        .unwrap();

    let out = store
        .pull_latest_from_table_or_query(&request("2023-01-01", "2023-01-31"))
        .unwrap()
        .materialize_to_table()
        .unwrap();
    assert_eq!(out.num_rows(), 2);
    assert_eq!(column(&out, "conv_rate"), &[float(0.5), float(0.3)]);
}

#[test]
fn invalid_requests() {
    let (store, backend) = memory_store();
    backend
        .insert_batch("driver_hourly_src", driver_stats(&[1001], 1))
        .unwrap();

    let err = store
        .pull_latest_from_table_or_query(&request("2023-02-01", "2023-01-01"))
        .unwrap_err();
    assert!(matches!(err, ExecError::Core(Error::Plan(_))));

    let mut req = request("2023-01-01", "2023-01-02");
    req.features.push("missing_feature".into());
    assert!(matches!(
        store.pull_latest_from_table_or_query(&req).unwrap_err(),
        ExecError::Core(Error::Schema(_))
    ));

    req.source = SourceDescriptor::table("nope");
    assert!(matches!(
        store.pull_latest_from_table_or_query(&req).unwrap_err(),
        ExecError::Core(Error::SourceNotFound(_))
    ));
}
