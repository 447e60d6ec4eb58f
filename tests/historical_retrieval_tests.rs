//! End-to-end historical retrieval against the in-memory backend.


use arrow_array::Array;
use pitjoin_core::schema::{DataType, Field, Schema};
use pitjoin_core::source::SourceDescriptor;
use pitjoin_core::types::{Column, Relation, RowBatch, Scalar};
use pitjoin_core::view::FeatureViewSpec;
use pitjoin_planner::EntityInput;
use serde_json::json;
use test_data_gen::*;

#[test]
fn ttl_excludes_rows_older_than_the_window() {
    let (store, backend) = memory_store();
    backend
        .insert_batch(
            "view_a_src",
            view_a_rows(&[(1, "2023-01-01", 10), (1, "2023-01-09", 20)]),
        )
        .unwrap();

    let out = store
        .get_historical_features(
            vec![view_a(5 * DAY_SECONDS)],
            entity_rows(&[(1, "2023-01-10")]).into(),
            false,
            vec![],
        )
        .unwrap()
        .materialize_to_table()
        .unwrap();

    assert_eq!(out.schema.names(), vec!["id", "event_timestamp", "val"]);
    assert_eq!(column(&out, "val"), &[int(20)]);

    // Only the old row left: it is outside the window, so nothing matches.
    let (store, backend) = memory_store();
    backend
        .insert_batch("view_a_src", view_a_rows(&[(1, "2023-01-01", 10)]))
        .unwrap();
    let out = store
        .get_historical_features(
            vec![view_a(5 * DAY_SECONDS)],
            entity_rows(&[(1, "2023-01-10")]).into(),
            false,
            vec![],
        )
        .unwrap()
        .materialize_to_table()
        .unwrap();
    assert_eq!(column(&out, "val"), &[Scalar::Null]);
}

#[test]
fn created_timestamp_breaks_event_timestamp_ties() {
    let (store, backend) = memory_store();
    backend
        .insert_batch(
            "view_a_src",
            RowBatch::new(vec![
                Column::new("id", vec![int(1), int(1)]),
                Column::new("ts", vec![ts("2023-01-09"), ts("2023-01-09")]),
                Column::new(
                    "created",
                    vec![ts("2023-01-09T00:00:00Z"), ts("2023-01-09T12:00:00Z")],
                ),
                Column::new("val", vec![int(20), int(21)]),
            ]),
        )
        .unwrap();

    let view = view_a(5 * DAY_SECONDS).with_created_timestamp("created");
    let out = store
        .get_historical_features(vec![view], entity_rows(&[(1, "2023-01-10")]).into(), false, vec![])
        .unwrap()
        .materialize_to_table()
        .unwrap();
    assert_eq!(column(&out, "val"), &[int(21)]);
}

#[test]
fn equal_timestamps_without_created_column_keep_first_scanned() {
    let (store, backend) = memory_store();
    backend
        .insert_batch(
            "view_a_src",
            view_a_rows(&[(1, "2023-01-09", 30), (1, "2023-01-09", 31), (1, "2023-01-08", 99)]),
        )
        .unwrap();

    let job = store
        .get_historical_features(vec![view_a(0)], entity_rows(&[(1, "2023-01-10")]).into(), false, vec![])
        .unwrap();
    for _ in 0..3 {
        assert_eq!(column(&job.materialize_to_table().unwrap(), "val"), &[int(30)]);
    }
}

#[test]
fn entity_rows_without_a_match_are_kept_with_nulls() {
    let (store, backend) = memory_store();
    backend
        .insert_batch("view_a_src", view_a_rows(&[(1, "2023-01-09", 20)]))
        .unwrap();

    let out = store
        .get_historical_features(
            vec![view_a(5 * DAY_SECONDS)],
            entity_rows(&[(2, "2023-01-10"), (1, "2023-01-10"), (2, "2023-01-11")]).into(),
            false,
            vec![],
        )
        .unwrap()
        .materialize_to_table()
        .unwrap();

    assert_eq!(out.num_rows(), 3);
    assert_eq!(column(&out, "id"), &[int(2), int(1), int(2)]);
    assert_eq!(column(&out, "val"), &[Scalar::Null, int(20), Scalar::Null]);
}

#[test]
fn feature_rows_after_the_entity_timestamp_never_leak() {
    let (store, backend) = memory_store();
    backend
        .insert_batch(
            "view_a_src",
            view_a_rows(&[
                (1, "2023-01-05", 5),
                (1, "2023-01-10", 10),
                (1, "2023-01-10T00:00:01Z", 11),
                (1, "2023-01-20", 20),
            ]),
        )
        .unwrap();

    let out = store
        .get_historical_features(
            vec![view_a(0)],
            entity_rows(&[(1, "2023-01-04"), (1, "2023-01-10"), (1, "2023-01-15")]).into(),
            false,
            vec![],
        )
        .unwrap()
        .materialize_to_table()
        .unwrap();

    // A row stamped exactly at the entity timestamp is visible; one a second
    // later is not until the next entity row.
    assert_eq!(column(&out, "val"), &[Scalar::Null, int(10), int(11)]);
}

#[test]
fn ttl_boundary_is_inclusive() {
    let (store, backend) = memory_store();
    backend
        .insert_batch(
            "view_a_src",
            view_a_rows(&[(1, "2023-01-09", 9), (2, "2023-01-08T23:59:59Z", 8)]),
        )
        .unwrap();

    let out = store
        .get_historical_features(
            vec![view_a(DAY_SECONDS)],
            entity_rows(&[(1, "2023-01-10"), (2, "2023-01-10")]).into(),
            false,
            vec![],
        )
        .unwrap()
        .materialize_to_table()
        .unwrap();
    assert_eq!(column(&out, "val"), &[int(9), Scalar::Null]);
}

#[test]
fn duplicate_entity_rows_each_get_the_value() {
    let (store, backend) = memory_store();
    backend
        .insert_batch("view_a_src", view_a_rows(&[(1, "2023-01-09", 20)]))
        .unwrap();

    let out = store
        .get_historical_features(
            vec![view_a(0)],
            entity_rows(&[(1, "2023-01-10"), (1, "2023-01-10")]).into(),
            false,
            vec![],
        )
        .unwrap()
        .materialize_to_table()
        .unwrap();
    assert_eq!(column(&out, "val"), &[int(20), int(20)]);
}

#[test]
fn null_entity_keys_never_match() {
    let (store, backend) = memory_store();
    backend
        .insert_batch("view_a_src", view_a_rows(&[(1, "2023-01-09", 20)]))
        .unwrap();

    let entity = RowBatch::new(vec![
        Column::new("id", vec![Scalar::Null, int(1)]),
        Column::new("event_timestamp", vec![ts("2023-01-10"), ts("2023-01-10")]),
    ]);
    let out = store
        .get_historical_features(vec![view_a(0)], entity.into(), false, vec![])
        .unwrap()
        .materialize_to_table()
        .unwrap();
    assert_eq!(column(&out, "val"), &[Scalar::Null, int(20)]);
}

#[test]
fn multiple_views_with_full_feature_names() {
    let (store, backend) = memory_store();
    backend
        .insert_batch("driver_hourly_src", driver_stats(&[1001, 1002], 3))
        .unwrap();
    backend.insert_batch("customer_src", customer_profiles()).unwrap();

    let entity = RowBatch::new(vec![
        Column::new("driver_id", vec![int(1001), int(1002), int(1003)]),
        Column::new("customer_id", vec![text("c1"), text("c2"), text("c1")]),
        Column::new(
            "event_timestamp",
            vec![ts("2023-01-02T05:30:00Z"), ts("2023-01-03"), ts("2023-01-05")],
        ),
        Column::new("label", vec![Scalar::Bool(true), Scalar::Bool(false), Scalar::Null]),
    ]);

    let out = store
        .get_historical_features(
            vec![driver_hourly_view(), customer_view()],
            entity.into(),
            true,
            vec![],
        )
        .unwrap()
        .materialize_to_table()
        .unwrap();

    assert_eq!(
        out.schema.names(),
        vec![
            "driver_id",
            "customer_id",
            "event_timestamp",
            "label",
            "driver_hourly_stats__conv_rate",
            "driver_hourly_stats__acc_rate",
            "driver_hourly_stats__avg_daily_trips",
            "customer_profile__avg_orders",
        ]
    );
    assert_eq!(out.num_rows(), 3);

    // 1001 at 05:30 on day 2 sees the 05:00 row (hour index 29).
    let h = 29;
    assert_eq!(
        column(&out, "driver_hourly_stats__conv_rate")[0],
        float(((1001 * 31 + h) % 100) as f64 / 100.0)
    );
    // 1002 at midnight of day 3 sees the row stamped exactly then (hour 48).
    assert_eq!(
        column(&out, "driver_hourly_stats__avg_daily_trips")[1],
        int((1002 + 48) % 50)
    );
    // 1003 has no stats at all.
    assert_eq!(column(&out, "driver_hourly_stats__acc_rate")[2], Scalar::Null);

    assert_eq!(
        column(&out, "customer_profile__avg_orders"),
        &[float(1.5), float(7.0), float(2.5)]
    );
    assert_eq!(
        column(&out, "label"),
        &[Scalar::Bool(true), Scalar::Bool(false), Scalar::Null]
    );
}

#[test]
fn bare_feature_name_collisions_get_distinct_suffixes() {
    let (store, backend) = memory_store();
    let mut views = vec![view_a(0)];
    backend
        .insert_batch("view_a_src", view_a_rows(&[(1, "2023-01-09", 1)]))
        .unwrap();
    for (name, value) in [("view_b", 2), ("view_c", 3)] {
        let source = format!("{name}_src");
        backend
            .insert_batch(&source, view_a_rows(&[(1, "2023-01-08", value)]))
            .unwrap();
        views.push(FeatureViewSpec::new(
            name,
            vec!["id".into()],
            vec!["val".into()],
            "ts",
            SourceDescriptor::table(source),
        ));
    }

    let job = store
        .get_historical_features(views, entity_rows(&[(1, "2023-01-10")]).into(), false, vec![])
        .unwrap();
    let out = job.materialize_to_table().unwrap();

    assert_eq!(
        out.schema.names(),
        vec!["id", "event_timestamp", "val", "val_right", "val_right_2"]
    );
    assert_eq!(column(&out, "val"), &[int(1)]);
    assert_eq!(column(&out, "val_right"), &[int(2)]);
    assert_eq!(column(&out, "val_right_2"), &[int(3)]);

    let batch = job.materialize_to_columnar().unwrap();
    assert_eq!(batch.num_columns(), 5);
}

#[test]
fn field_mapping_renames_source_columns() {
    let (store, backend) = memory_store();
    backend
        .insert_batch(
            "view_a_src",
            RowBatch::new(vec![
                Column::new("id", vec![int(1)]),
                Column::new("raw_ts", vec![ts("2023-01-09")]),
                Column::new("raw_val", vec![int(20)]),
            ]),
        )
        .unwrap();

    let view = view_a(0)
        .with_field_mapping("raw_ts", "ts")
        .with_field_mapping("raw_val", "val");
    let out = store
        .get_historical_features(vec![view], entity_rows(&[(1, "2023-01-10")]).into(), true, vec![])
        .unwrap()
        .materialize_to_table()
        .unwrap();
    assert_eq!(column(&out, "view_a__val"), &[int(20)]);
}

#[test]
fn query_sources_are_scanned_through_the_backend() {
    let (store, backend) = memory_store();
    backend
        .insert_batch(
            "view_a_raw",
            view_a_rows(&[(1, "2023-01-08", 8), (1, "2023-01-09", -1)]),
        )
        .unwrap();

    let mut view = view_a(0);
    view.source = SourceDescriptor::query("SELECT * FROM view_a_raw WHERE val >= 0");
    let out = store
        .get_historical_features(vec![view], entity_rows(&[(1, "2023-01-10")]).into(), false, vec![])
        .unwrap()
        .materialize_to_table()
        .unwrap();
    assert_eq!(column(&out, "val"), &[int(8)]);
}

#[test]
fn multi_line_queries_with_quoted_literals() {
    let (store, backend) = memory_store();
    backend
        .insert_batch(
            "view_a_raw",
            RowBatch::new(vec![
                Column::new("id", vec![int(1), int(1), int(1)]),
                Column::new(
                    "ts",
                    vec![ts("2023-01-07"), ts("2023-01-08"), ts("2023-01-09")],
                ),
                Column::new("val", vec![int(7), int(8), int(9)]),
                Column::new(
                    "tag",
                    vec![text("keep"), text("a AND b < c"), text("drop")],
                ),
            ]),
        )
        .unwrap();

    let mut view = view_a(0);
    view.source = SourceDescriptor::query(
        "SELECT id, ts, val\n\tFROM view_a_raw\nWHERE val >= 0\n  AND tag != 'drop'\n  AND tag <> 'x = y'",
    );
    let out = store
        .get_historical_features(vec![view], entity_rows(&[(1, "2023-01-10")]).into(), false, vec![])
        .unwrap()
        .materialize_to_table()
        .unwrap();
    // The 2023-01-09 row is filtered out; the quoted row is the latest left.
    assert_eq!(column(&out, "val"), &[int(8)]);
}

#[test]
fn json_and_query_entity_inputs() {
    let (store, backend) = memory_store();
    backend
        .insert_batch("view_a_src", view_a_rows(&[(1, "2023-01-09", 20), (2, "2023-01-01", 3)]))
        .unwrap();

    let input = EntityInput::try_from(json!([
        {"id": 2, "event_timestamp": "2023-01-02T00:00:00Z", "order": "o-1"},
        {"id": 1, "event_timestamp": "2023-01-10 00:00:00", "order": "o-2"}
    ]))
    .unwrap();
    let out = store
        .get_historical_features(vec![view_a(0)], input, false, vec![])
        .unwrap()
        .materialize_to_table()
        .unwrap();
    // JSON columns come out sorted by name.
    assert_eq!(out.schema.names(), vec!["event_timestamp", "id", "order", "val"]);
    assert_eq!(column(&out, "val"), &[int(3), int(20)]);

    backend
        .insert_batch("orders", entity_rows(&[(1, "2023-01-10"), (2, "2023-01-10")]))
        .unwrap();
    let out = store
        .get_historical_features(
            vec![view_a(0)],
            EntityInput::Query("SELECT id, event_timestamp FROM orders WHERE id == 1".into()),
            false,
            vec![],
        )
        .unwrap()
        .materialize_to_table()
        .unwrap();
    assert_eq!(column(&out, "id"), &[int(1)]);
    assert_eq!(column(&out, "val"), &[int(20)]);
}

#[test]
fn empty_entity_frame_gives_an_empty_result() {
    let (store, backend) = memory_store();
    backend
        .insert_batch("view_a_src", view_a_rows(&[(1, "2023-01-09", 20)]))
        .unwrap();

    let schema = Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("event_timestamp", DataType::Timestamp, false),
    ]);
    let entity = Relation::new(schema, entity_rows(&[]).take(&[])).unwrap();
    let out = store
        .get_historical_features(vec![view_a(0)], entity.into(), true, vec![])
        .unwrap()
        .materialize_to_table()
        .unwrap();
    assert_eq!(out.num_rows(), 0);
    assert_eq!(out.schema.names(), vec!["id", "event_timestamp", "view_a__val"]);
}

#[test]
fn columnar_output_matches_the_table() {
    let (store, backend) = memory_store();
    backend
        .insert_batch("view_a_src", view_a_rows(&[(1, "2023-01-09", 20)]))
        .unwrap();

    let job = store
        .get_historical_features(
            vec![view_a(0)],
            entity_rows(&[(1, "2023-01-10"), (5, "2023-01-10")]).into(),
            true,
            vec![],
        )
        .unwrap();
    let table = job.materialize_to_table().unwrap();
    let rb = job.materialize_to_columnar().unwrap();

    assert_eq!(rb.num_rows(), table.num_rows());
    let names: Vec<String> = rb.schema().fields().iter().map(|f| f.name().clone()).collect();
    assert_eq!(names, table.schema.names());
    assert_eq!(table.schema.field_by_name("event_timestamp").unwrap().data_type, DataType::Timestamp);
    assert_eq!(rb.column(2).null_count(), 1);
}
