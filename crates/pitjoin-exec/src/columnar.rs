//! Columnar export of retrieval results as Arrow record batches.
//!
//! Timestamps keep their UTC microsecond precision
//! (`Timestamp(Microsecond, "UTC")`).

use std::sync::Arc;

use arrow_array::builder::{
    BinaryBuilder, BooleanBuilder, Float32Builder, Float64Builder, Int32Builder, Int64Builder,
    StringBuilder, TimestampMicrosecondBuilder,
};
use arrow_array::{ArrayRef, RecordBatch, RecordBatchOptions};
use arrow_schema::{DataType as ArrowType, Field as ArrowField, Schema as ArrowSchema, TimeUnit};

use pitjoin_core::schema::DataType;
use pitjoin_core::types::{Column, Relation, Scalar};

use crate::ExecError;

pub const UTC: &str = "UTC";

pub fn arrow_type(data_type: &DataType) -> ArrowType {
    match data_type {
        DataType::Boolean => ArrowType::Boolean,
        DataType::Int32 => ArrowType::Int32,
        DataType::Int64 => ArrowType::Int64,
        DataType::Float32 => ArrowType::Float32,
        DataType::Float64 => ArrowType::Float64,
        DataType::Utf8 => ArrowType::Utf8,
        DataType::Binary => ArrowType::Binary,
        DataType::Timestamp => ArrowType::Timestamp(TimeUnit::Microsecond, Some(UTC.into())),
    }
}

fn mismatch(column: &Column, expected: &DataType, got: &Scalar) -> ExecError {
    ExecError::Columnar(format!(
        "column '{}' is {expected:?} but holds {got:?}",
        column.name
    ))
}

// One arm per type; every builder appends null for `Scalar::Null`.
macro_rules! build_array {
    ($builder:expr, $column:expr, $dt:expr, $pat:pat => $val:expr) => {{
        let mut builder = $builder;
        for v in &$column.values {
            match v {
                Scalar::Null => builder.append_null(),
                $pat => builder.append_value($val),
                other => return Err(mismatch($column, $dt, other)),
            }
        }
        Arc::new(builder.finish()) as ArrayRef
    }};
}

fn to_array(column: &Column, data_type: &DataType) -> Result<ArrayRef, ExecError> {
    let n = column.values.len();
    Ok(match data_type {
        DataType::Boolean => {
            build_array!(BooleanBuilder::with_capacity(n), column, data_type, Scalar::Bool(b) => *b)
        }
        DataType::Int32 => {
            build_array!(Int32Builder::with_capacity(n), column, data_type, Scalar::I32(i) => *i)
        }
        DataType::Int64 => {
            build_array!(Int64Builder::with_capacity(n), column, data_type, Scalar::I64(i) => *i)
        }
        DataType::Float32 => {
            build_array!(Float32Builder::with_capacity(n), column, data_type, Scalar::F32(f) => *f)
        }
        DataType::Float64 => {
            build_array!(Float64Builder::with_capacity(n), column, data_type, Scalar::F64(f) => *f)
        }
        DataType::Utf8 => {
            build_array!(StringBuilder::with_capacity(n, n * 8), column, data_type, Scalar::Str(s) => s.as_str())
        }
        DataType::Binary => {
            build_array!(BinaryBuilder::with_capacity(n, n * 8), column, data_type, Scalar::Bin(b) => b.as_slice())
        }
        DataType::Timestamp => build_array!(
            TimestampMicrosecondBuilder::with_capacity(n).with_timezone(UTC),
            column,
            data_type,
            Scalar::Timestamp(us) => *us
        ),
    })
}

/// Convert `relation` into one Arrow record batch with the same column order.
pub fn to_record_batch(relation: &Relation) -> Result<RecordBatch, ExecError> {
    let mut fields = Vec::with_capacity(relation.schema.fields.len());
    let mut arrays = Vec::with_capacity(relation.schema.fields.len());

    for field in &relation.schema.fields {
        let column = relation.batch.column(&field.name).ok_or_else(|| {
            ExecError::Columnar(format!("schema column '{}' has no values", field.name))
        })?;
        let nullable = field.nullable || column.values.iter().any(Scalar::is_null);
        fields.push(ArrowField::new(
            field.name.clone(),
            arrow_type(&field.data_type),
            nullable,
        ));
        arrays.push(to_array(column, &field.data_type)?);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(relation.num_rows()));
    RecordBatch::try_new_with_options(Arc::new(ArrowSchema::new(fields)), arrays, &options)
        .map_err(|e| ExecError::Columnar(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::cast::AsArray;
    use arrow_array::types::{Int64Type, TimestampMicrosecondType};
    use arrow_array::Array;
    use pitjoin_core::schema::{Field, Schema};
    use pitjoin_core::types::RowBatch;

    #[test]
    fn converts_types_and_nulls() {
        let schema = Schema::new(vec![
            Field::new("driver_id", DataType::Int64, false),
            Field::new("event_timestamp", DataType::Timestamp, false),
            Field::new("conv_rate", DataType::Float64, false),
        ]);
        let batch = RowBatch::new(vec![
            Column::new("driver_id", vec![Scalar::I64(1001), Scalar::I64(1002)]),
            Column::new("event_timestamp", vec![Scalar::Timestamp(5), Scalar::Timestamp(6)]),
            Column::new("conv_rate", vec![Scalar::F64(0.5), Scalar::Null]),
        ]);
        let rb = to_record_batch(&Relation::new(schema, batch).unwrap()).unwrap();

        assert_eq!(rb.num_rows(), 2);
        assert_eq!(rb.column(0).as_primitive::<Int64Type>().value(1), 1002);
        assert_eq!(
            rb.schema().field(1).data_type(),
            &ArrowType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
        );
        assert_eq!(rb.column(1).as_primitive::<TimestampMicrosecondType>().value(0), 5);
        // Declared non-null, but a missing feature value made it nullable.
        assert!(rb.schema().field(2).is_nullable());
        assert!(rb.column(2).is_null(1));
    }

    #[test]
    fn empty_relation_keeps_schema() {
        let schema = Schema::new(vec![Field::new("id", DataType::Utf8, true)]);
        let batch = RowBatch::new(vec![Column::new("id", vec![])]);
        let rb = to_record_batch(&Relation::new(schema, batch).unwrap()).unwrap();
        assert_eq!(rb.num_rows(), 0);
        assert_eq!(rb.schema().field(0).name(), "id");
    }
}
