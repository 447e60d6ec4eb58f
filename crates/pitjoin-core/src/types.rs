//! Lightweight logical value/column types to avoid bringing Arrow into core.
//!
//! Operators work on `RowBatch` directly; the exec crate converts to Arrow
//! arrays only when a caller asks for columnar output.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{DataType, Field, Schema};
use crate::time::format_timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
    /// Microseconds since the Unix epoch, UTC.
    Timestamp(i64),
}

impl Scalar {
    /// Type of a non-null value; `None` for `Null`.
    pub fn data_type(&self) -> Option<DataType> {
        Some(match self {
            Scalar::Null => return None,
            Scalar::Bool(_) => DataType::Boolean,
            Scalar::I32(_) => DataType::Int32,
            Scalar::I64(_) => DataType::Int64,
            Scalar::F32(_) => DataType::Float32,
            Scalar::F64(_) => DataType::Float64,
            Scalar::Str(_) => DataType::Utf8,
            Scalar::Bin(_) => DataType::Binary,
            Scalar::Timestamp(_) => DataType::Timestamp,
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            Scalar::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Append a canonical byte encoding used for equality keys.
    ///
    /// Returns `false` for `Null`: nulls never compare equal in joins or groups.
    /// Integer widths share one encoding so `I32(1)` matches `I64(1)`.
    pub fn write_key(&self, out: &mut Vec<u8>) -> bool {
        use Scalar::*;
        match self {
            Null => return false,
            Bool(b) => {
                out.push(1);
                out.push(*b as u8);
            }
            I32(i) => {
                out.push(2);
                out.extend_from_slice(&(*i as i64).to_le_bytes());
            }
            I64(i) => {
                out.push(2);
                out.extend_from_slice(&i.to_le_bytes());
            }
            F32(f) => {
                out.push(4);
                out.extend_from_slice(&(*f as f64).to_bits().to_le_bytes());
            }
            F64(f) => {
                out.push(4);
                out.extend_from_slice(&f.to_bits().to_le_bytes());
            }
            Str(s) => {
                out.push(6);
                out.extend_from_slice(&(s.len() as u64).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            Bin(b) => {
                out.push(7);
                out.extend_from_slice(&(b.len() as u64).to_le_bytes());
                out.extend_from_slice(b);
            }
            Timestamp(t) => {
                out.push(8);
                out.extend_from_slice(&t.to_le_bytes());
            }
        }
        true
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::I32(v) => write!(f, "{v}"),
            Scalar::I64(v) => write!(f, "{v}"),
            Scalar::F32(v) => write!(f, "{v}"),
            Scalar::F64(v) => write!(f, "{v}"),
            Scalar::Str(s) => f.write_str(s),
            Scalar::Bin(bytes) => write!(f, "{:?}", bytes),
            Scalar::Timestamp(t) => f.write_str(&format_timestamp(*t)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Scalar>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Scalar>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Row batch in column-major order; every column has the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowBatch {
    pub columns: Vec<Column>,
}

impl RowBatch {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Resolve column names to indices, failing on the first missing one.
    pub fn column_indices(&self, names: &[String]) -> Result<Vec<usize>> {
        names
            .iter()
            .map(|n| {
                self.column_index(n)
                    .ok_or_else(|| Error::Schema(format!("column '{}' not found", n)))
            })
            .collect()
    }

    /// Check that all columns have the same length.
    pub fn validate(&self) -> Result<()> {
        let rows = self.num_rows();
        match self.columns.iter().find(|c| c.len() != rows) {
            Some(c) => Err(Error::Schema(format!(
                "column '{}' has {} rows, expected {}",
                c.name,
                c.len(),
                rows
            ))),
            None => Ok(()),
        }
    }

    /// Gather rows by index, preserving the given order.
    pub fn take(&self, indices: &[usize]) -> RowBatch {
        RowBatch {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: indices.iter().map(|&i| c.values[i].clone()).collect(),
                })
                .collect(),
        }
    }

    /// Equality key for one row over the given columns; `None` if any part is null.
    pub fn row_key(&self, key_indices: &[usize], row: usize) -> Option<Vec<u8>> {
        let mut key = Vec::new();
        for &ci in key_indices {
            if !self.columns[ci].values[row].write_key(&mut key) {
                return None;
            }
        }
        Some(key)
    }

    /// Grouping key for one row: like `row_key`, but nulls form their own group.
    pub fn group_key(&self, key_indices: &[usize], row: usize) -> Vec<u8> {
        let mut key = Vec::new();
        for &ci in key_indices {
            if !self.columns[ci].values[row].write_key(&mut key) {
                key.push(0);
            }
        }
        key
    }

    /// Infer a schema from the first non-null value of each column.
    ///
    /// All-null columns default to `Utf8`; columns mixing types are rejected.
    pub fn infer_schema(&self) -> Result<Schema> {
        self.validate()?;
        let mut fields = Vec::with_capacity(self.columns.len());
        for col in &self.columns {
            let mut data_type = None;
            let mut nullable = false;
            for v in &col.values {
                match (v.data_type(), data_type) {
                    (None, _) => nullable = true,
                    (Some(t), None) => data_type = Some(t),
                    (Some(t), Some(seen)) if t != seen => {
                        return Err(Error::Schema(format!(
                            "column '{}' mixes {:?} and {:?}",
                            col.name, seen, t
                        )))
                    }
                    _ => {}
                }
            }
            fields.push(Field::new(
                col.name.clone(),
                data_type.unwrap_or(DataType::Utf8),
                nullable || data_type.is_none(),
            ));
        }
        Ok(Schema::new(fields))
    }
}

/// A batch together with its declared schema: the unit a backend stores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub schema: Schema,
    pub batch: RowBatch,
}

impl Relation {
    pub fn new(schema: Schema, batch: RowBatch) -> Result<Self> {
        batch.validate()?;
        if schema.fields.len() != batch.columns.len()
            || schema
                .fields
                .iter()
                .zip(&batch.columns)
                .any(|(f, c)| f.name != c.name)
        {
            return Err(Error::Schema(format!(
                "schema columns {:?} do not match batch columns {:?}",
                schema.names(),
                batch.columns.iter().map(|c| &c.name).collect::<Vec<_>>()
            )));
        }
        Ok(Self { schema, batch })
    }

    /// Build from a batch, inferring column types from its values.
    pub fn from_batch(batch: RowBatch) -> Result<Self> {
        let schema = batch.infer_schema()?;
        Ok(Self { schema, batch })
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }
}

/// Compare two scalars for sorting.
///
/// Nulls are sorted first, then values are compared by type.
pub fn scalar_cmp(a: &Scalar, b: &Scalar) -> Ordering {
    use Scalar::*;

    match (a, b) {
        (Null, Null) => Ordering::Equal,
        (Null, _) => Ordering::Less,
        (_, Null) => Ordering::Greater,
        (Bool(x), Bool(y)) => x.cmp(y),
        (I32(x), I32(y)) => x.cmp(y),
        (I64(x), I64(y)) => x.cmp(y),
        (I32(x), I64(y)) => (*x as i64).cmp(y),
        (I64(x), I32(y)) => x.cmp(&(*y as i64)),
        (F32(x), F32(y)) => float_cmp(*x as f64, *y as f64),
        (F64(x), F64(y)) => float_cmp(*x, *y),
        (Str(x), Str(y)) => x.cmp(y),
        (Bin(x), Bin(y)) => x.cmp(y),
        (Timestamp(x), Timestamp(y)) => x.cmp(y),
        // Mixed types: order by variant order
        _ => scalar_type_order(a).cmp(&scalar_type_order(b)),
    }
}

fn float_cmp(x: f64, y: f64) -> Ordering {
    if x.is_nan() && y.is_nan() {
        Ordering::Equal
    } else if x.is_nan() {
        Ordering::Greater
    } else if y.is_nan() {
        Ordering::Less
    } else {
        x.partial_cmp(&y).unwrap_or(Ordering::Equal)
    }
}

/// Assign a numeric order to scalar types for mixed-type comparisons.
fn scalar_type_order(s: &Scalar) -> u8 {
    use Scalar::*;
    match s {
        Null => 0,
        Bool(_) => 1,
        I32(_) => 2,
        I64(_) => 3,
        F32(_) => 4,
        F64(_) => 5,
        Str(_) => 6,
        Bin(_) => 7,
        Timestamp(_) => 8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> RowBatch {
        RowBatch::new(vec![
            Column::new("id", vec![Scalar::I64(2), Scalar::I64(1), Scalar::Null]),
            Column::new(
                "ts",
                vec![
                    Scalar::Timestamp(30),
                    Scalar::Timestamp(10),
                    Scalar::Timestamp(20),
                ],
            ),
        ])
    }

    #[test]
    fn infer_schema_marks_nulls() {
        let schema = batch().infer_schema().unwrap();
        assert_eq!(schema.fields[0].data_type, DataType::Int64);
        assert!(schema.fields[0].nullable);
        assert_eq!(schema.fields[1].data_type, DataType::Timestamp);
        assert!(!schema.fields[1].nullable);
    }

    #[test]
    fn infer_schema_rejects_mixed_types() {
        let b = RowBatch::new(vec![Column::new(
            "x",
            vec![Scalar::I64(1), Scalar::Str("a".into())],
        )]);
        assert!(matches!(b.infer_schema(), Err(Error::Schema(_))));
    }

    #[test]
    fn row_key_is_none_for_nulls_and_width_agnostic() {
        let b = batch();
        assert!(b.row_key(&[0], 2).is_none());

        let mut a = Vec::new();
        let mut c = Vec::new();
        Scalar::I32(7).write_key(&mut a);
        Scalar::I64(7).write_key(&mut c);
        assert_eq!(a, c);
    }

    #[test]
    fn relation_rejects_mismatched_schema() {
        let schema = Schema::new(vec![Field::new("other", DataType::Int64, true)]);
        assert!(Relation::new(schema, batch()).is_err());
    }

    #[test]
    fn display_renders_timestamps() {
        assert_eq!(Scalar::Timestamp(0).to_string(), "1970-01-01 00:00:00.000000");
        assert_eq!(Scalar::Null.to_string(), "");
    }
}
