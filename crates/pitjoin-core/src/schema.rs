//! Logical schema types. Pure data; no Arrow dependency here.
//!
//! The `types.rs` module contains the `Scalar`/`Column` row representation.
//! `pitjoin-exec` converts to Arrow only at the columnar output boundary.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    Utf8,
    Binary,
    /// UTC instant at microsecond precision.
    Timestamp,
}

impl DataType {
    pub fn is_timestamp(&self) -> bool {
        matches!(self, DataType::Timestamp)
    }

    /// Parse the loose type names accepted in YAML and discovered schemas.
    pub fn parse(s: &str) -> Option<DataType> {
        Some(match s {
            "Boolean" | "bool" | "boolean" => DataType::Boolean,
            "Int32" | "i32" | "int" | "integer" => DataType::Int32,
            "Int64" | "i64" | "bigint" | "long" => DataType::Int64,
            "Float32" | "f32" | "float" => DataType::Float32,
            "Float64" | "f64" | "double" => DataType::Float64,
            "Utf8" | "string" | "str" => DataType::Utf8,
            "Binary" | "bytes" | "binary" => DataType::Binary,
            "Timestamp" | "timestamp" | "datetime" => DataType::Timestamp,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Names of every timestamp-typed column, in schema order.
    pub fn timestamp_columns(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.data_type.is_timestamp())
            .map(|f| f.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_columns_keep_schema_order() {
        let schema = Schema::new(vec![
            Field::new("b_ts", DataType::Timestamp, false),
            Field::new("id", DataType::Int64, false),
            Field::new("a_ts", DataType::Timestamp, true),
        ]);
        assert_eq!(schema.timestamp_columns(), vec!["b_ts", "a_ts"]);
        assert_eq!(schema.index_of("id"), Some(1));
        assert!(!schema.contains("missing"));
    }

    #[test]
    fn parse_accepts_yaml_aliases() {
        assert_eq!(DataType::parse("datetime"), Some(DataType::Timestamp));
        assert_eq!(DataType::parse("i64"), Some(DataType::Int64));
        assert_eq!(DataType::parse("decimal"), None);
    }
}
