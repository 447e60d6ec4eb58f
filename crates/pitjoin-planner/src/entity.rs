//! Entity frame preparation.
//!
//! Turns caller-supplied entity events into a registered, addressable
//! relation with a known event-timestamp column, and checks that every
//! feature view can find its join keys in it.

use pitjoin_core::backend::ExecutionBackend;
use pitjoin_core::config::SessionConfig;
use pitjoin_core::error::{Error, Result};
use pitjoin_core::schema::Schema;
use pitjoin_core::source::SourceDescriptor;
use pitjoin_core::time::parse_timestamp;
use pitjoin_core::types::{Column, Relation, RowBatch, Scalar};
use pitjoin_core::view::FeatureViewSpec;
use serde_json::Value;
use uuid::Uuid;

/// A timestamp column with this name wins inference outright.
pub const PREFERRED_TIMESTAMP_COLUMN: &str = "event_timestamp";

/// Entity events as supplied by the caller.
#[derive(Debug, Clone)]
pub enum EntityInput {
    /// In-memory rows; column types are inferred from the values.
    Table(RowBatch),
    /// In-memory rows with an explicit schema.
    Relation(Relation),
    /// Query text the backend runs to produce the rows.
    Query(String),
}

impl From<RowBatch> for EntityInput {
    fn from(batch: RowBatch) -> Self {
        EntityInput::Table(batch)
    }
}

impl From<Relation> for EntityInput {
    fn from(relation: Relation) -> Self {
        EntityInput::Relation(relation)
    }
}

impl TryFrom<Value> for EntityInput {
    type Error = Error;

    /// Arrays of objects become tables, strings become queries.
    ///
    /// Object keys become columns (sorted by name). Numbers map to `I64` or
    /// `F64`. Strings stay strings except in timestamp candidates: a column
    /// whose values all parse as timestamps. If `event_timestamp` is such a
    /// column it is the only one converted, so other date-like attributes
    /// (`signup_date`) stay text. Without it every candidate is converted, and
    /// more than one candidate makes planning fail with `AmbiguousTimestamp`.
    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(query) => Ok(EntityInput::Query(query)),
            Value::Array(rows) => rows_to_batch(&rows).map(EntityInput::Table),
            other => Err(Error::InvalidInputType(format!(
                "expected an array of rows or a query string, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn rows_to_batch(rows: &[Value]) -> Result<RowBatch> {
    let mut names: Vec<String> = Vec::new();
    for row in rows {
        let obj = row.as_object().ok_or_else(|| {
            Error::InvalidInputType(format!("entity row must be an object, got {}", json_kind(row)))
        })?;
        for k in obj.keys() {
            if !names.contains(k) {
                names.push(k.clone());
            }
        }
    }
    names.sort();

    let raw_columns: Vec<(String, Vec<&Value>)> = names
        .into_iter()
        .map(|name| {
            let raw: Vec<&Value> = rows
                .iter()
                .map(|r| r.get(&name).unwrap_or(&Value::Null))
                .collect();
            (name, raw)
        })
        .collect();

    let candidates: Vec<&str> = raw_columns
        .iter()
        .filter(|(_, raw)| all_timestamps(raw))
        .map(|(name, _)| name.as_str())
        .collect();
    let converted: Vec<String> = if candidates.contains(&PREFERRED_TIMESTAMP_COLUMN) {
        vec![PREFERRED_TIMESTAMP_COLUMN.to_string()]
    } else {
        candidates.iter().map(|c| c.to_string()).collect()
    };

    let mut columns = Vec::with_capacity(raw_columns.len());
    for (name, raw) in raw_columns {
        let as_timestamps = converted.contains(&name);
        let values = raw
            .into_iter()
            .map(|v| json_scalar(v, as_timestamps))
            .collect::<Result<Vec<_>>>()?;
        columns.push(Column::new(name, values));
    }
    Ok(RowBatch::new(columns))
}

/// Non-empty and every non-null value is a parseable timestamp string.
fn all_timestamps(raw: &[&Value]) -> bool {
    raw.iter().any(|v| !v.is_null())
        && raw.iter().all(|v| match v {
            Value::Null => true,
            Value::String(s) => parse_timestamp(s).is_some(),
            _ => false,
        })
}

fn json_scalar(v: &Value, as_timestamp: bool) -> Result<Scalar> {
    Ok(match v {
        Value::Null => Scalar::Null,
        Value::Bool(b) => Scalar::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Scalar::I64(i),
            None => Scalar::F64(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) if as_timestamp => parse_timestamp(s)
            .map(Scalar::Timestamp)
            .unwrap_or(Scalar::Null),
        Value::String(s) => Scalar::Str(s.clone()),
        other => {
            return Err(Error::InvalidInputType(format!(
                "unsupported entity value: {}",
                json_kind(other)
            )))
        }
    })
}

/// A registered entity frame ready for planning.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedEntityFrame {
    /// Name the frame is registered under in the backend.
    pub relation: String,
    pub schema: Schema,
    pub timestamp_column: String,
    pub num_rows: usize,
}

/// Pick the entity event-timestamp column.
///
/// A timestamp column named `event_timestamp` wins; otherwise exactly one
/// timestamp-typed column must exist.
pub fn infer_event_timestamp_column(schema: &Schema) -> Result<String> {
    let candidates = schema.timestamp_columns();
    if candidates.contains(&PREFERRED_TIMESTAMP_COLUMN) {
        return Ok(PREFERRED_TIMESTAMP_COLUMN.to_string());
    }
    match candidates.as_slice() {
        [only] => Ok(only.to_string()),
        [] => Err(Error::AmbiguousTimestamp(
            "no timestamp-typed column in entity frame".into(),
        )),
        many => Err(Error::AmbiguousTimestamp(format!(
            "multiple timestamp-typed columns: {}",
            many.join(", ")
        ))),
    }
}

/// Every view's join keys must be present in the entity frame.
pub fn validate_join_keys(schema: &Schema, views: &[FeatureViewSpec]) -> Result<()> {
    for view in views {
        if let Some(key) = view.join_keys.iter().find(|k| !schema.contains(k)) {
            return Err(Error::MissingJoinKey {
                view: view.name.clone(),
                key: key.clone(),
            });
        }
    }
    Ok(())
}

/// Registers entity frames with a backend.
pub struct EntityFramePreparer<'a> {
    backend: &'a dyn ExecutionBackend,
    relation_prefix: String,
}

impl<'a> EntityFramePreparer<'a> {
    pub fn new(backend: &'a dyn ExecutionBackend, config: &SessionConfig) -> Self {
        Self {
            backend,
            relation_prefix: config.entity_relation_prefix.clone(),
        }
    }

    /// Register `input` under a fresh unique name and validate it against
    /// `views`. Nothing is registered when validation fails.
    pub fn prepare(&self, input: EntityInput, views: &[FeatureViewSpec]) -> Result<PreparedEntityFrame> {
        let relation = match input {
            EntityInput::Table(batch) => {
                batch.validate()?;
                let schema = batch.infer_schema()?;
                Relation::new(schema, batch)?
            }
            EntityInput::Relation(relation) => relation,
            EntityInput::Query(query) => self.backend.load(&SourceDescriptor::query(query))?,
        };

        let timestamp_column = infer_event_timestamp_column(&relation.schema)?;
        validate_join_keys(&relation.schema, views)?;

        let name = format!("{}_{}", self.relation_prefix, Uuid::new_v4().simple());
        let prepared = PreparedEntityFrame {
            relation: name.clone(),
            schema: relation.schema.clone(),
            timestamp_column,
            num_rows: relation.num_rows(),
        };
        self.backend.register(&name, relation)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            relation = %prepared.relation,
            rows = prepared.num_rows,
            timestamp = %prepared.timestamp_column,
            "registered entity frame"
        );

        Ok(prepared)
    }
}
