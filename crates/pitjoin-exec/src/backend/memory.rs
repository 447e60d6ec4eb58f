//! In-process backend: named relations held in memory.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use pitjoin_core::backend::ExecutionBackend;
use pitjoin_core::error::{Error, Result};
use pitjoin_core::schema::Schema;
use pitjoin_core::source::SourceDescriptor;
use pitjoin_core::types::{Relation, RowBatch};

use super::query::SelectQuery;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    relations: RwLock<BTreeMap<String, Relation>>,
    conf: BTreeMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend carrying a session configuration overlay.
    pub fn with_conf(conf: BTreeMap<String, String>) -> Self {
        Self {
            relations: RwLock::default(),
            conf,
        }
    }

    pub fn conf(&self) -> &BTreeMap<String, String> {
        &self.conf
    }

    /// Store rows under `name`, inferring the schema from the values.
    pub fn insert_batch(&self, name: &str, batch: RowBatch) -> Result<()> {
        let schema = batch.infer_schema()?;
        self.register(name, Relation::new(schema, batch)?)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().map(|r| r.contains_key(name)).unwrap_or(false)
    }

    pub fn relation_names(&self) -> Vec<String> {
        self.read()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Relation>>> {
        self.relations
            .read()
            .map_err(|_| Error::Backend("memory backend lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Relation>>> {
        self.relations
            .write()
            .map_err(|_| Error::Backend("memory backend lock poisoned".into()))
    }

    fn with_table<T>(&self, name: &str, f: impl FnOnce(&Relation) -> Result<T>) -> Result<T> {
        let guard = self.read()?;
        let rel = guard
            .get(name)
            .ok_or_else(|| Error::SourceNotFound(name.to_string()))?;
        f(rel)
    }
}

impl ExecutionBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn discover_schema(&self, source: &SourceDescriptor) -> Result<Schema> {
        match source {
            SourceDescriptor::Table(name) => self.with_table(name, |rel| Ok(rel.schema.clone())),
            SourceDescriptor::Query(text) => {
                let q = SelectQuery::parse(text)?;
                self.with_table(&q.table, |rel| q.output_schema(&rel.schema))
            }
        }
    }

    fn register(&self, name: &str, relation: Relation) -> Result<()> {
        relation.batch.validate()?;
        self.write()?.insert(name.to_string(), relation);
        Ok(())
    }

    fn deregister(&self, name: &str) -> Result<()> {
        self.write()?.remove(name);
        Ok(())
    }

    fn load(&self, source: &SourceDescriptor) -> Result<Relation> {
        match source {
            SourceDescriptor::Table(name) => self.with_table(name, |rel| Ok(rel.clone())),
            SourceDescriptor::Query(text) => {
                let q = SelectQuery::parse(text)?;
                self.with_table(&q.table, |rel| {
                    let schema = q.output_schema(&rel.schema)?;
                    let batch = q.execute(&rel.schema, &rel.batch)?;
                    Relation::new(schema, batch)
                })
            }
        }
    }
}
