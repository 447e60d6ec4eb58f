//! Feature source descriptors and their persisted form.
//!
//! A descriptor names where feature rows come from: an existing relation or
//! an ad-hoc query the backend can run. The persisted form is an opaque
//! byte envelope: magic, version, blake3 checksum, then a JSON body.

use serde::{Deserialize, Serialize};

use crate::backend::ExecutionBackend;
use crate::error::{Error, Result};
use crate::hash::hash_bytes;
use crate::schema::Schema;

const MAGIC: &[u8; 4] = b"PJSD";
const VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 1 + 32;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum SourceDescriptor {
    /// Reference to a relation the backend already knows by name.
    Table(String),
    /// Query text the backend executes to produce a relation.
    Query(String),
}

impl SourceDescriptor {
    pub fn table(name: impl Into<String>) -> Self {
        SourceDescriptor::Table(name.into())
    }

    pub fn query(text: impl Into<String>) -> Self {
        SourceDescriptor::Query(text.into())
    }

    /// Text that can stand in for this source in a `FROM` clause.
    pub fn query_string(&self) -> String {
        match self {
            SourceDescriptor::Table(name) => format!("`{}`", name),
            SourceDescriptor::Query(text) => format!("({})", text),
        }
    }

    /// Short label for errors and logs.
    pub fn label(&self) -> &str {
        match self {
            SourceDescriptor::Table(name) => name,
            SourceDescriptor::Query(text) => text,
        }
    }

    /// Discover the relation's columns through the backend.
    pub fn schema(&self, backend: &dyn ExecutionBackend) -> Result<Schema> {
        backend.discover_schema(self)
    }

    /// Check that the source resolves; fails with `SourceNotFound` otherwise.
    pub fn validate(&self, backend: &dyn ExecutionBackend) -> Result<()> {
        self.schema(backend).map(|_| ())
    }

    pub fn serialize(&self) -> Vec<u8> {
        // Serializing a plain enum of strings cannot fail.
        let body = serde_json::to_vec(self).unwrap_or_default();
        let mut out = Vec::with_capacity(HEADER_LEN + body.len());
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        out.extend_from_slice(&hash_bytes(&body).0);
        out.extend_from_slice(&body);
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::DescriptorCorrupt(format!(
                "envelope too short ({} bytes)",
                bytes.len()
            )));
        }
        let (magic, rest) = bytes.split_at(MAGIC.len());
        if magic != MAGIC {
            return Err(Error::DescriptorCorrupt("bad magic".into()));
        }
        let (version, rest) = rest.split_at(1);
        if version[0] != VERSION {
            return Err(Error::DescriptorCorrupt(format!(
                "unsupported version {}",
                version[0]
            )));
        }
        let (checksum, body) = rest.split_at(32);
        if hash_bytes(body).0.as_slice() != checksum {
            return Err(Error::DescriptorCorrupt("checksum mismatch".into()));
        }
        serde_json::from_slice(body).map_err(|e| Error::DescriptorCorrupt(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_both_kinds() {
        for d in [
            SourceDescriptor::table("driver_stats"),
            SourceDescriptor::query("SELECT * FROM driver_stats WHERE rating > 3"),
        ] {
            assert_eq!(SourceDescriptor::deserialize(&d.serialize()).unwrap(), d);
        }
    }

    #[test]
    fn flipped_byte_is_corrupt() {
        let mut bytes = SourceDescriptor::table("t").serialize();
        let last = bytes.len() - 2;
        bytes[last] ^= 0x01;
        assert!(matches!(
            SourceDescriptor::deserialize(&bytes),
            Err(Error::DescriptorCorrupt(_))
        ));
    }

    #[test]
    fn truncated_and_foreign_inputs_are_corrupt() {
        assert!(matches!(
            SourceDescriptor::deserialize(b"PJ"),
            Err(Error::DescriptorCorrupt(_))
        ));
        let mut bytes = SourceDescriptor::table("t").serialize();
        bytes[0] = b'X';
        assert!(matches!(
            SourceDescriptor::deserialize(&bytes),
            Err(Error::DescriptorCorrupt(_))
        ));
        let mut bytes = SourceDescriptor::table("t").serialize();
        bytes[4] = 9;
        assert!(matches!(
            SourceDescriptor::deserialize(&bytes),
            Err(Error::DescriptorCorrupt(_))
        ));
    }

    #[test]
    fn query_string_quotes_tables_and_wraps_queries() {
        assert_eq!(SourceDescriptor::table("t").query_string(), "`t`");
        assert_eq!(
            SourceDescriptor::query("SELECT 1").query_string(),
            "(SELECT 1)"
        );
    }
}
