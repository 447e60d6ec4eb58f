//! Stable hashing helpers for plans, manifests, descriptors, and outputs.

use blake3::Hasher;
use serde::Serialize;

use crate::types::RowBatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        // blake3 hex(32b) is 64 hex chars
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(bytes);
    let out = h.finalize();
    Hash256(out.into())
}

/// Hash any serde-serializable value deterministically (via JSON).
pub fn hash_serde<T: Serialize>(v: &T) -> Result<Hash256, crate::error::Error> {
    let bytes = serde_json::to_vec(v).map_err(|e| crate::error::Error::Hash(e.to_string()))?;
    Ok(hash_bytes(&bytes))
}

/// Order-independent digest of a batch: rows are hashed individually and
/// the row digests are sorted before folding, so equal row multisets match.
pub fn hash_rows_unordered(batch: &RowBatch) -> Hash256 {
    let mut row_digests: Vec<[u8; 32]> = (0..batch.num_rows())
        .map(|row| {
            let mut h = Hasher::new();
            for col in &batch.columns {
                h.update(col.name.as_bytes());
                let mut buf = Vec::new();
                if !col.values[row].write_key(&mut buf) {
                    buf.push(0);
                }
                h.update(&(buf.len() as u64).to_le_bytes());
                h.update(&buf);
            }
            h.finalize().into()
        })
        .collect();
    row_digests.sort_unstable();

    let mut h = Hasher::new();
    for d in &row_digests {
        h.update(d);
    }
    Hash256(h.finalize().into())
}
