//! In-memory storage engine.
//!
//! A [`KvBackend`] over one `BTreeMap` per column family. Ordering matches
//! RocksDB's default bytewise comparator, so a store built on it behaves the
//! same as the persistent one. Nothing is written to disk.

use super::{prefix_successor, KvBackend, RawPair, WriteOp};
use crate::error::Result;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::trace;

type Tree = BTreeMap<Vec<u8>, Vec<u8>>;

/// BTreeMap-backed [`KvBackend`].
#[derive(Debug, Default)]
pub struct MemoryBackend {
    trees: RwLock<HashMap<String, Tree>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Tree>> {
        self.trees.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, HashMap<String, Tree>> {
        self.trees.write().unwrap_or_else(|p| p.into_inner())
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.read().get(cf).and_then(|t| t.get(key)).cloned())
    }

    fn multi_get(&self, cf: &str, keys: &[Vec<u8>]) -> Result<Vec<Option<Vec<u8>>>> {
        let trees = self.read();
        let tree = trees.get(cf);
        Ok(keys
            .iter()
            .map(|k| tree.and_then(|t| t.get(k)).cloned())
            .collect())
    }

    fn write(&self, ops: Vec<WriteOp>) -> Result<()> {
        let mut trees = self.write_guard();
        trace!(ops = ops.len(), "memory_write");
        for op in ops {
            match op {
                WriteOp::Put { cf, key, value } => {
                    trees.entry(cf.to_string()).or_default().insert(key, value);
                }
                WriteOp::Delete { cf, key } => {
                    if let Some(tree) = trees.get_mut(cf) {
                        tree.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }

    fn scan_after(
        &self,
        cf: &str,
        prefix: &[u8],
        after: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<RawPair>> {
        let trees = self.read();
        let Some(tree) = trees.get(cf) else {
            return Ok(Vec::new());
        };

        let lower = match after {
            Some(a) => Bound::Excluded(a.to_vec()),
            None => Bound::Included(prefix.to_vec()),
        };
        Ok(tree
            .range((lower, Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .take(limit)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn scan_before(
        &self,
        cf: &str,
        prefix: &[u8],
        before: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<RawPair>> {
        let trees = self.read();
        let Some(tree) = trees.get(cf) else {
            return Ok(Vec::new());
        };

        let upper = match before.map(<[u8]>::to_vec).or_else(|| prefix_successor(prefix)) {
            Some(b) => Bound::Excluded(b),
            None => Bound::Unbounded,
        };
        Ok(tree
            .range((Bound::Unbounded, upper))
            .rev()
            .take_while(|(k, _)| k.starts_with(prefix))
            .take(limit)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_with(keys: &[&[u8]]) -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend
            .write(
                keys.iter()
                    .map(|k| WriteOp::Put {
                        cf: "hash",
                        key: k.to_vec(),
                        value: Vec::new(),
                    })
                    .collect(),
            )
            .unwrap();
        backend
    }

    #[test]
    fn test_unknown_column_family_is_empty() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("hash", b"k").unwrap(), None);
        assert!(backend.scan_after("hash", b"t\0", None, 5).unwrap().is_empty());
        assert!(backend.scan_before("hash", b"t\0", None, 5).unwrap().is_empty());
    }

    #[test]
    fn test_scans_stay_inside_prefix() {
        let backend = backend_with(&[b"s\0z", b"t\0a", b"t\0b", b"t\x01a"]);

        let fwd = backend.scan_after("hash", b"t\0", None, 10).unwrap();
        assert_eq!(fwd.len(), 2);
        assert_eq!(fwd[0].0, b"t\0a");

        let back = backend.scan_before("hash", b"t\0", None, 10).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].0, b"t\0b");

        let before = backend.scan_before("hash", b"t\0", Some(b"t\0b"), 10).unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].0, b"t\0a");
    }

    #[test]
    fn test_delete_missing_key_is_ok() {
        let backend = MemoryBackend::new();
        backend
            .write(vec![WriteOp::Delete {
                cf: "hash",
                key: b"missing".to_vec(),
            }])
            .unwrap();
    }
}
