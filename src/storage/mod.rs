//! Ordered key-value storage.
//!
//! This module turns a raw ordered byte-key engine into the table model the
//! forum works with:
//!
//! - **Hash tables**: `table -> key -> value`, scanned forward or backward in
//!   key order.
//! - **Sorted sets**: `table -> key -> score`, scanned in `(score, key)` order.
//! - **Sequences**: one monotonic counter per table, starting at 1.
//!
//! ## Storage Layout
//!
//! Every table name is turned into a prefix `{table}\0`, so a single column
//! family holds any number of tables and prefix iteration stays inside one:
//!
//! - `hash`: `{table}\0{key}` -> value
//! - `zscore`: `{table}\0{score_be8}{key}` -> () (ordered by score, then key)
//! - `zkey`: `{table}\0{key}` -> score_be8 (reverse lookup for re-scoring)
//! - `meta`: `{table}\0` -> next sequence value (u64 big-endian)
//!
//! ## Backends
//!
//! - `rocksdb`: persistent RocksDB engine
//! - `memory`: `BTreeMap`-backed engine for tests and throwaway stores

#[cfg(test)]
pub(crate) mod counting;
pub mod memory;
pub mod rocksdb;

pub use self::memory::MemoryBackend;
pub use self::rocksdb::{RocksDbBackend, RocksDbConfig};

use crate::error::{ForumError, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace};

/// Column family holding hash table rows.
pub const CF_HASH: &str = "hash";
/// Column family holding the sorted-set order index.
pub const CF_ZSCORE: &str = "zscore";
/// Column family holding sorted-set member scores.
pub const CF_ZKEY: &str = "zkey";
/// Column family holding sequence counters.
pub const CF_META: &str = "meta";

/// All column families a store needs.
pub const COLUMN_FAMILIES: &[&str] = &[CF_HASH, CF_ZSCORE, CF_ZKEY, CF_META];

/// Separator between a table name and the row key.
const TABLE_SEPARATOR: u8 = 0;

/// Width of an encoded score.
const SCORE_LEN: usize = 8;

/// A raw key/value pair as returned by a backend scan.
pub type RawPair = (Vec<u8>, Vec<u8>);

/// A single mutation applied through [`KvBackend::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Insert or overwrite a key.
    Put {
        /// Column family.
        cf: &'static str,
        /// Full key.
        key: Vec<u8>,
        /// Value bytes.
        value: Vec<u8>,
    },
    /// Remove a key. Removing a missing key is not an error.
    Delete {
        /// Column family.
        cf: &'static str,
        /// Full key.
        key: Vec<u8>,
    },
}

/// A raw ordered key-value engine.
///
/// Keys are compared as byte strings. Implementations only have to provide
/// point reads, atomic multi-key writes and bounded prefix scans; the table
/// semantics live in [`Store`].
pub trait KvBackend: Send + Sync + std::fmt::Debug {
    /// Reads one key.
    fn get(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Reads many keys in one round trip. The result is positional.
    fn multi_get(&self, cf: &str, keys: &[Vec<u8>]) -> Result<Vec<Option<Vec<u8>>>>;

    /// Applies all operations atomically.
    fn write(&self, ops: Vec<WriteOp>) -> Result<()>;

    /// Returns up to `limit` pairs whose key starts with `prefix` and is
    /// strictly greater than `after` (or every such pair when `after` is
    /// `None`), in ascending key order.
    fn scan_after(
        &self,
        cf: &str,
        prefix: &[u8],
        after: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<RawPair>>;

    /// Returns up to `limit` pairs whose key starts with `prefix` and is
    /// strictly less than `before` (or every such pair when `before` is
    /// `None`), in descending key order.
    fn scan_before(
        &self,
        cf: &str,
        prefix: &[u8],
        before: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<RawPair>>;
}

/// A hash table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Row key (table prefix stripped).
    pub key: Vec<u8>,
    /// Stored value.
    pub value: Vec<u8>,
}

/// A sorted-set member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredEntry {
    /// Member key decoded as an id.
    pub key: u64,
    /// Member score.
    pub score: u64,
}

/// Encodes an id as an order-preserving 8-byte big-endian key.
pub fn id_key(id: u64) -> Vec<u8> {
    id.to_be_bytes().to_vec()
}

/// Decodes an 8-byte big-endian key back into an id.
///
/// Returns `None` for keys of any other width.
pub fn key_id(key: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = key.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

/// Returns the smallest byte string greater than every string starting with
/// `prefix`, or `None` if the prefix is all `0xFF`.
pub(crate) fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last < u8::MAX {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}

/// Table-level view over a [`KvBackend`].
///
/// `Store` is `Send + Sync` and meant to be shared behind an `Arc` by every
/// request worker. Multi-step writes (sequence allocation, sorted-set
/// re-scoring) are serialized by an internal lock.
#[derive(Debug)]
pub struct Store {
    backend: Arc<dyn KvBackend>,
    write_lock: Mutex<()>,
}

impl Store {
    /// Wraps an existing backend.
    pub fn new(backend: impl KvBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
            write_lock: Mutex::new(()),
        }
    }

    /// Opens (or creates) a RocksDB-backed store at `db_path`.
    pub fn open(db_path: impl AsRef<Path>, config: &RocksDbConfig) -> Result<Self> {
        let backend = RocksDbBackend::open(db_path, config, COLUMN_FAMILIES)?;
        Ok(Self::new(backend))
    }

    /// Creates an empty in-memory store.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Builds the `{table}\0` prefix, rejecting names that would break it.
    fn table_prefix(table: &str) -> Result<Vec<u8>> {
        if table.is_empty() {
            return Err(ForumError::invalid_input("Table name must not be empty"));
        }
        if table.as_bytes().contains(&TABLE_SEPARATOR) {
            return Err(ForumError::invalid_input(format!(
                "Table name {:?} contains a NUL byte",
                table
            )));
        }
        let mut prefix = Vec::with_capacity(table.len() + 1);
        prefix.extend_from_slice(table.as_bytes());
        prefix.push(TABLE_SEPARATOR);
        Ok(prefix)
    }

    fn row_key(prefix: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        if key.is_empty() {
            return Err(ForumError::invalid_input("Row key must not be empty"));
        }
        let mut full = Vec::with_capacity(prefix.len() + key.len());
        full.extend_from_slice(prefix);
        full.extend_from_slice(key);
        Ok(full)
    }

    /// Creates a sorted-set index key: prefix + score (8 bytes BE) + member key.
    fn score_key(prefix: &[u8], score: u64, key: &[u8]) -> Vec<u8> {
        let mut full = Vec::with_capacity(prefix.len() + SCORE_LEN + key.len());
        full.extend_from_slice(prefix);
        full.extend_from_slice(&score.to_be_bytes());
        full.extend_from_slice(key);
        full
    }

    fn decode_score(bytes: &[u8]) -> Result<u64> {
        key_id(bytes).ok_or_else(|| {
            ForumError::storage(format!("Corrupt score of {} bytes", bytes.len()))
        })
    }

    /// Splits a `zscore` key back into `(score, member)`.
    fn split_score_key(prefix_len: usize, full: &[u8]) -> Result<(u64, u64)> {
        let rest = &full[prefix_len..];
        if rest.len() < SCORE_LEN {
            return Err(ForumError::storage("Corrupt sorted-set index key"));
        }
        let score = Self::decode_score(&rest[..SCORE_LEN])?;
        let member = key_id(&rest[SCORE_LEN..])
            .ok_or_else(|| ForumError::storage("Sorted-set member is not an id"))?;
        Ok((score, member))
    }

    // ========================================================================
    // Hash Tables
    // ========================================================================

    /// Reads one row.
    pub fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let prefix = Self::table_prefix(table)?;
        let value = self.backend.get(CF_HASH, &Self::row_key(&prefix, key)?)?;
        trace!(
            table,
            key_len = key.len(),
            found = value.is_some(),
            "store_get"
        );
        Ok(value)
    }

    /// Inserts or overwrites one row.
    pub fn set(&self, table: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let prefix = Self::table_prefix(table)?;
        trace!(
            table,
            key_len = key.len(),
            value_bytes = value.len(),
            "store_set"
        );
        self.backend.write(vec![WriteOp::Put {
            cf: CF_HASH,
            key: Self::row_key(&prefix, key)?,
            value: value.to_vec(),
        }])
    }

    /// Removes one row. Removing a missing row is not an error.
    pub fn delete(&self, table: &str, key: &[u8]) -> Result<()> {
        let prefix = Self::table_prefix(table)?;
        trace!(table, key_len = key.len(), "store_delete");
        self.backend.write(vec![WriteOp::Delete {
            cf: CF_HASH,
            key: Self::row_key(&prefix, key)?,
        }])
    }

    /// Reads many rows at once. Missing keys are simply absent from the map.
    pub fn multi_get(&self, table: &str, keys: &[Vec<u8>]) -> Result<HashMap<Vec<u8>, Vec<u8>>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        let prefix = Self::table_prefix(table)?;
        let full_keys = keys
            .iter()
            .map(|k| Self::row_key(&prefix, k))
            .collect::<Result<Vec<_>>>()?;

        let values = self.backend.multi_get(CF_HASH, &full_keys)?;
        let found: HashMap<Vec<u8>, Vec<u8>> = keys
            .iter()
            .zip(values)
            .filter_map(|(k, v)| v.map(|v| (k.clone(), v)))
            .collect();

        debug!(
            table,
            requested = keys.len(),
            found = found.len(),
            "store_multi_get"
        );
        Ok(found)
    }

    /// Rows with key strictly greater than `start_key`, ascending.
    ///
    /// An empty `start_key` starts at the first row of the table.
    pub fn scan_forward(&self, table: &str, start_key: &[u8], limit: usize) -> Result<Vec<Entry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let prefix = Self::table_prefix(table)?;
        let after = (!start_key.is_empty()).then(|| Self::position_key(&prefix, start_key));
        let pairs = self
            .backend
            .scan_after(CF_HASH, &prefix, after.as_deref(), limit)?;
        debug!(table, limit, rows = pairs.len(), "store_scan_forward");
        Ok(Self::strip_prefix(prefix.len(), pairs))
    }

    /// Rows with key strictly less than `start_key`, descending.
    ///
    /// An empty `start_key` starts at the last row of the table.
    pub fn scan_backward(&self, table: &str, start_key: &[u8], limit: usize) -> Result<Vec<Entry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let prefix = Self::table_prefix(table)?;
        let before = (!start_key.is_empty()).then(|| Self::position_key(&prefix, start_key));
        let pairs = self
            .backend
            .scan_before(CF_HASH, &prefix, before.as_deref(), limit)?;
        debug!(table, limit, rows = pairs.len(), "store_scan_backward");
        Ok(Self::strip_prefix(prefix.len(), pairs))
    }

    /// Concatenates a prefix and a possibly empty scan position.
    fn position_key(prefix: &[u8], key: &[u8]) -> Vec<u8> {
        let mut full = prefix.to_vec();
        full.extend_from_slice(key);
        full
    }

    fn strip_prefix(prefix_len: usize, pairs: Vec<RawPair>) -> Vec<Entry> {
        pairs
            .into_iter()
            .map(|(key, value)| Entry {
                key: key[prefix_len..].to_vec(),
                value,
            })
            .collect()
    }

    // ========================================================================
    // Sorted Sets
    // ========================================================================

    /// Adds `id` to a sorted set, or moves it to a new score.
    pub fn zset(&self, table: &str, id: u64, score: u64) -> Result<()> {
        let prefix = Self::table_prefix(table)?;
        let member = id_key(id);
        let member_key = Self::row_key(&prefix, &member)?;

        let _guard = self.lock_writes();
        let mut ops = Vec::with_capacity(3);
        if let Some(old) = self.backend.get(CF_ZKEY, &member_key)? {
            let old_score = Self::decode_score(&old)?;
            if old_score == score {
                return Ok(());
            }
            ops.push(WriteOp::Delete {
                cf: CF_ZSCORE,
                key: Self::score_key(&prefix, old_score, &member),
            });
        }
        ops.push(WriteOp::Put {
            cf: CF_ZSCORE,
            key: Self::score_key(&prefix, score, &member),
            value: Vec::new(),
        });
        ops.push(WriteOp::Put {
            cf: CF_ZKEY,
            key: member_key,
            value: score.to_be_bytes().to_vec(),
        });

        trace!(table, id, score, "store_zset");
        self.backend.write(ops)
    }

    /// Returns the score of `id`, if it is a member.
    pub fn zget(&self, table: &str, id: u64) -> Result<Option<u64>> {
        let prefix = Self::table_prefix(table)?;
        let member_key = Self::row_key(&prefix, &id_key(id))?;
        self.backend
            .get(CF_ZKEY, &member_key)?
            .map(|bytes| Self::decode_score(&bytes))
            .transpose()
    }

    /// Removes `id` from a sorted set. Removing a non-member is not an error.
    pub fn zdel(&self, table: &str, id: u64) -> Result<()> {
        let prefix = Self::table_prefix(table)?;
        let member = id_key(id);
        let member_key = Self::row_key(&prefix, &member)?;

        let _guard = self.lock_writes();
        let Some(old) = self.backend.get(CF_ZKEY, &member_key)? else {
            return Ok(());
        };
        let old_score = Self::decode_score(&old)?;
        trace!(table, id, "store_zdel");
        self.backend.write(vec![
            WriteOp::Delete {
                cf: CF_ZSCORE,
                key: Self::score_key(&prefix, old_score, &member),
            },
            WriteOp::Delete {
                cf: CF_ZKEY,
                key: member_key,
            },
        ])
    }

    /// Members strictly after `(start_score, start_key)`, ascending.
    ///
    /// With no `start_score` the scan starts at the lowest score and
    /// `start_key` is ignored.
    pub fn scan_forward_scored(
        &self,
        table: &str,
        start_key: u64,
        start_score: Option<u64>,
        limit: usize,
    ) -> Result<Vec<ScoredEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let prefix = Self::table_prefix(table)?;
        let after = start_score.map(|score| Self::scored_position(&prefix, score, start_key));
        let pairs = self
            .backend
            .scan_after(CF_ZSCORE, &prefix, after.as_deref(), limit)?;
        debug!(
            table,
            limit,
            rows = pairs.len(),
            "store_scan_forward_scored"
        );
        Self::decode_scored(prefix.len(), pairs)
    }

    /// Members strictly before `(start_score, start_key)`, descending.
    ///
    /// With no `start_score` the scan starts at the highest score and
    /// `start_key` is ignored.
    pub fn scan_backward_scored(
        &self,
        table: &str,
        start_key: u64,
        start_score: Option<u64>,
        limit: usize,
    ) -> Result<Vec<ScoredEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let prefix = Self::table_prefix(table)?;
        let before = start_score.map(|score| Self::scored_position(&prefix, score, start_key));
        let pairs = self
            .backend
            .scan_before(CF_ZSCORE, &prefix, before.as_deref(), limit)?;
        debug!(
            table,
            limit,
            rows = pairs.len(),
            "store_scan_backward_scored"
        );
        Self::decode_scored(prefix.len(), pairs)
    }

    /// Scan position for a scored cursor. A zero key sits before every member
    /// with the same score.
    fn scored_position(prefix: &[u8], score: u64, key: u64) -> Vec<u8> {
        if key == 0 {
            Self::score_key(prefix, score, &[])
        } else {
            Self::score_key(prefix, score, &id_key(key))
        }
    }

    fn decode_scored(prefix_len: usize, pairs: Vec<RawPair>) -> Result<Vec<ScoredEntry>> {
        pairs
            .into_iter()
            .map(|(full, _)| {
                let (score, key) = Self::split_score_key(prefix_len, &full)?;
                Ok(ScoredEntry { key, score })
            })
            .collect()
    }

    // ========================================================================
    // Sequences
    // ========================================================================

    /// Allocates the next id for `table`.
    ///
    /// Ids start at 1 and are unique and monotonic per table, including under
    /// concurrent callers.
    pub fn next_sequence(&self, table: &str) -> Result<u64> {
        let key = Self::table_prefix(table)?;

        let _guard = self.lock_writes();
        let current = match self.backend.get(CF_META, &key)? {
            Some(bytes) => Self::decode_score(&bytes)?,
            None => 0,
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| ForumError::storage(format!("Sequence for {} exhausted", table)))?;
        self.backend.write(vec![WriteOp::Put {
            cf: CF_META,
            key,
            value: next.to_be_bytes().to_vec(),
        }])?;

        trace!(table, id = next, "store_next_sequence");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(store: &Store, table: &str, ids: &[u64]) {
        for id in ids {
            store
                .set(table, &id_key(*id), format!("v{}", id).as_bytes())
                .unwrap();
        }
    }

    fn ids(entries: &[Entry]) -> Vec<u64> {
        entries.iter().filter_map(|e| key_id(&e.key)).collect()
    }

    #[test]
    fn test_id_key_roundtrip_and_order() {
        assert_eq!(key_id(&id_key(42)), Some(42));
        assert!(id_key(9) < id_key(10));
        assert!(id_key(999_999_999) < id_key(1_000_000_000));
        assert_eq!(key_id(b"short"), None);
    }

    #[test]
    fn test_prefix_successor() {
        assert_eq!(prefix_successor(b"ab\0"), Some(b"ab\x01".to_vec()));
        assert_eq!(prefix_successor(&[0x01, 0xFF]), Some(vec![0x02]));
        assert_eq!(prefix_successor(&[0xFF, 0xFF]), None);
    }

    #[test]
    fn test_table_name_validation() {
        let store = Store::in_memory();
        assert!(matches!(
            store.get("", b"k"),
            Err(ForumError::InvalidInput(_))
        ));
        assert!(matches!(
            store.get("bad\0name", b"k"),
            Err(ForumError::InvalidInput(_))
        ));
        assert!(matches!(
            store.set("article", b"", b"v"),
            Err(ForumError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_scan_forward_is_exclusive() {
        let store = Store::in_memory();
        fill(&store, "t", &[1, 2, 3, 4, 5]);

        let all = store.scan_forward("t", b"", 10).unwrap();
        assert_eq!(ids(&all), vec![1, 2, 3, 4, 5]);

        let after = store.scan_forward("t", &id_key(2), 2).unwrap();
        assert_eq!(ids(&after), vec![3, 4]);
        assert_eq!(after[0].value, b"v3");
    }

    #[test]
    fn test_scan_backward_is_exclusive() {
        let store = Store::in_memory();
        fill(&store, "t", &[1, 2, 3, 4, 5]);

        let all = store.scan_backward("t", b"", 10).unwrap();
        assert_eq!(ids(&all), vec![5, 4, 3, 2, 1]);

        let before = store.scan_backward("t", &id_key(4), 2).unwrap();
        assert_eq!(ids(&before), vec![3, 2]);
    }

    #[test]
    fn test_tables_do_not_leak_into_each_other() {
        let store = Store::in_memory();
        fill(&store, "tag:a", &[1, 2]);
        fill(&store, "tag:ab", &[3]);
        fill(&store, "tag:", &[4]);

        assert_eq!(ids(&store.scan_forward("tag:a", b"", 10).unwrap()), vec![1, 2]);
        assert_eq!(ids(&store.scan_backward("tag:a", b"", 10).unwrap()), vec![2, 1]);
        assert_eq!(ids(&store.scan_backward("tag:", b"", 10).unwrap()), vec![4]);
    }

    #[test]
    fn test_multi_get_skips_missing() {
        let store = Store::in_memory();
        fill(&store, "t", &[1, 3]);

        let found = store
            .multi_get("t", &[id_key(1), id_key(2), id_key(3)])
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found.get(&id_key(3)).map(Vec::as_slice), Some(&b"v3"[..]));
        assert!(!found.contains_key(&id_key(2)));

        assert!(store.multi_get("t", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_zset_rescore_moves_member() {
        let store = Store::in_memory();
        store.zset("z", 1, 100).unwrap();
        store.zset("z", 2, 200).unwrap();
        store.zset("z", 3, 300).unwrap();

        store.zset("z", 1, 400).unwrap();
        assert_eq!(store.zget("z", 1).unwrap(), Some(400));

        let desc = store.scan_backward_scored("z", 0, None, 10).unwrap();
        let order: Vec<u64> = desc.iter().map(|e| e.key).collect();
        assert_eq!(order, vec![1, 3, 2]);

        store.zdel("z", 3).unwrap();
        assert_eq!(store.zget("z", 3).unwrap(), None);
        let asc = store.scan_forward_scored("z", 0, None, 10).unwrap();
        assert_eq!(asc.len(), 2);
    }

    #[test]
    fn test_scored_scans_break_ties_by_key() {
        let store = Store::in_memory();
        store.zset("z", 1, 100).unwrap();
        store.zset("z", 2, 100).unwrap();
        store.zset("z", 3, 100).unwrap();
        store.zset("z", 4, 50).unwrap();

        let after = store.scan_forward_scored("z", 2, Some(100), 10).unwrap();
        assert_eq!(after, vec![ScoredEntry { key: 3, score: 100 }]);

        let before = store.scan_backward_scored("z", 2, Some(100), 10).unwrap();
        assert_eq!(
            before,
            vec![
                ScoredEntry { key: 1, score: 100 },
                ScoredEntry { key: 4, score: 50 }
            ]
        );
    }

    #[test]
    fn test_next_sequence_starts_at_one() {
        let store = Store::in_memory();
        assert_eq!(store.next_sequence("article").unwrap(), 1);
        assert_eq!(store.next_sequence("article").unwrap(), 2);
        assert_eq!(store.next_sequence("user").unwrap(), 1);
    }

    #[test]
    fn test_zero_limit_scans_are_empty() {
        let store = Store::in_memory();
        fill(&store, "t", &[1]);
        assert!(store.scan_forward("t", b"", 0).unwrap().is_empty());
        assert!(store.scan_backward_scored("t", 0, None, 0).unwrap().is_empty());
    }
}
