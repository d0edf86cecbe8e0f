//! RocksDB storage engine.
//!
//! This module provides the persistent [`KvBackend`] implementation. It
//! contains no table or forum logic, just RocksDB setup, point reads,
//! atomic batches and bounded seek iteration in both directions.

use super::{prefix_successor, KvBackend, RawPair, WriteOp};
use crate::error::{ForumError, Result};
use rocksdb::{
    BlockBasedOptions, BoundColumnFamily, Cache, ColumnFamilyDescriptor, DBCompressionType,
    DBRawIteratorWithThreadMode, DBWithThreadMode, MultiThreaded, Options, WriteBatch,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, trace};

type Db = DBWithThreadMode<MultiThreaded>;

const MIB: usize = 1024 * 1024;

/// Engine tuning for a forum store.
///
/// Reads dominate: point lookups for the joins and short prefix scans for
/// pages. Every column family gets a shared LRU block cache and, when
/// `bloom_bits_per_key` is non-zero, a bloom filter.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    pub max_open_files: i32,
    /// Shared block cache in bytes, 0 disables it.
    pub block_cache_size: usize,
    pub bloom_bits_per_key: f64,
    pub write_buffer_size: usize,
    pub max_write_buffer_number: i32,
    /// Total WAL size before memtables are forced to flush.
    pub max_wal_size: u64,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            max_open_files: 128,
            block_cache_size: 8 * MIB,
            bloom_bits_per_key: 10.0,
            write_buffer_size: 8 * MIB,
            max_write_buffer_number: 2,
            max_wal_size: (32 * MIB) as u64,
        }
    }
}

impl RocksDbConfig {
    /// Settings for a long-running site with many concurrent readers.
    pub fn for_server() -> Self {
        Self {
            max_open_files: 512,
            block_cache_size: 256 * MIB,
            write_buffer_size: 32 * MIB,
            max_write_buffer_number: 3,
            max_wal_size: (128 * MIB) as u64,
            ..Self::default()
        }
    }

    fn db_options(&self) -> Options {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(self.max_open_files);
        opts.set_max_total_wal_size(self.max_wal_size);
        opts.increase_parallelism(num_cpus::get() as i32);
        opts
    }

    fn cf_options(&self, cache: Option<&Cache>) -> Options {
        let mut table = BlockBasedOptions::default();
        if let Some(cache) = cache {
            table.set_block_cache(cache);
        }
        if self.bloom_bits_per_key > 0.0 {
            table.set_bloom_filter(self.bloom_bits_per_key, false);
        }

        let mut opts = Options::default();
        opts.set_block_based_table_factory(&table);
        opts.set_write_buffer_size(self.write_buffer_size);
        opts.set_max_write_buffer_number(self.max_write_buffer_number);
        opts.set_compression_type(DBCompressionType::Lz4);
        opts
    }
}

// =============================================================================
// Backend
// =============================================================================

/// RocksDB-backed [`KvBackend`].
pub struct RocksDbBackend {
    db: Arc<Db>,
}

impl RocksDbBackend {
    /// Opens (creating if needed) a database with `column_families`.
    pub fn open(
        db_path: impl AsRef<Path>,
        config: &RocksDbConfig,
        column_families: &[&str],
    ) -> Result<Self> {
        let cache = (config.block_cache_size > 0)
            .then(|| Cache::new_lru_cache(config.block_cache_size));
        let descriptors: Vec<_> = column_families
            .iter()
            .map(|cf| ColumnFamilyDescriptor::new(*cf, config.cf_options(cache.as_ref())))
            .collect();

        let db = Db::open_cf_descriptors(&config.db_options(), db_path.as_ref(), descriptors)
            .map_err(|e| ForumError::storage(format!("Failed to open RocksDB: {}", e)))?;

        info!(
            path = ?db_path.as_ref(),
            column_families = column_families.len(),
            block_cache = config.block_cache_size,
            "Opened RocksDB"
        );
        Ok(Self { db: Arc::new(db) })
    }

    /// Gets a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| ForumError::storage(format!("Column family '{}' not found", name)))
    }

    fn check_iterator(cf_name: &str, iter: &DBRawIteratorWithThreadMode<'_, Db>) -> Result<()> {
        iter.status().map_err(|e| {
            ForumError::storage(format!("Iterator error in '{}': {}", cf_name, e))
        })
    }
}

impl KvBackend for RocksDbBackend {
    fn get(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| ForumError::storage(format!("Failed to read: {}", e)))
    }

    fn multi_get(&self, cf_name: &str, keys: &[Vec<u8>]) -> Result<Vec<Option<Vec<u8>>>> {
        let cf = self.cf(cf_name)?;
        let values = self
            .db
            .multi_get_cf(keys.iter().map(|k| (&cf, k.as_slice())))
            .into_iter()
            .map(|r| r.map_err(|e| ForumError::storage(format!("Failed to read: {}", e))))
            .collect::<Result<Vec<_>>>()?;

        trace!(cf = cf_name, keys = keys.len(), "db_multi_get");
        Ok(values)
    }

    fn write(&self, ops: Vec<WriteOp>) -> Result<()> {
        let mut batch = WriteBatch::default();
        let op_count = ops.len();
        for op in ops {
            match op {
                WriteOp::Put { cf, key, value } => {
                    let handle = self.cf(cf)?;
                    batch.put_cf(&handle, key, value);
                }
                WriteOp::Delete { cf, key } => {
                    let handle = self.cf(cf)?;
                    batch.delete_cf(&handle, key);
                }
            }
        }

        self.db
            .write(batch)
            .map_err(|e| ForumError::storage(format!("Failed to write: {}", e)))?;
        trace!(ops = op_count, "db_write: applied batch");
        Ok(())
    }

    fn scan_after(
        &self,
        cf_name: &str,
        prefix: &[u8],
        after: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<RawPair>> {
        let cf = self.cf(cf_name)?;
        let mut iter = self.db.raw_iterator_cf(&cf);
        iter.seek(after.unwrap_or(prefix));

        let mut out = Vec::with_capacity(limit.min(256));
        while iter.valid() && out.len() < limit {
            let key = match iter.key() {
                Some(k) => k.to_vec(),
                None => break,
            };
            // Seek lands on the cursor row itself when it still exists
            if after.is_some_and(|a| key.as_slice() <= a) {
                iter.next();
                continue;
            }
            if !key.starts_with(prefix) {
                break;
            }
            let value = iter.value().map(<[u8]>::to_vec).unwrap_or_default();
            out.push((key, value));
            iter.next();
        }
        Self::check_iterator(cf_name, &iter)?;

        debug!(
            cf = cf_name,
            prefix_len = prefix.len(),
            records_iterated = out.len(),
            "db_scan_after: completed seek iteration"
        );
        Ok(out)
    }

    fn scan_before(
        &self,
        cf_name: &str,
        prefix: &[u8],
        before: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<RawPair>> {
        let cf = self.cf(cf_name)?;
        let bound = match before {
            Some(b) => Some(b.to_vec()),
            None => prefix_successor(prefix),
        };

        let mut iter = self.db.raw_iterator_cf(&cf);
        match &bound {
            Some(b) => iter.seek_for_prev(b),
            None => iter.seek_to_last(),
        }

        let mut out = Vec::with_capacity(limit.min(256));
        while iter.valid() && out.len() < limit {
            let key = match iter.key() {
                Some(k) => k.to_vec(),
                None => break,
            };
            if bound.as_deref().is_some_and(|b| key.as_slice() >= b) {
                iter.prev();
                continue;
            }
            if !key.starts_with(prefix) {
                break;
            }
            let value = iter.value().map(<[u8]>::to_vec).unwrap_or_default();
            out.push((key, value));
            iter.prev();
        }
        Self::check_iterator(cf_name, &iter)?;

        debug!(
            cf = cf_name,
            prefix_len = prefix.len(),
            records_iterated = out.len(),
            "db_scan_before: completed reverse seek iteration"
        );
        Ok(out)
    }
}

impl std::fmt::Debug for RocksDbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksDbBackend")
            .field("db", &"RocksDB")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{id_key, key_id, Store, COLUMN_FAMILIES};
    use std::thread;
    use tempfile::TempDir;

    fn create_test_backend() -> (RocksDbBackend, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test_db");
        let config = RocksDbConfig::default();
        let db = RocksDbBackend::open(&db_path, &config, COLUMN_FAMILIES)
            .expect("Failed to open db");
        (db, temp_dir)
    }

    fn put(db: &RocksDbBackend, key: &[u8], value: &[u8]) {
        db.write(vec![WriteOp::Put {
            cf: "hash",
            key: key.to_vec(),
            value: value.to_vec(),
        }])
        .unwrap();
    }

    fn keys(pairs: &[RawPair]) -> Vec<&[u8]> {
        pairs.iter().map(|(k, _)| k.as_slice()).collect()
    }

    #[test]
    fn test_put_get_delete() {
        let (db, _temp) = create_test_backend();

        put(&db, b"t\0a", b"value");
        assert_eq!(db.get("hash", b"t\0a").unwrap(), Some(b"value".to_vec()));

        db.write(vec![WriteOp::Delete {
            cf: "hash",
            key: b"t\0a".to_vec(),
        }])
        .unwrap();
        assert_eq!(db.get("hash", b"t\0a").unwrap(), None);
    }

    #[test]
    fn test_unknown_column_family() {
        let (db, _temp) = create_test_backend();
        assert!(matches!(
            db.get("nope", b"k"),
            Err(ForumError::Storage(_))
        ));
    }

    #[test]
    fn test_multi_get_is_positional() {
        let (db, _temp) = create_test_backend();
        put(&db, b"t\0a", b"1");
        put(&db, b"t\0c", b"3");

        let values = db
            .multi_get("hash", &[b"t\0a".to_vec(), b"t\0b".to_vec(), b"t\0c".to_vec()])
            .unwrap();
        assert_eq!(values, vec![Some(b"1".to_vec()), None, Some(b"3".to_vec())]);
    }

    #[test]
    fn test_scan_after_respects_prefix_and_cursor() {
        let (db, _temp) = create_test_backend();
        put(&db, b"a\0x", b"");
        put(&db, b"t\0a", b"");
        put(&db, b"t\0b", b"");
        put(&db, b"t\0c", b"");
        put(&db, b"u\0a", b"");

        let all = db.scan_after("hash", b"t\0", None, 10).unwrap();
        assert_eq!(keys(&all), vec![&b"t\0a"[..], b"t\0b", b"t\0c"]);

        let after = db.scan_after("hash", b"t\0", Some(b"t\0a"), 1).unwrap();
        assert_eq!(keys(&after), vec![&b"t\0b"[..]]);

        // Cursor between rows
        let between = db.scan_after("hash", b"t\0", Some(b"t\0bb"), 10).unwrap();
        assert_eq!(keys(&between), vec![&b"t\0c"[..]]);
    }

    #[test]
    fn test_scan_before_respects_prefix_and_cursor() {
        let (db, _temp) = create_test_backend();
        put(&db, b"a\0x", b"");
        put(&db, b"t\0a", b"");
        put(&db, b"t\0b", b"");
        put(&db, b"t\0c", b"");
        put(&db, b"u\0a", b"");

        let all = db.scan_before("hash", b"t\0", None, 10).unwrap();
        assert_eq!(keys(&all), vec![&b"t\0c"[..], b"t\0b", b"t\0a"]);

        let before = db.scan_before("hash", b"t\0", Some(b"t\0c"), 10).unwrap();
        assert_eq!(keys(&before), vec![&b"t\0b"[..], b"t\0a"]);

        let limited = db.scan_before("hash", b"t\0", None, 1).unwrap();
        assert_eq!(keys(&limited), vec![&b"t\0c"[..]]);
    }

    #[test]
    fn test_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("db");
        {
            let store = Store::open(&path, &RocksDbConfig::default()).unwrap();
            store.set("article", &id_key(1), b"{}").unwrap();
            store.zset("article_timeline", 1, 10).unwrap();
            assert_eq!(store.next_sequence("article").unwrap(), 1);
        }

        let store = Store::open(&path, &RocksDbConfig::for_server()).unwrap();
        assert_eq!(store.get("article", &id_key(1)).unwrap(), Some(b"{}".to_vec()));
        assert_eq!(store.zget("article_timeline", 1).unwrap(), Some(10));
        assert_eq!(store.next_sequence("article").unwrap(), 2);
    }

    #[test]
    fn test_concurrent_sequences_are_unique() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(Store::open(temp_dir.path().join("db"), &RocksDbConfig::default()).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    (0..25)
                        .map(|_| store.next_sequence("link").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=200).collect::<Vec<_>>());
        assert_eq!(key_id(&id_key(200)), Some(200));
    }

    #[test]
    fn test_server_config_keeps_bloom_filter() {
        let config = RocksDbConfig::for_server();
        assert!(config.block_cache_size > RocksDbConfig::default().block_cache_size);
        assert_eq!(config.bloom_bits_per_key, 10.0);
    }

    #[test]
    fn test_open_without_cache_or_bloom() {
        let temp_dir = TempDir::new().unwrap();
        let config = RocksDbConfig {
            block_cache_size: 0,
            bloom_bits_per_key: 0.0,
            ..RocksDbConfig::default()
        };
        let db = RocksDbBackend::open(temp_dir.path().join("db"), &config, COLUMN_FAMILIES).unwrap();
        put(&db, b"k", b"v");
        assert_eq!(db.get("hash", b"k").unwrap(), Some(b"v".to_vec()));
    }
}
