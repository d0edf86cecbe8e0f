//! Forum accessors.
//!
//! [`Forum`] is the entry point request handlers use. It owns a shared
//! [`Store`] and exposes one method per read or write the site performs:
//!
//! - `articles`: publishing, timelines, notifications, feed, related, search
//! - `comments`: per-article comment threads
//! - `users`: accounts, name lookup, moderation flags, settings
//! - `categories`, `links`: small admin-managed tables
//!
//! All methods are synchronous and safe to call from many threads at once.

mod articles;
mod categories;
mod comments;
mod links;
mod users;

pub use self::articles::ArticlePageInfo;
pub use self::comments::CommentPageInfo;
pub use self::users::UserPageInfo;

use crate::error::{ForumError, Result};
use crate::model::{decode, decode_listed, encode};
use crate::pagination::{Cursor, ScanRow};
use crate::storage::{id_key, RocksDbConfig, Store};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// Shared handle to the forum's data.
#[derive(Debug, Clone)]
pub struct Forum {
    store: Arc<Store>,
    /// Serializes changes to the unique user name index.
    accounts: Arc<Mutex<()>>,
}

impl Forum {
    /// Wraps an existing store.
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            accounts: Arc::new(Mutex::new(())),
        }
    }

    /// Opens (or creates) a RocksDB-backed forum at `path`.
    pub fn open(path: impl AsRef<Path>, config: &RocksDbConfig) -> Result<Self> {
        let path = path.as_ref();
        let store = Store::open(path, config)?;
        info!("Opened forum store at {}", path.display());
        Ok(Self::new(Arc::new(store)))
    }

    /// Creates a forum over an empty in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(Store::in_memory()))
    }

    /// The underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    fn lock_accounts(&self) -> MutexGuard<'_, ()> {
        self.accounts.lock().unwrap_or_else(|p| p.into_inner())
    }

    // ========================================================================
    // Record helpers
    // ========================================================================

    /// Reads and decodes one record, reporting absent rows as `NotFound`.
    fn get_record<T: DeserializeOwned>(&self, table: &str, id: u64) -> Result<T> {
        let bytes = self
            .store
            .get(table, &id_key(id))?
            .ok_or_else(|| ForumError::not_found(format!("{} {}", table, id)))?;
        decode(&bytes)
    }

    fn put_record<T: Serialize>(&self, table: &str, id: u64, record: &T) -> Result<()> {
        self.store.set(table, &id_key(id), &encode(record)?)
    }

    /// Applies `f` to a stored record and writes it back.
    ///
    /// Returns `false` without writing when the row does not exist.
    fn modify_record<T, F>(&self, table: &str, id: u64, f: F) -> Result<bool>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        let Some(bytes) = self.store.get(table, &id_key(id))? else {
            return Ok(false);
        };
        let mut record: T = decode(&bytes)?;
        f(&mut record);
        self.put_record(table, id, &record)?;
        Ok(true)
    }

    /// Fetches the records named by page rows with one multi-get, keeping row
    /// order and pairing each record with its row's cursor. Missing and
    /// undecodable records are dropped.
    fn load_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        rows: Vec<ScanRow>,
    ) -> Result<Vec<(Cursor, T)>> {
        let keys: Vec<Vec<u8>> = rows.iter().map(|row| id_key(row.key)).collect();
        let found = self.store.multi_get(table, &keys)?;
        Ok(rows
            .iter()
            .zip(&keys)
            .filter_map(|(row, key)| {
                let bytes = found.get(key)?;
                decode_listed::<T>(table, row.key, bytes).map(|record| (row.cursor(), record))
            })
            .collect())
    }
}

/// Parses a comma-separated id list, skipping anything that is not a
/// positive integer.
pub(crate) fn parse_id_list(csv: &str) -> Vec<u64> {
    csv.split(',')
        .filter_map(|part| part.trim().parse::<u64>().ok())
        .filter(|id| *id != 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Link;
    use crate::tables;

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("3, 1,x,,0,7"), vec![3, 1, 7]);
        assert!(parse_id_list("").is_empty());
    }

    #[test]
    fn test_get_record_reports_not_found_and_decode() {
        let forum = Forum::in_memory();
        let missing = forum.get_record::<Link>(tables::LINK, 1).unwrap_err();
        assert!(missing.is_not_found());

        forum.store().set(tables::LINK, &id_key(1), b"{oops").unwrap();
        let corrupt = forum.get_record::<Link>(tables::LINK, 1).unwrap_err();
        assert!(matches!(corrupt, ForumError::Decode(_)));
    }

    #[test]
    fn test_modify_missing_record() {
        let forum = Forum::in_memory();
        let changed = forum
            .modify_record::<Link, _>(tables::LINK, 5, |link| link.score = 1)
            .unwrap();
        assert!(!changed);
    }
}
