//! Sidebar link accessors.

use super::Forum;
use crate::error::Result;
use crate::model::{decode_listed, Link};
use crate::storage::key_id;
use crate::tables;
use std::cmp::Reverse;
use tracing::{debug, info};

/// Rows read per scan when listing links.
const LINK_SCAN_BATCH: usize = 20;

impl Forum {
    /// Looks up a link by id.
    pub fn link_get_by_id(&self, id: u64) -> Result<Link> {
        self.get_record(tables::LINK, id)
    }

    /// Stores a link, allocating an id when it has none.
    pub fn link_set(&self, mut link: Link) -> Result<Link> {
        if link.id == 0 {
            link.id = self.store.next_sequence(tables::LINK)?;
            info!(id = link.id, "Link created");
        }
        self.put_record(tables::LINK, link.id, &link)?;
        Ok(link)
    }

    /// Every link, highest score first.
    ///
    /// Unlisted links (score of 0 or below) are left out unless
    /// `include_unlisted` is set.
    pub fn link_list(&self, include_unlisted: bool) -> Result<Vec<Link>> {
        let mut links = Vec::new();
        let mut start: Vec<u8> = Vec::new();
        loop {
            let batch = self
                .store
                .scan_forward(tables::LINK, &start, LINK_SCAN_BATCH)?;
            let exhausted = batch.len() < LINK_SCAN_BATCH;
            for entry in batch {
                let id = key_id(&entry.key).unwrap_or(0);
                if let Some(link) = decode_listed::<Link>(tables::LINK, id, &entry.value) {
                    if include_unlisted || link.is_listed() {
                        links.push(link);
                    }
                }
                start = entry.key;
            }
            if exhausted {
                break;
            }
        }

        links.sort_by_key(|link| Reverse(link.score));
        debug!(count = links.len(), include_unlisted, "Links listed");
        Ok(links)
    }
}
