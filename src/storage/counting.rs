//! Call-counting wrapper around [`MemoryBackend`].
//!
//! Lets tests assert how many engine round trips an operation costs.

use super::{KvBackend, MemoryBackend, RawPair, WriteOp};
use crate::error::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub(crate) struct CallCounts {
    gets: AtomicUsize,
    multi_gets: AtomicUsize,
    scans_after: AtomicUsize,
    scans_before: AtomicUsize,
}

impl CallCounts {
    pub(crate) fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub(crate) fn multi_gets(&self) -> usize {
        self.multi_gets.load(Ordering::SeqCst)
    }

    pub(crate) fn scans_after(&self) -> usize {
        self.scans_after.load(Ordering::SeqCst)
    }

    pub(crate) fn scans_before(&self) -> usize {
        self.scans_before.load(Ordering::SeqCst)
    }

    /// Zeroes every counter, typically after fixtures are written.
    pub(crate) fn reset(&self) {
        for counter in [
            &self.gets,
            &self.multi_gets,
            &self.scans_after,
            &self.scans_before,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct CountingBackend {
    inner: MemoryBackend,
    counts: Arc<CallCounts>,
}

impl CountingBackend {
    /// Returns the backend and a handle to its counters.
    pub(crate) fn new() -> (Self, Arc<CallCounts>) {
        let backend = Self::default();
        let counts = Arc::clone(&backend.counts);
        (backend, counts)
    }
}

impl KvBackend for CountingBackend {
    fn get(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.counts.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(cf, key)
    }

    fn multi_get(&self, cf: &str, keys: &[Vec<u8>]) -> Result<Vec<Option<Vec<u8>>>> {
        self.counts.multi_gets.fetch_add(1, Ordering::SeqCst);
        self.inner.multi_get(cf, keys)
    }

    fn write(&self, ops: Vec<WriteOp>) -> Result<()> {
        self.inner.write(ops)
    }

    fn scan_after(
        &self,
        cf: &str,
        prefix: &[u8],
        after: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<RawPair>> {
        self.counts.scans_after.fetch_add(1, Ordering::SeqCst);
        self.inner.scan_after(cf, prefix, after, limit)
    }

    fn scan_before(
        &self,
        cf: &str,
        prefix: &[u8],
        before: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<RawPair>> {
        self.counts.scans_before.fetch_add(1, Ordering::SeqCst);
        self.inner.scan_before(cf, prefix, before, limit)
    }
}

/// A store over a fresh [`CountingBackend`].
pub(crate) fn counting_store() -> (super::Store, Arc<CallCounts>) {
    let (backend, counts) = CountingBackend::new();
    (super::Store::new(backend), counts)
}
