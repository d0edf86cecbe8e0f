//! Bidirectional cursor pagination over hash tables and sorted sets.
//!
//! A page is assembled in three steps:
//!
//! 1. One bounded scan from the cursor in the requested [`Direction`].
//! 2. The caller's loader turns the scanned rows into items, dropping rows
//!    that must not be shown (hidden, missing, undecodable).
//! 3. Two one-row probe scans from the first and last returned items decide
//!    `has_prev` / `has_next`.
//!
//! Items always come back in the listing's [`DisplayOrder`], whichever way the
//! scan went. Pages are not topped up when the loader drops rows, and a probe
//! may find a row the loader would drop, so `has_next` can point at a page
//! that turns out empty.

use crate::error::Result;
use crate::storage::{id_key, key_id, Store};
use base64::Engine;
use serde::Serialize;
use tracing::{debug, warn};

/// Default page size.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Scan direction relative to the stored order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Towards lower keys/scores (backward scan).
    #[default]
    Older,
    /// Towards higher keys/scores (forward scan).
    Newer,
}

impl Direction {
    /// Parses a direction from a request value. Anything unrecognized is
    /// [`Direction::Older`], the first-page default.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "newer" | "prev" => Direction::Newer,
            _ => Direction::Older,
        }
    }

    fn reverse(self) -> Self {
        match self {
            Direction::Older => Direction::Newer,
            Direction::Newer => Direction::Older,
        }
    }
}

/// The order items are shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayOrder {
    /// Highest key/score first (article and user listings).
    NewestFirst,
    /// Lowest key/score first (comment threads).
    OldestFirst,
}

impl DisplayOrder {
    /// The scan direction that walks along the display order.
    fn forward(self) -> Direction {
        match self {
            DisplayOrder::NewestFirst => Direction::Older,
            DisplayOrder::OldestFirst => Direction::Newer,
        }
    }
}

/// How a table orders its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOrder {
    /// Hash table keyed by id.
    ById,
    /// Sorted set scored by time.
    ByScore,
}

/// A paginated table together with its ordering.
#[derive(Debug, Clone, Copy)]
pub struct Listing<'a> {
    pub table: &'a str,
    pub order: TableOrder,
    pub display: DisplayOrder,
}

impl<'a> Listing<'a> {
    /// Id-ordered hash table shown newest first.
    pub fn newest_by_id(table: &'a str) -> Self {
        Self {
            table,
            order: TableOrder::ById,
            display: DisplayOrder::NewestFirst,
        }
    }

    /// Id-ordered hash table shown oldest first.
    pub fn oldest_by_id(table: &'a str) -> Self {
        Self {
            table,
            order: TableOrder::ById,
            display: DisplayOrder::OldestFirst,
        }
    }

    /// Sorted set shown highest score first.
    pub fn newest_by_score(table: &'a str) -> Self {
        Self {
            table,
            order: TableOrder::ByScore,
            display: DisplayOrder::NewestFirst,
        }
    }
}

/// Position of a row in a listing. The zero cursor is the scan edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub key: u64,
    /// Sort score; always 0 for id-ordered tables.
    pub score: u64,
}

impl Cursor {
    pub fn new(key: u64, score: u64) -> Self {
        Self { key, score }
    }

    /// The cursor that starts at the edge of the scan direction.
    pub fn start() -> Self {
        Self::default()
    }

    pub fn is_start(&self) -> bool {
        self.key == 0 && self.score == 0
    }

    /// Encodes the cursor as a URL-safe token.
    pub fn encode(&self) -> String {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.key.to_be_bytes());
        bytes[8..].copy_from_slice(&self.score.to_be_bytes());
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Decodes a token produced by [`Cursor::encode`].
    pub fn decode(token: &str) -> Option<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(token)
            .ok()?;
        if bytes.len() != 16 {
            return None;
        }
        Some(Self {
            key: key_id(&bytes[..8])?,
            score: key_id(&bytes[8..])?,
        })
    }
}

/// A row produced by the page scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRow {
    pub key: u64,
    /// Sort score (sorted sets only).
    pub score: u64,
    /// Stored value (hash tables only).
    pub value: Vec<u8>,
}

impl ScanRow {
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.key, self.score)
    }
}

/// One page of display items with navigation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(rename = "hasprev")]
    pub has_prev: bool,
    #[serde(rename = "hasnext")]
    pub has_next: bool,
    #[serde(rename = "firstkey")]
    pub first_key: u64,
    #[serde(rename = "firstscore")]
    pub first_score: u64,
    #[serde(rename = "lastkey")]
    pub last_key: u64,
    #[serde(rename = "lastscore")]
    pub last_score: u64,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            has_prev: false,
            has_next: false,
            first_key: 0,
            first_score: 0,
            last_key: 0,
            last_score: 0,
        }
    }
}

impl<T> Page<T> {
    /// A page carrying items but no navigation (search results).
    pub fn from_items(items: Vec<T>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    /// Cursor of the first item, for the "previous" link.
    pub fn first_cursor(&self) -> Cursor {
        Cursor::new(self.first_key, self.first_score)
    }

    /// Cursor of the last item, for the "next" link.
    pub fn last_cursor(&self) -> Cursor {
        Cursor::new(self.last_key, self.last_score)
    }

    /// Replaces the items, keeping navigation state.
    pub fn try_map<U>(self, f: impl FnOnce(Vec<T>) -> Result<Vec<U>>) -> Result<Page<U>> {
        Ok(Page {
            items: f(self.items)?,
            has_prev: self.has_prev,
            has_next: self.has_next,
            first_key: self.first_key,
            first_score: self.first_score,
            last_key: self.last_key,
            last_score: self.last_score,
        })
    }
}

/// Scans one step from `cursor` in `direction`.
fn scan(
    store: &Store,
    listing: &Listing<'_>,
    cursor: Cursor,
    direction: Direction,
    limit: usize,
) -> Result<Vec<ScanRow>> {
    match listing.order {
        TableOrder::ById => {
            let start = if cursor.key == 0 {
                Vec::new()
            } else {
                id_key(cursor.key)
            };
            let entries = match direction {
                Direction::Older => store.scan_backward(listing.table, &start, limit)?,
                Direction::Newer => store.scan_forward(listing.table, &start, limit)?,
            };
            Ok(entries
                .into_iter()
                .filter_map(|entry| match key_id(&entry.key) {
                    Some(key) => Some(ScanRow {
                        key,
                        score: 0,
                        value: entry.value,
                    }),
                    None => {
                        warn!(table = listing.table, "Skipping row with a non-id key");
                        None
                    }
                })
                .collect())
        }
        TableOrder::ByScore => {
            let score = (!cursor.is_start()).then_some(cursor.score);
            let entries = match direction {
                Direction::Older => {
                    store.scan_backward_scored(listing.table, cursor.key, score, limit)?
                }
                Direction::Newer => {
                    store.scan_forward_scored(listing.table, cursor.key, score, limit)?
                }
            };
            Ok(entries
                .into_iter()
                .map(|entry| ScanRow {
                    key: entry.key,
                    score: entry.score,
                    value: Vec::new(),
                })
                .collect())
        }
    }
}

/// Whether any row lies beyond `cursor` in `direction`.
fn probe(store: &Store, listing: &Listing<'_>, cursor: Cursor, direction: Direction) -> Result<bool> {
    let rows = match listing.order {
        TableOrder::ById => {
            let start = id_key(cursor.key);
            match direction {
                Direction::Older => store.scan_backward(listing.table, &start, 1)?.len(),
                Direction::Newer => store.scan_forward(listing.table, &start, 1)?.len(),
            }
        }
        TableOrder::ByScore => match direction {
            Direction::Older => store
                .scan_backward_scored(listing.table, cursor.key, Some(cursor.score), 1)?
                .len(),
            Direction::Newer => store
                .scan_forward_scored(listing.table, cursor.key, Some(cursor.score), 1)?
                .len(),
        },
    };
    Ok(rows > 0)
}

/// Assembles one page of `listing`.
///
/// `load` receives the scanned rows in display order and returns the items
/// to show, in the same order, with unwanted rows removed. `cursor_of`
/// recovers the position of an item for the navigation probes.
pub fn page<T, L, C>(
    store: &Store,
    listing: Listing<'_>,
    cursor: Cursor,
    direction: Direction,
    limit: usize,
    load: L,
    cursor_of: C,
) -> Result<Page<T>>
where
    L: FnOnce(Vec<ScanRow>) -> Result<Vec<T>>,
    C: Fn(&T) -> Cursor,
{
    let mut rows = scan(store, &listing, cursor, direction, limit)?;
    if rows.is_empty() {
        debug!(table = listing.table, ?direction, limit, "Empty page");
        return Ok(Page::default());
    }

    if direction != listing.display.forward() {
        rows.reverse();
    }
    let scanned = rows.len();

    let items = load(rows)?;
    let (Some(first), Some(last)) = (items.first(), items.last()) else {
        debug!(
            table = listing.table,
            ?direction,
            scanned,
            "Every scanned row was filtered out"
        );
        return Ok(Page::default());
    };
    let first = cursor_of(first);
    let last = cursor_of(last);

    let along = listing.display.forward();
    let has_prev = probe(store, &listing, first, along.reverse())?;
    let has_next = probe(store, &listing, last, along)?;

    debug!(
        table = listing.table,
        ?direction,
        limit,
        scanned,
        returned = items.len(),
        has_prev,
        has_next,
        "Page assembled"
    );

    Ok(Page {
        items,
        has_prev,
        has_next,
        first_key: first.key,
        first_score: first.score,
        last_key: last.key,
        last_score: last.score,
    })
}
