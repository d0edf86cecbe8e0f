//! Linear article search.
//!
//! There is no text index: the article table is walked newest first in fixed
//! batches and each row is tested with a case-insensitive substring match.
//! Cost grows with the distance to the `limit`-th match.

use crate::error::Result;
use crate::model::{decode_listed, Article, ArticleListItem, ArticleMini};
use crate::resolver::resolve_articles;
use crate::storage::{key_id, Store};
use crate::tables;
use tracing::debug;

/// Rows read per scan.
pub const SEARCH_SCAN_BATCH: usize = 100;

/// Article field a search matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    Content,
}

/// A parsed search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub field: SearchField,
    /// Lower-case needle.
    pub needle: String,
}

impl SearchQuery {
    /// Parses a raw query string.
    ///
    /// The query is trimmed and lower-cased. A leading `c:` searches article
    /// content instead of titles. Returns `None` when nothing is left to
    /// search for.
    pub fn parse(q: &str) -> Option<Self> {
        let q = q.trim().to_lowercase();
        let (field, needle) = match q.strip_prefix("c:") {
            Some(rest) => (SearchField::Content, rest.trim()),
            None => (SearchField::Title, q.as_str()),
        };
        if needle.is_empty() {
            return None;
        }
        Some(Self {
            field,
            needle: needle.to_string(),
        })
    }
}

fn matches(article: &Article, field: SearchField, needle: &str) -> bool {
    let haystack = match field {
        SearchField::Title => &article.title,
        SearchField::Content => &article.content,
    };
    haystack.to_lowercase().contains(needle)
}

/// Returns up to `limit` visible articles whose `field` contains `needle`,
/// newest first.
pub fn scan_matches(
    store: &Store,
    field: SearchField,
    needle: &str,
    limit: usize,
) -> Result<Vec<Article>> {
    let needle = needle.to_lowercase();
    if needle.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    let mut start: Vec<u8> = Vec::new();
    let mut scanned = 0usize;
    'scan: loop {
        let batch = store.scan_backward(tables::ARTICLE, &start, SEARCH_SCAN_BATCH)?;
        let exhausted = batch.len() < SEARCH_SCAN_BATCH;

        for entry in batch {
            scanned += 1;
            let id = key_id(&entry.key).unwrap_or(0);
            if let Some(article) = decode_listed::<Article>(tables::ARTICLE, id, &entry.value) {
                if !article.hidden && matches(&article, field, &needle) {
                    found.push(article);
                    if found.len() == limit {
                        break 'scan;
                    }
                }
            }
            start = entry.key;
        }

        if exhausted {
            break;
        }
    }

    debug!(?field, limit, scanned, matched = found.len(), "Search scan finished");
    Ok(found)
}

/// Searches and resolves the matches for list display.
pub fn search(
    store: &Store,
    field: SearchField,
    needle: &str,
    limit: usize,
    tz_hours: i32,
) -> Result<Vec<ArticleListItem>> {
    let matches = scan_matches(store, field, needle, limit)?;
    let minis = matches.iter().map(ArticleMini::from).collect();
    resolve_articles(store, minis, tz_hours)
}
