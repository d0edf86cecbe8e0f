//! Stored records and their display projections.
//!
//! Records are persisted as JSON. Every stored shape uses `#[serde(default)]`
//! so rows written before a field existed still decode. Display projections
//! (`*ListItem`, `*Mini`) are built at read time and never persisted.

pub mod article;
pub mod category;
pub mod comment;
pub mod link;
pub mod user;

pub use article::{Article, ArticleFeedListItem, ArticleLi, ArticleListItem, ArticleMini, NewArticle};
pub use category::{Category, CategoryMini};
pub use comment::{Comment, CommentListItem, NewComment};
pub use link::Link;
pub use user::{User, UserListItem, UserMini};

use crate::error::{ForumError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// Encodes a record for storage.
pub fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(record).map_err(ForumError::serialization)
}

/// Decodes a stored record.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Decodes a row met during a listing. Corrupt rows are logged and skipped.
pub(crate) fn decode_listed<T: DeserializeOwned>(table: &str, id: u64, bytes: &[u8]) -> Option<T> {
    match serde_json::from_slice(bytes) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(table, id, error = %e, "Skipping undecodable row");
            None
        }
    }
}

/// Splits a comma-separated tag string into normalized tags.
///
/// Tags are lower-cased and trimmed; empty tags and repeats are dropped and
/// first-seen order is kept.
pub fn parse_tags(csv: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for raw in csv.split(',') {
        let tag = raw.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}
