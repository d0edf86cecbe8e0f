//! Batch joins of list items onto their users and categories.
//!
//! Each resolve call collects the distinct foreign ids of a batch, fetches
//! every foreign table once with a multi-get, and joins the results back onto
//! the items in their original order. A foreign row that is missing or does
//! not decode leaves the joined name and avatar empty; the item is kept.

use crate::error::Result;
use crate::format::{excerpt, format_list_time, format_rfc3339, FEED_EXCERPT_CHARS};
use crate::model::{
    decode_listed, Article, ArticleFeedListItem, ArticleListItem, ArticleMini, CategoryMini,
    Comment, CommentListItem, UserMini,
};
use crate::storage::{id_key, key_id, Store};
use crate::tables;
use serde::de::DeserializeOwned;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Distinct foreign ids referenced by a batch of items.
#[derive(Debug, Default, Clone)]
pub struct ForeignKeys {
    users: BTreeSet<u64>,
    categories: BTreeSet<u64>,
}

impl ForeignKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user reference. Id 0 means "nobody" and is ignored.
    pub fn add_user(&mut self, uid: u64) {
        if uid != 0 {
            self.users.insert(uid);
        }
    }

    /// Adds a category reference. Id 0 is ignored.
    pub fn add_category(&mut self, cid: u64) {
        if cid != 0 {
            self.categories.insert(cid);
        }
    }

    /// Adds the author, reply-to user and category of an article.
    pub fn add_article(&mut self, article: &ArticleMini) {
        self.add_user(article.uid);
        self.add_user(article.ruid);
        self.add_category(article.cid);
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }
}

/// Foreign records fetched for one batch.
#[derive(Debug, Default, Clone)]
pub struct Resolved {
    users: HashMap<u64, UserMini>,
    categories: HashMap<u64, CategoryMini>,
}

impl Resolved {
    /// The user with `uid`, or an empty placeholder.
    pub fn user(&self, uid: u64) -> UserMini {
        self.users.get(&uid).cloned().unwrap_or_default()
    }

    /// The category with `cid`, or an empty placeholder.
    pub fn category(&self, cid: u64) -> CategoryMini {
        self.categories.get(&cid).cloned().unwrap_or_default()
    }

    fn user_name(&self, uid: u64) -> String {
        self.users
            .get(&uid)
            .map(|u| u.name.clone())
            .unwrap_or_default()
    }

    fn category_name(&self, cid: u64) -> String {
        self.categories
            .get(&cid)
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }
}

/// Fetches `ids` from `table` with one multi-get, skipping rows that are
/// missing or undecodable. Keyed by the requested id.
fn fetch<T: DeserializeOwned>(store: &Store, table: &str, ids: &BTreeSet<u64>) -> Result<HashMap<u64, T>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let keys: Vec<Vec<u8>> = ids.iter().map(|id| id_key(*id)).collect();
    let rows = store.multi_get(table, &keys)?;
    Ok(rows
        .into_iter()
        .filter_map(|(key, value)| {
            let id = key_id(&key)?;
            decode_listed::<T>(table, id, &value).map(|record| (id, record))
        })
        .collect())
}

/// Fetches every foreign record referenced by `keys`, one multi-get per
/// non-empty foreign table.
pub fn resolve(store: &Store, keys: &ForeignKeys) -> Result<Resolved> {
    let users = fetch::<UserMini>(store, tables::USER, &keys.users)?;
    let categories = fetch::<CategoryMini>(store, tables::CATEGORY, &keys.categories)?;
    debug!(
        users = keys.users.len(),
        users_found = users.len(),
        categories = keys.categories.len(),
        categories_found = categories.len(),
        "Resolved foreign keys"
    );
    Ok(Resolved { users, categories })
}

/// Joins articles onto their users and categories for list display.
pub fn resolve_articles(
    store: &Store,
    articles: Vec<ArticleMini>,
    tz_hours: i32,
) -> Result<Vec<ArticleListItem>> {
    let mut keys = ForeignKeys::new();
    for article in &articles {
        keys.add_article(article);
    }
    let resolved = resolve(store, &keys)?;

    Ok(articles
        .into_iter()
        .map(|article| {
            let author = resolved.user(article.uid);
            ArticleListItem {
                id: article.id,
                uid: article.uid,
                name: author.name,
                avatar: author.avatar,
                cid: article.cid,
                cname: resolved.category_name(article.cid),
                ruid: article.ruid,
                rname: resolved.user_name(article.ruid),
                title: article.title,
                edit_time: article.edit_time,
                edit_time_fmt: format_list_time(article.edit_time, tz_hours),
                comments: article.comments,
            }
        })
        .collect())
}

/// Joins comments onto their authors.
pub fn resolve_comments(
    store: &Store,
    comments: Vec<Comment>,
    tz_hours: i32,
) -> Result<Vec<CommentListItem>> {
    let mut keys = ForeignKeys::new();
    for comment in &comments {
        keys.add_user(comment.uid);
    }
    let resolved = resolve(store, &keys)?;

    Ok(comments
        .into_iter()
        .map(|comment| {
            let author = resolved.user(comment.uid);
            CommentListItem {
                id: comment.id,
                aid: comment.aid,
                uid: comment.uid,
                name: author.name,
                avatar: author.avatar,
                content: comment.content,
                add_time: comment.add_time,
                add_time_fmt: format_list_time(comment.add_time, tz_hours),
            }
        })
        .collect())
}

/// Joins articles onto their authors and categories for feeds.
pub fn resolve_feed(
    store: &Store,
    articles: Vec<Article>,
    tz_hours: i32,
) -> Result<Vec<ArticleFeedListItem>> {
    let mut keys = ForeignKeys::new();
    for article in &articles {
        keys.add_user(article.uid);
        keys.add_category(article.cid);
    }
    let resolved = resolve(store, &keys)?;

    Ok(articles
        .into_iter()
        .map(|article| ArticleFeedListItem {
            id: article.id,
            uid: article.uid,
            name: resolved.user_name(article.uid),
            cname: resolved.category_name(article.cid),
            des: excerpt(&article.content, FEED_EXCERPT_CHARS),
            add_time_fmt: format_rfc3339(article.add_time, tz_hours),
            edit_time_fmt: format_rfc3339(article.edit_time, tz_hours),
            title: article.title,
        })
        .collect())
}
