//! Related articles by tag co-occurrence.
//!
//! Every tag of the source article is looked up in its reverse index. Each
//! other article gets one vote per shared tag; the most-voted articles win.
//! Only the newest [`RELATED_SCAN_MAX`] entries of each tag are considered,
//! which bounds the work for popular tags.

use crate::error::Result;
use crate::model::{decode_listed, parse_tags, ArticleLi};
use crate::storage::{id_key, key_id, Store};
use crate::tables;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Entries read from each tag index.
pub const RELATED_SCAN_MAX: usize = 100;

/// Articles returned.
pub const RELATED_GET_MAX: usize = 10;

/// Related articles plus tags they carry that the source does not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArticleRelative {
    pub articles: Vec<ArticleLi>,
    /// Suggested tags, sorted.
    pub tags: Vec<String>,
}

/// Ranks candidates by vote count, ties broken by the higher (newer) id.
fn rank(votes: HashMap<u64, usize>, take: usize) -> Vec<u64> {
    let mut ranked: Vec<(u64, usize)> = votes.into_iter().collect();
    ranked.sort_unstable_by_key(|&(id, count)| (Reverse(count), Reverse(id)));
    ranked.into_iter().take(take).map(|(id, _)| id).collect()
}

/// Finds articles sharing tags with `article_id`.
///
/// `tags_csv` is the source article's tag string. Without tags nothing is
/// read from the store.
pub fn related(store: &Store, article_id: u64, tags_csv: &str) -> Result<ArticleRelative> {
    let tags = parse_tags(tags_csv);
    if tags.is_empty() {
        return Ok(ArticleRelative::default());
    }

    let mut votes: HashMap<u64, usize> = HashMap::new();
    for tag in &tags {
        let entries = store.scan_backward(&tables::tag(tag), b"", RELATED_SCAN_MAX)?;
        for entry in entries {
            match key_id(&entry.key) {
                Some(id) if id != article_id => *votes.entry(id).or_insert(0) += 1,
                _ => {}
            }
        }
    }
    let candidates = votes.len();
    let ranked = rank(votes, candidates);
    if ranked.is_empty() {
        debug!(article_id, tags = tags.len(), "No related articles");
        return Ok(ArticleRelative::default());
    }

    // Hidden or missing rows are replaced by the next-ranked candidates.
    let source_tags: BTreeSet<&str> = tags.iter().map(String::as_str).collect();
    let mut suggested: BTreeSet<String> = BTreeSet::new();
    let mut articles = Vec::with_capacity(RELATED_GET_MAX);
    for chunk in ranked.chunks(RELATED_GET_MAX) {
        let keys: Vec<Vec<u8>> = chunk.iter().map(|id| id_key(*id)).collect();
        let rows = store.multi_get(tables::ARTICLE, &keys)?;
        for (id, key) in chunk.iter().zip(&keys) {
            let Some(value) = rows.get(key) else {
                continue;
            };
            let Some(li) = decode_listed::<ArticleLi>(tables::ARTICLE, *id, value) else {
                continue;
            };
            if li.hidden {
                continue;
            }
            for tag in parse_tags(&li.tags) {
                if !source_tags.contains(tag.as_str()) {
                    suggested.insert(tag);
                }
            }
            articles.push(li);
            if articles.len() == RELATED_GET_MAX {
                break;
            }
        }
        if articles.len() == RELATED_GET_MAX {
            break;
        }
    }

    debug!(
        article_id,
        tags = tags.len(),
        candidates,
        returned = articles.len(),
        "Related articles ranked"
    );
    Ok(ArticleRelative {
        articles,
        tags: suggested.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{encode, Article};
    use crate::storage::counting::counting_store;

    #[test]
    fn test_rank_orders_by_votes_then_id() {
        let votes = HashMap::from([(1, 1), (2, 3), (3, 1), (4, 2)]);
        assert_eq!(rank(votes.clone(), 10), vec![2, 4, 3, 1]);
        assert_eq!(rank(votes, 2), vec![2, 4]);
    }

    fn put_article(store: &Store, id: u64, tags: &str, hidden: bool) {
        let article = Article {
            id,
            title: format!("a{}", id),
            tags: tags.into(),
            hidden,
            ..Default::default()
        };
        store
            .set(tables::ARTICLE, &id_key(id), &encode(&article).unwrap())
            .unwrap();
        for tag in parse_tags(tags) {
            store.set(&tables::tag(&tag), &id_key(id), b"").unwrap();
        }
    }

    #[test]
    fn test_no_tags_means_no_work() {
        let (store, counts) = counting_store();
        put_article(&store, 1, "rust", false);
        put_article(&store, 2, "rust", false);
        counts.reset();

        assert_eq!(related(&store, 1, "").unwrap(), ArticleRelative::default());
        assert_eq!(related(&store, 1, " , ").unwrap(), ArticleRelative::default());
        assert_eq!(counts.scans_before() + counts.scans_after(), 0);
        assert_eq!(counts.multi_gets() + counts.gets(), 0);
    }

    #[test]
    fn test_one_scan_per_tag_and_one_fetch() {
        let (store, counts) = counting_store();
        put_article(&store, 1, "rust,serde,tracing", false);
        for id in 2..=6 {
            put_article(&store, id, "rust,serde", false);
        }
        counts.reset();

        let result = related(&store, 1, "rust,serde,tracing").unwrap();
        assert_eq!(result.articles.len(), 5);
        assert_eq!(counts.scans_before(), 3);
        assert_eq!(counts.multi_gets(), 1);
    }

    #[test]
    fn test_hidden_top_ranked_are_replaced() {
        let store = Store::in_memory();
        put_article(&store, 1, "a,b", false);
        // The best-ranked candidates share both tags but are hidden.
        for id in 100..103 {
            put_article(&store, id, "a,b", true);
        }
        for id in 2..=(RELATED_GET_MAX as u64 + 1) {
            put_article(&store, id, "a", false);
        }

        let result = related(&store, 1, "a,b").unwrap();
        assert_eq!(result.articles.len(), RELATED_GET_MAX);
        assert!(result.articles.iter().all(|a| !a.hidden && a.id < 100));
    }

    #[test]
    fn test_unindexed_tag() {
        let store = Store::in_memory();
        assert_eq!(
            related(&store, 1, "nothing-here").unwrap(),
            ArticleRelative::default()
        );
    }
}
