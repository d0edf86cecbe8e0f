//! Article accessors.

use super::{parse_id_list, Forum};
use crate::error::{ForumError, Result};
use crate::model::{
    decode_listed, Article, ArticleFeedListItem, ArticleListItem, ArticleMini, Category,
    NewArticle, User,
};
use crate::pagination::{self, Cursor, Direction, Listing, Page, ScanRow};
use crate::relevance::{self, ArticleRelative};
use crate::resolver::{resolve_articles, resolve_feed};
use crate::search::{self, SearchQuery};
use crate::storage::{id_key, key_id};
use crate::tables;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Article page as shown on list pages.
pub type ArticlePageInfo = Page<ArticleListItem>;

fn strip_cursors(items: Vec<(Cursor, ArticleMini)>) -> Vec<ArticleMini> {
    items.into_iter().map(|(_, article)| article).collect()
}

impl Forum {
    /// Looks up an article by id. Hidden articles are returned too.
    pub fn article_get_by_id(&self, id: u64) -> Result<Article> {
        self.get_record(tables::ARTICLE, id)
    }

    /// Stores a new article and adds it to every index it belongs to.
    pub fn article_publish(&self, new: NewArticle) -> Result<Article> {
        if new.title.trim().is_empty() {
            return Err(ForumError::invalid_input("Article title must not be empty"));
        }

        let id = self.store.next_sequence(tables::ARTICLE)?;
        let article = Article {
            id,
            uid: new.uid,
            cid: new.cid,
            title: new.title,
            content: new.content,
            client_ip: new.client_ip,
            tags: new.tags,
            add_time: new.now,
            edit_time: new.now,
            ..Default::default()
        };
        self.put_record(tables::ARTICLE, id, &article)?;
        self.index_timelines(&article)?;
        self.store
            .set(&tables::user_articles(article.uid), &id_key(id), &[])?;
        for tag in article.tag_list() {
            self.store.set(&tables::tag(&tag), &id_key(id), &[])?;
        }

        let now = article.add_time;
        self.modify_record::<User, _>(tables::USER, article.uid, |user| {
            user.articles += 1;
            user.last_post_time = now;
        })?;
        self.modify_record::<Category, _>(tables::CATEGORY, article.cid, |category| {
            category.articles += 1;
        })?;

        info!(id, uid = article.uid, cid = article.cid, "Article published");
        Ok(article)
    }

    /// Writes back an edited article.
    ///
    /// Moves it between category timelines and tag indexes when those
    /// changed, and re-scores its timelines with the new edit time.
    pub fn article_update(&self, article: &Article) -> Result<()> {
        if article.id == 0 {
            return Err(ForumError::invalid_input("Article id must not be 0"));
        }
        let old = self.article_get_by_id(article.id)?;
        let key = id_key(article.id);

        if old.cid != article.cid {
            self.store
                .zdel(&tables::category_articles(old.cid), article.id)?;
        }

        let old_tags: BTreeSet<String> = old.tag_list().into_iter().collect();
        let new_tags: BTreeSet<String> = article.tag_list().into_iter().collect();
        for tag in old_tags.difference(&new_tags) {
            self.store.delete(&tables::tag(tag), &key)?;
        }
        for tag in new_tags.difference(&old_tags) {
            self.store.set(&tables::tag(tag), &key, &[])?;
        }

        self.put_record(tables::ARTICLE, article.id, article)?;
        self.index_timelines(article)?;
        debug!(id = article.id, "Article updated");
        Ok(())
    }

    /// Hides or unhides an article.
    pub fn article_set_hidden(&self, id: u64, hidden: bool) -> Result<Article> {
        let mut article = self.article_get_by_id(id)?;
        article.hidden = hidden;
        self.put_record(tables::ARTICLE, id, &article)?;
        info!(id, hidden, "Article visibility changed");
        Ok(article)
    }

    /// Places the article in the site and category timelines at its edit time.
    pub(super) fn index_timelines(&self, article: &Article) -> Result<()> {
        self.store
            .zset(tables::ARTICLE_TIMELINE, article.id, article.edit_time)?;
        self.store.zset(
            &tables::category_articles(article.cid),
            article.id,
            article.edit_time,
        )
    }

    /// Loads the visible articles named by page rows.
    fn load_visible_articles(&self, rows: Vec<ScanRow>) -> Result<Vec<(Cursor, ArticleMini)>> {
        let mut articles = self.load_rows::<ArticleMini>(tables::ARTICLE, rows)?;
        articles.retain(|(_, article)| !article.hidden);
        Ok(articles)
    }

    /// One page of a scored article timeline, newest activity first.
    ///
    /// `table` is [`tables::ARTICLE_TIMELINE`] or a
    /// [`tables::category_articles`] table.
    pub fn article_list(
        &self,
        table: &str,
        cursor: Cursor,
        direction: Direction,
        limit: usize,
        tz_hours: i32,
    ) -> Result<ArticlePageInfo> {
        pagination::page(
            &self.store,
            Listing::newest_by_score(table),
            cursor,
            direction,
            limit,
            |rows| self.load_visible_articles(rows),
            |(cursor, _): &(Cursor, ArticleMini)| *cursor,
        )?
        .try_map(|items| resolve_articles(&self.store, strip_cursors(items), tz_hours))
    }

    /// One page of the articles a user published, newest first.
    pub fn user_article_list(
        &self,
        uid: u64,
        cursor: Cursor,
        direction: Direction,
        limit: usize,
        tz_hours: i32,
    ) -> Result<ArticlePageInfo> {
        let table = tables::user_articles(uid);
        pagination::page(
            &self.store,
            Listing::newest_by_id(&table),
            cursor,
            direction,
            limit,
            |rows| self.load_visible_articles(rows),
            |(cursor, _): &(Cursor, ArticleMini)| *cursor,
        )?
        .try_map(|items| resolve_articles(&self.store, strip_cursors(items), tz_hours))
    }

    /// Resolves an explicit comma-separated list of article ids, in the
    /// given order. Unparseable and missing ids are skipped.
    pub fn article_notification_list(
        &self,
        ids_csv: &str,
        tz_hours: i32,
    ) -> Result<Vec<ArticleListItem>> {
        let ids = parse_id_list(ids_csv);
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<Vec<u8>> = ids.iter().map(|id| id_key(*id)).collect();
        let found = self.store.multi_get(tables::ARTICLE, &keys)?;
        let articles = ids
            .iter()
            .zip(&keys)
            .filter_map(|(id, key)| {
                let bytes = found.get(key)?;
                decode_listed::<ArticleMini>(tables::ARTICLE, *id, bytes)
            })
            .collect();
        resolve_articles(&self.store, articles, tz_hours)
    }

    /// The newest `limit` visible articles, formatted for a feed.
    pub fn article_feed_list(&self, limit: usize, tz_hours: i32) -> Result<Vec<ArticleFeedListItem>> {
        let entries = self.store.scan_backward(tables::ARTICLE, &[], limit)?;
        let articles = entries
            .iter()
            .filter_map(|entry| {
                let id = key_id(&entry.key).unwrap_or(0);
                decode_listed::<Article>(tables::ARTICLE, id, &entry.value)
            })
            .filter(|article| !article.hidden)
            .collect();
        resolve_feed(&self.store, articles, tz_hours)
    }

    /// Articles sharing tags with `article_id`.
    pub fn article_related(&self, article_id: u64, tags_csv: &str) -> Result<ArticleRelative> {
        relevance::related(&self.store, article_id, tags_csv)
    }

    /// Up to `limit` visible articles matching `query`, newest first.
    ///
    /// Search results carry no navigation state.
    pub fn article_search_list(
        &self,
        query: &SearchQuery,
        limit: usize,
        tz_hours: i32,
    ) -> Result<ArticlePageInfo> {
        let items = search::search(&self.store, query.field, &query.needle, limit, tz_hours)?;
        Ok(Page::from_items(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publish(forum: &Forum, title: &str, cid: u64, tags: &str, now: u64) -> Article {
        forum
            .article_publish(NewArticle {
                uid: 1,
                cid,
                title: title.into(),
                content: format!("{} body", title),
                tags: tags.into(),
                now,
                ..Default::default()
            })
            .unwrap()
    }

    #[test]
    fn test_publish_indexes_everywhere() {
        let forum = Forum::in_memory();
        let article = publish(&forum, "First", 2, "Rust, Go", 100);
        assert_eq!(article.id, 1);

        let store = forum.store();
        assert_eq!(store.zget(tables::ARTICLE_TIMELINE, 1).unwrap(), Some(100));
        assert_eq!(
            store.zget(&tables::category_articles(2), 1).unwrap(),
            Some(100)
        );
        assert!(store
            .get(&tables::user_articles(1), &id_key(1))
            .unwrap()
            .is_some());
        assert!(store.get(&tables::tag("rust"), &id_key(1)).unwrap().is_some());
        assert!(store.get(&tables::tag("go"), &id_key(1)).unwrap().is_some());
    }

    #[test]
    fn test_publish_rejects_blank_title() {
        let forum = Forum::in_memory();
        let err = forum
            .article_publish(NewArticle {
                title: "  ".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ForumError::InvalidInput(_)));
    }

    #[test]
    fn test_update_moves_indexes() {
        let forum = Forum::in_memory();
        let mut article = publish(&forum, "Moving", 1, "a,b", 100);
        article.cid = 2;
        article.tags = "b,c".into();
        article.edit_time = 200;
        forum.article_update(&article).unwrap();

        let store = forum.store();
        assert_eq!(store.zget(&tables::category_articles(1), 1).unwrap(), None);
        assert_eq!(
            store.zget(&tables::category_articles(2), 1).unwrap(),
            Some(200)
        );
        assert_eq!(store.zget(tables::ARTICLE_TIMELINE, 1).unwrap(), Some(200));
        assert!(store.get(&tables::tag("a"), &id_key(1)).unwrap().is_none());
        assert!(store.get(&tables::tag("c"), &id_key(1)).unwrap().is_some());
    }

    #[test]
    fn test_notification_list_keeps_requested_order() {
        let forum = Forum::in_memory();
        for i in 1..=3 {
            publish(&forum, &format!("a{}", i), 1, "", i * 10);
        }
        let items = forum.article_notification_list("3,bogus,1,42", 0).unwrap();
        let ids: Vec<u64> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert!(forum.article_notification_list("", 0).unwrap().is_empty());
    }

    #[test]
    fn test_feed_skips_hidden() {
        let forum = Forum::in_memory();
        for i in 1..=4 {
            publish(&forum, &format!("a{}", i), 1, "", i * 10);
        }
        forum.article_set_hidden(4, true).unwrap();

        let feed = forum.article_feed_list(3, 0).unwrap();
        let ids: Vec<u64> = feed.iter().map(|i| i.id).collect();
        // The scan reads three rows and drops the hidden one.
        assert_eq!(ids, vec![3, 2]);
        assert_eq!(feed[0].des, "a3 body");
    }
}
