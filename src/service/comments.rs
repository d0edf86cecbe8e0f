//! Comment accessors.

use super::Forum;
use crate::error::{ForumError, Result};
use crate::model::{decode_listed, Comment, CommentListItem, NewComment, User};
use crate::pagination::{self, Cursor, Direction, Listing, Page, ScanRow};
use crate::resolver::resolve_comments;
use crate::storage::id_key;
use crate::tables;
use tracing::info;

/// Comment page as shown under an article.
pub type CommentPageInfo = Page<CommentListItem>;

fn decode_rows(table: &str, rows: Vec<ScanRow>) -> Vec<(Cursor, Comment)> {
    rows.into_iter()
        .filter_map(|row| {
            decode_listed::<Comment>(table, row.key, &row.value).map(|c| (row.cursor(), c))
        })
        .collect()
}

impl Forum {
    /// Looks up comment `cid` of article `aid`.
    pub fn comment_get(&self, aid: u64, cid: u64) -> Result<Comment> {
        self.get_record(&tables::article_comments(aid), cid)
    }

    /// Stores a comment under its own id.
    pub fn comment_set(&self, aid: u64, comment: &Comment) -> Result<()> {
        if comment.id == 0 {
            return Err(ForumError::invalid_input("Comment id must not be 0"));
        }
        self.put_record(&tables::article_comments(aid), comment.id, comment)
    }

    /// Removes a comment. Counters are left as they are.
    pub fn comment_delete(&self, aid: u64, cid: u64) -> Result<()> {
        self.store
            .delete(&tables::article_comments(aid), &id_key(cid))
    }

    /// Adds a comment to an article.
    ///
    /// The article records the commenter as its last replier and moves to the
    /// top of its timelines; the commenter's reply counter goes up.
    pub fn comment_add(&self, aid: u64, new: NewComment) -> Result<Comment> {
        if new.content.trim().is_empty() {
            return Err(ForumError::invalid_input("Comment must not be empty"));
        }
        let mut article = self.article_get_by_id(aid)?;
        if article.close_comment {
            return Err(ForumError::invalid_input(format!(
                "Comments on article {} are closed",
                aid
            )));
        }

        let table = tables::article_comments(aid);
        let id = self.store.next_sequence(&table)?;
        let comment = Comment {
            id,
            aid,
            uid: new.uid,
            content: new.content,
            client_ip: new.client_ip,
            add_time: new.now,
        };
        self.put_record(&table, id, &comment)?;

        article.comments += 1;
        article.ruid = comment.uid;
        article.edit_time = comment.add_time;
        self.put_record(tables::ARTICLE, aid, &article)?;
        self.index_timelines(&article)?;

        let now = comment.add_time;
        self.modify_record::<User, _>(tables::USER, comment.uid, |user| {
            user.replies += 1;
            user.last_reply_time = now;
        })?;

        info!(aid, id, uid = comment.uid, "Comment added");
        Ok(comment)
    }

    /// One page of an article's comments, oldest first.
    pub fn comment_list(
        &self,
        aid: u64,
        cursor: Cursor,
        direction: Direction,
        limit: usize,
        tz_hours: i32,
    ) -> Result<CommentPageInfo> {
        let table = tables::article_comments(aid);
        pagination::page(
            &self.store,
            Listing::oldest_by_id(&table),
            cursor,
            direction,
            limit,
            |rows| Ok(decode_rows(&table, rows)),
            |(cursor, _): &(Cursor, Comment)| *cursor,
        )?
        .try_map(|items| {
            let comments = items.into_iter().map(|(_, comment)| comment).collect();
            resolve_comments(&self.store, comments, tz_hours)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewArticle;

    fn forum_with_article() -> Forum {
        let forum = Forum::in_memory();
        forum
            .article_publish(NewArticle {
                uid: 1,
                cid: 1,
                title: "Thread".into(),
                now: 100,
                ..Default::default()
            })
            .unwrap();
        forum
    }

    fn comment(uid: u64, now: u64) -> NewComment {
        NewComment {
            uid,
            content: format!("reply at {}", now),
            now,
            ..Default::default()
        }
    }

    #[test]
    fn test_comment_add_updates_article() {
        let forum = forum_with_article();
        let first = forum.comment_add(1, comment(2, 150)).unwrap();
        let second = forum.comment_add(1, comment(3, 160)).unwrap();
        assert_eq!((first.id, second.id), (1, 2));

        let article = forum.article_get_by_id(1).unwrap();
        assert_eq!(article.comments, 2);
        assert_eq!(article.ruid, 3);
        assert_eq!(article.edit_time, 160);
        assert_eq!(
            forum.store().zget(tables::ARTICLE_TIMELINE, 1).unwrap(),
            Some(160)
        );
    }

    #[test]
    fn test_comment_add_errors() {
        let forum = forum_with_article();
        assert!(forum.comment_add(9, comment(2, 150)).unwrap_err().is_not_found());

        let mut article = forum.article_get_by_id(1).unwrap();
        article.close_comment = true;
        forum.article_update(&article).unwrap();
        assert!(matches!(
            forum.comment_add(1, comment(2, 150)),
            Err(ForumError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_comment_get_set_delete() {
        let forum = forum_with_article();
        let mut added = forum.comment_add(1, comment(2, 150)).unwrap();
        added.content = "edited".into();
        forum.comment_set(1, &added).unwrap();
        assert_eq!(forum.comment_get(1, 1).unwrap().content, "edited");

        forum.comment_delete(1, 1).unwrap();
        assert!(forum.comment_get(1, 1).unwrap_err().is_not_found());
    }

    #[test]
    fn test_comment_list_is_oldest_first() {
        let forum = forum_with_article();
        for t in 0..5 {
            forum.comment_add(1, comment(2, 200 + t)).unwrap();
        }

        let first = forum
            .comment_list(1, Cursor::start(), Direction::Newer, 3, 0)
            .unwrap();
        let ids: Vec<u64> = first.items.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(!first.has_prev);
        assert!(first.has_next);

        let next = forum
            .comment_list(1, first.last_cursor(), Direction::Newer, 3, 0)
            .unwrap();
        let ids: Vec<u64> = next.items.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![4, 5]);
        assert!(next.has_prev);
        assert!(!next.has_next);
    }
}
