//! Table names used by the forum.
//!
//! Primary tables are keyed by 8-byte big-endian ids. Index tables either
//! store the id as the key with an empty value (hash indexes) or as a sorted-set
//! member scored by a timestamp.

/// Articles by id.
pub const ARTICLE: &str = "article";

/// Users by id.
pub const USER: &str = "user";

/// Categories by id.
pub const CATEGORY: &str = "category";

/// Links by id.
pub const LINK: &str = "link";

/// Unique user name -> user id.
pub const USER_NAME_INDEX: &str = "user_name2uid";

/// Sorted set of every article, scored by last activity time.
pub const ARTICLE_TIMELINE: &str = "article_timeline";

/// Comments of one article, keyed by the article's own comment sequence.
pub fn article_comments(aid: u64) -> String {
    format!("article_comment:{}", aid)
}

/// Sorted set of one category's articles, scored by last activity time.
pub fn category_articles(cid: u64) -> String {
    format!("category_article_timeline:{}", cid)
}

/// Hash index of the articles a user published.
pub fn user_articles(uid: u64) -> String {
    format!("user_article_timeline:{}", uid)
}

/// Hash index of users carrying a moderation flag.
pub fn user_flag(flag: i32) -> String {
    format!("user_flag:{}", flag)
}

/// Reverse index of articles carrying a tag. The tag must already be
/// normalized (lower-case, trimmed).
pub fn tag(tag: &str) -> String {
    format!("tag:{}", tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dynamic_table_names() {
        assert_eq!(article_comments(7), "article_comment:7");
        assert_eq!(category_articles(2), "category_article_timeline:2");
        assert_eq!(user_articles(3), "user_article_timeline:3");
        assert_eq!(user_flag(5), "user_flag:5");
        assert_eq!(tag("rust"), "tag:rust");
    }
}
