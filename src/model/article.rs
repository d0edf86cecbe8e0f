//! Article records.

use serde::{Deserialize, Serialize};

/// A stored article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Article {
    pub id: u64,
    /// Author.
    pub uid: u64,
    /// Category.
    pub cid: u64,
    /// Last user to reply, 0 when nobody has.
    pub ruid: u64,
    pub title: String,
    pub content: String,
    #[serde(rename = "clientip")]
    pub client_ip: String,
    /// Comma-separated tags as entered.
    pub tags: String,
    #[serde(rename = "addtime")]
    pub add_time: u64,
    /// Last activity, used as the timeline score.
    #[serde(rename = "edittime")]
    pub edit_time: u64,
    pub comments: u64,
    #[serde(rename = "closecomment")]
    pub close_comment: bool,
    pub hidden: bool,
}

impl Article {
    /// Normalized tag list.
    pub fn tag_list(&self) -> Vec<String> {
        super::parse_tags(&self.tags)
    }
}

/// The subset of an article needed by list pages.
///
/// Decodes directly from a stored [`Article`] row; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleMini {
    pub id: u64,
    pub uid: u64,
    pub cid: u64,
    pub ruid: u64,
    pub title: String,
    #[serde(rename = "edittime")]
    pub edit_time: u64,
    pub comments: u64,
    pub hidden: bool,
}

impl From<&Article> for ArticleMini {
    fn from(article: &Article) -> Self {
        Self {
            id: article.id,
            uid: article.uid,
            cid: article.cid,
            ruid: article.ruid,
            title: article.title.clone(),
            edit_time: article.edit_time,
            comments: article.comments,
            hidden: article.hidden,
        }
    }
}

/// An article joined with its author, reply-to user and category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArticleListItem {
    pub id: u64,
    pub uid: u64,
    pub name: String,
    pub avatar: String,
    pub cid: u64,
    pub cname: String,
    pub ruid: u64,
    pub rname: String,
    pub title: String,
    #[serde(rename = "edittime")]
    pub edit_time: u64,
    #[serde(rename = "edittimefmt")]
    pub edit_time_fmt: String,
    pub comments: u64,
}

/// Entry of the related-articles box.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleLi {
    pub id: u64,
    pub title: String,
    pub tags: String,
    #[serde(skip_serializing)]
    pub hidden: bool,
}

/// Feed entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArticleFeedListItem {
    pub id: u64,
    pub uid: u64,
    pub name: String,
    pub cname: String,
    pub title: String,
    #[serde(rename = "addtimefmt")]
    pub add_time_fmt: String,
    #[serde(rename = "edittimefmt")]
    pub edit_time_fmt: String,
    /// Leading excerpt of the content.
    pub des: String,
}

/// Input for publishing an article.
#[derive(Debug, Clone, Default)]
pub struct NewArticle {
    pub uid: u64,
    pub cid: u64,
    pub title: String,
    pub content: String,
    pub client_ip: String,
    pub tags: String,
    /// Publication time (Unix seconds).
    pub now: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{decode, encode};

    #[test]
    fn test_mini_decodes_from_full_row() {
        let article = Article {
            id: 9,
            uid: 2,
            cid: 1,
            title: "Hello".into(),
            content: "long body".into(),
            edit_time: 500,
            hidden: true,
            ..Default::default()
        };
        let mini: ArticleMini = decode(&encode(&article).unwrap()).unwrap();
        assert_eq!(mini, ArticleMini::from(&article));
    }

    #[test]
    fn test_json_field_names() {
        let article = Article {
            client_ip: "127.0.0.1".into(),
            close_comment: true,
            ..Default::default()
        };
        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["clientip"], "127.0.0.1");
        assert_eq!(json["closecomment"], true);
        assert!(json.get("edittime").is_some());

        let li = serde_json::to_value(ArticleLi {
            hidden: true,
            ..Default::default()
        })
        .unwrap();
        assert!(li.get("hidden").is_none());
    }
}
