//! Comment records.

use serde::{Deserialize, Serialize};

/// A stored comment. `id` is allocated from the article's own sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Comment {
    pub id: u64,
    pub aid: u64,
    pub uid: u64,
    pub content: String,
    #[serde(rename = "clientip")]
    pub client_ip: String,
    #[serde(rename = "addtime")]
    pub add_time: u64,
}

/// A comment joined with its author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommentListItem {
    pub id: u64,
    pub aid: u64,
    pub uid: u64,
    pub name: String,
    pub avatar: String,
    pub content: String,
    #[serde(rename = "addtime")]
    pub add_time: u64,
    #[serde(rename = "addtimefmt")]
    pub add_time_fmt: String,
}

/// Input for adding a comment.
#[derive(Debug, Clone, Default)]
pub struct NewComment {
    pub uid: u64,
    pub content: String,
    pub client_ip: String,
    pub now: u64,
}
