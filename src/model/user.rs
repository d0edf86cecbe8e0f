//! User records.

use serde::{Deserialize, Serialize};

/// A stored user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub gender: String,
    /// Moderation flag; users are indexed by it.
    pub flag: i32,
    /// Avatar reference, empty when unset.
    pub avatar: String,
    /// Password digest.
    pub password: String,
    pub email: String,
    pub url: String,
    pub telephone: String,
    pub coin: i64,
    pub articles: u64,
    pub replies: u64,
    #[serde(rename = "regtime")]
    pub reg_time: u64,
    #[serde(rename = "lastposttime")]
    pub last_post_time: u64,
    #[serde(rename = "lastreplytime")]
    pub last_reply_time: u64,
    #[serde(rename = "lastlogintime")]
    pub last_login_time: u64,
    pub about: String,
    pub notice: String,
    #[serde(rename = "noticenum")]
    pub notice_num: u64,
    #[serde(rename = "emailverified")]
    pub email_verified: bool,
    #[serde(rename = "telephoneverified")]
    pub telephone_verified: bool,
    pub hidden: bool,
    pub session: String,
}

/// Name and avatar of a user, joined onto list items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserMini {
    pub id: u64,
    pub name: String,
    pub avatar: String,
}

/// Public projection of a [`User`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserListItem {
    pub id: u64,
    pub name: String,
    pub gender: String,
    pub flag: i32,
    pub avatar: String,
    pub email: String,
    pub url: String,
    pub coin: i64,
    pub articles: u64,
    pub replies: u64,
    #[serde(rename = "regtime")]
    pub reg_time: u64,
    #[serde(rename = "lastposttime")]
    pub last_post_time: u64,
    #[serde(rename = "lastreplytime")]
    pub last_reply_time: u64,
    pub about: String,
    pub hidden: bool,
}

impl From<User> for UserListItem {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            gender: user.gender,
            flag: user.flag,
            avatar: user.avatar,
            email: user.email,
            url: user.url,
            coin: user.coin,
            articles: user.articles,
            replies: user.replies,
            reg_time: user.reg_time,
            last_post_time: user.last_post_time,
            last_reply_time: user.last_reply_time,
            about: user.about,
            hidden: user.hidden,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_item_has_no_credentials() {
        let user = User {
            id: 1,
            name: "alice".into(),
            password: "digest".into(),
            session: "token".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(UserListItem::from(user)).unwrap();
        assert_eq!(json["name"], "alice");
        assert!(json.get("password").is_none());
        assert!(json.get("session").is_none());
    }
}
