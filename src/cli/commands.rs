//! Command implementations for the kvforum CLI.

use crate::{
    cli::args::PageArgs,
    cli::utils::print_json,
    config::SiteConfig,
    error::ForumError,
    model::{Category, Link, NewArticle, NewComment},
    pagination::Page,
    search::SearchQuery,
    service::Forum,
    settings::{NameSaltedSha3, PasswordDigest},
    tables, Result,
};
use serde::Serialize;
use tracing::info;

/// A page together with ready-made cursor tokens for the neighbouring pages.
#[derive(Serialize)]
struct PageOutput<'a, T: Serialize> {
    #[serde(flatten)]
    page: &'a Page<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prev_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_cursor: Option<String>,
}

fn print_page<T: Serialize>(page: &Page<T>) -> Result<()> {
    print_json(&PageOutput {
        page,
        prev_cursor: page.has_prev.then(|| page.first_cursor().encode()),
        next_cursor: page.has_next.then(|| page.last_cursor().encode()),
    })
}

/// Execute articles command
pub fn articles(forum: &Forum, config: &SiteConfig, category: Option<u64>, page: PageArgs) -> Result<()> {
    let table = match category {
        Some(cid) => tables::category_articles(cid),
        None => tables::ARTICLE_TIMELINE.to_string(),
    };
    let result = forum.article_list(
        &table,
        page.cursor,
        page.direction,
        config.page_size,
        config.time_zone,
    )?;
    print_page(&result)
}

/// Execute user-articles command
pub fn user_articles(forum: &Forum, config: &SiteConfig, uid: u64, page: PageArgs) -> Result<()> {
    let result = forum.user_article_list(
        uid,
        page.cursor,
        page.direction,
        config.page_size,
        config.time_zone,
    )?;
    print_page(&result)
}

/// Execute comments command
pub fn comments(forum: &Forum, config: &SiteConfig, aid: u64, page: PageArgs) -> Result<()> {
    let result = forum.comment_list(
        aid,
        page.cursor,
        page.direction,
        config.page_size,
        config.time_zone,
    )?;
    print_page(&result)
}

/// Execute users command
pub fn users(forum: &Forum, config: &SiteConfig, flag: i32, page: PageArgs) -> Result<()> {
    let result = forum.user_list_by_flag(flag, page.cursor, page.direction, config.page_size)?;
    print_page(&result)
}

/// Execute search command
pub fn search(forum: &Forum, config: &SiteConfig, query: &str) -> Result<()> {
    let Some(query) = SearchQuery::parse(query) else {
        return print_page(&Page::<()>::default());
    };
    let result = forum.article_search_list(&query, config.page_size, config.time_zone)?;
    print_page(&result)
}

/// Execute related command
pub fn related(forum: &Forum, aid: u64) -> Result<()> {
    let article = forum.article_get_by_id(aid)?;
    let result = forum.article_related(article.id, &article.tags)?;
    print_json(&result)
}

/// Execute feed command
pub fn feed(forum: &Forum, config: &SiteConfig) -> Result<()> {
    let items = forum.article_feed_list(config.feed_size, config.time_zone)?;
    print_json(&items)
}

/// Execute notifications command
pub fn notifications(forum: &Forum, config: &SiteConfig, ids: &str) -> Result<()> {
    let items = forum.article_notification_list(ids, config.time_zone)?;
    print_json(&items)
}

/// Execute links command
pub fn links(forum: &Forum, all: bool) -> Result<()> {
    print_json(&forum.link_list(all)?)
}

/// Counts of the records written by [`seed_demo`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub users: usize,
    pub categories: usize,
    pub articles: usize,
    pub comments: usize,
    pub links: usize,
}

/// First timestamp used for demo data.
const SEED_EPOCH: u64 = 1_700_000_000;

const SEED_USERS: &[&str] = &["ada", "grace", "linus", "barbara", "ken"];
const SEED_CATEGORIES: &[&str] = &["General", "Rust", "Storage"];
const SEED_TAGS: &[&str] = &["rust", "rocksdb", "pagination", "search", "serde", "tracing"];
const SEED_TOPICS: &[&str] = &[
    "Hello from the forum",
    "Borrow checker questions",
    "Tuning RocksDB column families",
    "Cursor pagination in practice",
    "Structured logging with tracing",
];

/// Writes `count` deterministic demo articles plus the users, categories,
/// comments and links they refer to.
///
/// Users are only created once; running the seed again adds more articles.
pub fn seed_demo(forum: &Forum, count: usize) -> Result<SeedSummary> {
    let digest = NameSaltedSha3;
    let mut summary = SeedSummary::default();

    let mut uids = Vec::with_capacity(SEED_USERS.len());
    for name in SEED_USERS {
        let uid = match forum.user_get_id_by_name(name)? {
            Some(uid) => uid,
            None => {
                summary.users += 1;
                forum
                    .user_register(name, &digest.digest(name, "password"), 5, SEED_EPOCH)?
                    .id
            }
        };
        uids.push(uid);
    }

    let mut cids = Vec::with_capacity(SEED_CATEGORIES.len());
    for name in SEED_CATEGORIES {
        let category = forum.category_set(Category {
            name: name.to_string(),
            about: format!("Talk about {}", name.to_lowercase()),
            ..Default::default()
        })?;
        summary.categories += 1;
        cids.push(category.id);
    }

    for (i, name) in ["docs.rs", "crates.io", "rocksdb.org"].iter().enumerate() {
        forum.link_set(Link {
            name: name.to_string(),
            url: format!("https://{}", name),
            score: i as i64,
            ..Default::default()
        })?;
        summary.links += 1;
    }

    for i in 0..count {
        let now = SEED_EPOCH + (i as u64 + 1) * 60;
        let tags = format!(
            "{},{}",
            SEED_TAGS[i % SEED_TAGS.len()],
            SEED_TAGS[(i / 2 + 1) % SEED_TAGS.len()]
        );
        let article = forum.article_publish(NewArticle {
            uid: uids[i % uids.len()],
            cid: cids[i % cids.len()],
            title: format!("{} #{}", SEED_TOPICS[i % SEED_TOPICS.len()], i + 1),
            content: format!(
                "Demo article {} about {}. It exists to exercise listings and search.",
                i + 1,
                tags.replace(',', " and ")
            ),
            client_ip: "127.0.0.1".to_string(),
            tags,
            now,
        })?;
        summary.articles += 1;

        if i % 7 == 6 {
            forum.article_set_hidden(article.id, true)?;
        }
        if i % 3 == 0 {
            forum.comment_add(
                article.id,
                NewComment {
                    uid: uids[(i + 1) % uids.len()],
                    content: format!("First reply to article {}", article.id),
                    client_ip: "127.0.0.1".to_string(),
                    now: now + 30,
                },
            )?;
            summary.comments += 1;
        }
    }

    info!(
        users = summary.users,
        articles = summary.articles,
        comments = summary.comments,
        "Seeded demo data"
    );
    Ok(summary)
}

/// Execute seed command
pub fn seed(forum: &Forum, count: usize) -> Result<()> {
    if count == 0 {
        return Err(ForumError::invalid_input("seed count must be at least 1"));
    }
    let summary = seed_demo(forum, count)?;
    print_json(&summary)
}
