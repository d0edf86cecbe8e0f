//! # kvforum
//!
//! Read and write paths of a discussion forum stored in an ordered key-value
//! store. Articles, comments, users, categories and links live in id-keyed
//! tables; timelines are sorted sets scored by last activity.
//!
//! ## Features
//!
//! - **Cursor pagination**: bidirectional pages over hash tables and sorted
//!   sets with probe-based `has_prev` / `has_next`
//! - **Batch joins**: list items are joined to users and categories with one
//!   multi-get per foreign table
//! - **Related articles**: ranked by tag co-occurrence
//! - **Search**: bounded linear scan with case-insensitive matching
//! - **Backends**: RocksDB, or an in-memory engine for tests
//!
//! ## Example
//!
//! ```rust
//! use kvforum::model::NewArticle;
//! use kvforum::pagination::{Cursor, Direction};
//! use kvforum::service::Forum;
//! use kvforum::tables;
//! # fn main() -> kvforum::Result<()> {
//! let forum = Forum::in_memory();
//! forum.user_register("alice", "digest", 5, 1_700_000_000)?;
//! forum.article_publish(NewArticle {
//!     uid: 1,
//!     title: "Hello".into(),
//!     now: 1_700_000_000,
//!     ..Default::default()
//! })?;
//!
//! let page = forum.article_list(tables::ARTICLE_TIMELINE, Cursor::start(), Direction::Older, 20, 0)?;
//! assert_eq!(page.items[0].name, "alice");
//! assert!(!page.has_next);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod model;
pub mod pagination;
pub mod relevance;
pub mod resolver;
pub mod search;
pub mod service;
pub mod settings;
pub mod storage;
pub mod tables;

pub use error::{ForumError, Result};
pub use pagination::{Cursor, Direction, Page};
pub use service::Forum;
