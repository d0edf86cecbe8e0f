//! Site configuration.
//!
//! Values come from `KVFORUM_*` environment variables with defaults for
//! anything unset. The core never reads configuration itself; callers pass
//! page sizes and timezone offsets explicitly.

use crate::error::{ForumError, Result};
use crate::pagination::DEFAULT_PAGE_SIZE;
use std::path::PathBuf;
use std::str::FromStr;

/// Default data directory.
pub const DEFAULT_DATA_DIR: &str = "kvforum_data";

/// Default number of entries in the feed.
pub const DEFAULT_FEED_SIZE: usize = 50;

/// Settings shared by every request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SiteConfig {
    /// Site display name.
    pub name: String,
    /// RocksDB directory.
    pub data_dir: PathBuf,
    /// Items per list page.
    pub page_size: usize,
    /// Timezone offset in hours applied to displayed times.
    pub time_zone: i32,
    /// Entries in the feed.
    pub feed_size: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "kvforum".to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            page_size: DEFAULT_PAGE_SIZE,
            time_zone: 0,
            feed_size: DEFAULT_FEED_SIZE,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| ForumError::config(format!("{} has an invalid value: {:?}", key, raw)))
}

impl SiteConfig {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(name) = lookup("KVFORUM_SITE_NAME") {
            config.name = name;
        }
        if let Some(dir) = lookup("KVFORUM_DATA") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("KVFORUM_PAGE_SIZE") {
            config.page_size = parse_var("KVFORUM_PAGE_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("KVFORUM_TIMEZONE") {
            config.time_zone = parse_var("KVFORUM_TIMEZONE", &raw)?;
        }
        if let Some(raw) = lookup("KVFORUM_FEED_SIZE") {
            config.feed_size = parse_var("KVFORUM_FEED_SIZE", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejects values no request could work with.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(ForumError::config("Page size must be at least 1"));
        }
        if !(-12..=14).contains(&self.time_zone) {
            return Err(ForumError::config(format!(
                "Timezone offset {} is outside -12..=14",
                self.time_zone
            )));
        }
        Ok(())
    }
}
