//! Utility functions for CLI operations.

use crate::config::SiteConfig;
use crate::error::{ForumError, Result};
use crate::service::Forum;
use crate::storage::RocksDbConfig;
use serde::Serialize;
use std::fs;

/// Opens the forum store in the configured data directory, creating it if
/// needed.
pub fn open_forum(config: &SiteConfig) -> Result<Forum> {
    if !config.data_dir.exists() {
        fs::create_dir_all(&config.data_dir)?;
    }
    Forum::open(&config.data_dir, &RocksDbConfig::default())
}

/// Prints a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(ForumError::serialization)?;
    println!("{}", json);
    Ok(())
}
