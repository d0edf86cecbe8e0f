//! Command-line interface for kvforum.
//!
//! Every command opens the store named by `KVFORUM_DATA`, runs one forum
//! accessor and prints its result as JSON.

pub mod args;
pub mod commands;
pub mod utils;

use crate::config::SiteConfig;
use crate::Result;
use std::process;

pub use args::Command;

/// Main entry point for the CLI application
pub fn run() -> Result<()> {
    let command = match args::parse_args() {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error parsing arguments: {}", e);
            args::print_usage();
            process::exit(1);
        }
    };

    let config = SiteConfig::from_env()?;
    let forum = utils::open_forum(&config)?;

    match command {
        Command::Articles { category, page } => commands::articles(&forum, &config, category, page),
        Command::UserArticles { uid, page } => commands::user_articles(&forum, &config, uid, page),
        Command::Comments { aid, page } => commands::comments(&forum, &config, aid, page),
        Command::Users { flag, page } => commands::users(&forum, &config, flag, page),
        Command::Search { query } => commands::search(&forum, &config, &query),
        Command::Related { aid } => commands::related(&forum, aid),
        Command::Feed => commands::feed(&forum, &config),
        Command::Notifications { ids } => commands::notifications(&forum, &config, &ids),
        Command::Links { all } => commands::links(&forum, all),
        Command::Seed { count } => commands::seed(&forum, count),
    }
}
