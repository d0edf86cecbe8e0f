//! Command-line argument parsing for kvforum.

use crate::error::{ForumError, Result};
use crate::pagination::{Cursor, Direction};
use std::env;

/// Position and direction of a paged listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageArgs {
    pub cursor: Cursor,
    pub direction: Direction,
}

/// Command-line interface commands
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Articles {
        category: Option<u64>,
        page: PageArgs,
    },
    UserArticles {
        uid: u64,
        page: PageArgs,
    },
    Comments {
        aid: u64,
        page: PageArgs,
    },
    Users {
        flag: i32,
        page: PageArgs,
    },
    Search {
        query: String,
    },
    Related {
        aid: u64,
    },
    Feed,
    Notifications {
        ids: String,
    },
    Links {
        all: bool,
    },
    Seed {
        count: usize,
    },
}

fn parse_number<T: std::str::FromStr>(what: &str, value: Option<&String>) -> Result<T> {
    let value = value.ok_or_else(|| ForumError::invalid_input(format!("{} requires a value", what)))?;
    value
        .parse()
        .map_err(|_| ForumError::invalid_input(format!("Invalid {}: {}", what, value)))
}

/// Parses paging flags, returning them with any arguments left over.
fn parse_page_args(args: &[String]) -> Result<(PageArgs, Vec<String>)> {
    let mut page = PageArgs::default();
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--older" => page.direction = Direction::Older,
            "--newer" => page.direction = Direction::Newer,
            "--key" => page.cursor.key = parse_number("--key", iter.next())?,
            "--score" => page.cursor.score = parse_number("--score", iter.next())?,
            "--cursor" => {
                let token = iter
                    .next()
                    .ok_or_else(|| ForumError::invalid_input("--cursor requires a value"))?;
                page.cursor = Cursor::decode(token)
                    .ok_or_else(|| ForumError::invalid_input(format!("Invalid cursor: {}", token)))?;
            }
            _ => rest.push(arg.clone()),
        }
    }
    Ok((page, rest))
}

/// Parse command line arguments into a Command
pub fn parse_args() -> Result<Command> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_from(&args)
}

/// Parses arguments (without the program name) into a Command
pub fn parse_from(args: &[String]) -> Result<Command> {
    let Some((name, rest)) = args.split_first() else {
        return Err(ForumError::invalid_input("Missing command"));
    };

    match name.as_str() {
        "articles" => {
            let (page, rest) = parse_page_args(rest)?;
            let mut category = None;
            let mut iter = rest.iter();
            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "--category" => category = Some(parse_number("--category", iter.next())?),
                    other => {
                        return Err(ForumError::invalid_input(format!(
                            "Unexpected argument: {}",
                            other
                        )))
                    }
                }
            }
            Ok(Command::Articles { category, page })
        }

        "user-articles" => {
            let (page, rest) = parse_page_args(rest)?;
            Ok(Command::UserArticles {
                uid: parse_number("user id", rest.first())?,
                page,
            })
        }

        "comments" => {
            let (page, rest) = parse_page_args(rest)?;
            Ok(Command::Comments {
                aid: parse_number("article id", rest.first())?,
                page,
            })
        }

        "users" => {
            let (page, rest) = parse_page_args(rest)?;
            Ok(Command::Users {
                flag: parse_number("flag", rest.first())?,
                page,
            })
        }

        "search" => {
            if rest.is_empty() {
                return Err(ForumError::invalid_input("search requires a query"));
            }
            Ok(Command::Search {
                query: rest.join(" "),
            })
        }

        "related" => Ok(Command::Related {
            aid: parse_number("article id", rest.first())?,
        }),

        "feed" => Ok(Command::Feed),

        "notifications" => {
            let ids = rest
                .first()
                .ok_or_else(|| ForumError::invalid_input("notifications requires an id list"))?;
            Ok(Command::Notifications { ids: ids.clone() })
        }

        "links" => Ok(Command::Links {
            all: rest.iter().any(|a| a == "--all"),
        }),

        "seed" => Ok(Command::Seed {
            count: parse_number("count", rest.first())?,
        }),

        other => Err(ForumError::invalid_input(format!(
            "Unknown command '{}'",
            other
        ))),
    }
}

/// Print usage information
pub fn print_usage() {
    println!("kvforum - forum data over an ordered key-value store");
    println!("====================================================");
    println!();
    println!("Usage: kvforum <command> [args...]");
    println!();
    println!("Commands:");
    println!("  articles [--category <cid>] [paging]   Article timeline, newest activity first");
    println!("  user-articles <uid> [paging]           Articles published by a user");
    println!("  comments <aid> [paging]                Comments of an article, oldest first");
    println!("  users <flag> [paging]                  Users carrying a moderation flag");
    println!("  search <query>                         Search titles (prefix c: for content)");
    println!("  related <aid>                          Articles sharing tags with an article");
    println!("  feed                                   Newest articles for a feed");
    println!("  notifications <id,id,...>              Resolve an explicit article id list");
    println!("  links [--all]                          Sidebar links, highest score first");
    println!("  seed <count>                           Write deterministic demo data");
    println!();
    println!("Paging:");
    println!("  --older | --newer      Direction from the cursor (default: --older)");
    println!("  --key <id>             Cursor key (0 starts at the edge)");
    println!("  --score <score>        Cursor score for timelines");
    println!("  --cursor <token>       Cursor token printed with a previous page");
    println!();
    println!("Environment:");
    println!("  KVFORUM_DATA, KVFORUM_PAGE_SIZE, KVFORUM_TIMEZONE, KVFORUM_SITE_NAME");
    println!();
    println!("Examples:");
    println!("  kvforum seed 200");
    println!("  kvforum articles --older --key 180 --score 1700010800");
    println!("  kvforum search c:borrow");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Command> {
        let args: Vec<String> = line.split_whitespace().map(String::from).collect();
        parse_from(&args)
    }

    #[test]
    fn test_articles_paging() {
        let cmd = parse("articles --newer --key 12 --score 3400 --category 2").unwrap();
        assert_eq!(
            cmd,
            Command::Articles {
                category: Some(2),
                page: PageArgs {
                    cursor: Cursor::new(12, 3400),
                    direction: Direction::Newer,
                },
            }
        );
        assert_eq!(
            parse("articles").unwrap(),
            Command::Articles {
                category: None,
                page: PageArgs::default(),
            }
        );
    }

    #[test]
    fn test_cursor_token() {
        let token = Cursor::new(5, 9).encode();
        let cmd = parse(&format!("comments 3 --cursor {}", token)).unwrap();
        assert_eq!(
            cmd,
            Command::Comments {
                aid: 3,
                page: PageArgs {
                    cursor: Cursor::new(5, 9),
                    direction: Direction::Older,
                },
            }
        );
    }

    #[test]
    fn test_search_joins_words() {
        assert_eq!(
            parse("search hello world").unwrap(),
            Command::Search {
                query: "hello world".into()
            }
        );
    }

    #[test]
    fn test_errors() {
        assert!(parse("").is_err());
        assert!(parse("bogus").is_err());
        assert!(parse("comments").is_err());
        assert!(parse("comments abc").is_err());
        assert!(parse("articles --key").is_err());
        assert!(parse("articles --surprise").is_err());
    }

    #[test]
    fn test_links_flag() {
        assert_eq!(parse("links --all").unwrap(), Command::Links { all: true });
        assert_eq!(parse("links").unwrap(), Command::Links { all: false });
    }
}
