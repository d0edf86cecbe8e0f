//! Sidebar links.

use serde::{Deserialize, Serialize};

/// A stored link. A score of 0 or below keeps it out of public listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Link {
    pub id: u64,
    pub name: String,
    pub url: String,
    pub score: i64,
}

impl Link {
    /// Whether the link shows up in public listings.
    pub fn is_listed(&self) -> bool {
        self.score > 0
    }
}
