//! Category records.

use serde::{Deserialize, Serialize};

/// A stored category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub articles: u64,
    pub about: String,
    pub hidden: bool,
}

/// Category name joined onto list items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryMini {
    pub id: u64,
    pub name: String,
}
