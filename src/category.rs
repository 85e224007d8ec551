use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Journaling prompt a recording answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Challenging,
    Grateful,
    Beautiful,
}

impl Category {
    /// All categories in tab order
    pub const ALL: [Category; 3] = [Category::Challenging, Category::Grateful, Category::Beautiful];

    /// Lowercase slug used in paths, URLs and metadata
    pub fn slug(self) -> &'static str {
        match self {
            Category::Challenging => "challenging",
            Category::Grateful => "grateful",
            Category::Beautiful => "beautiful",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Category::Challenging => "Challenging",
            Category::Grateful => "Grateful",
            Category::Beautiful => "Beautiful",
        }
    }

    /// Prompt shown above the record button
    pub fn prompt(self) -> String {
        format!("Record something that you found {} during the day", self.title())
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Category::Challenging => 0,
            Category::Grateful => 1,
            Category::Beautiful => 2,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category '{0}' (expected challenging, grateful or beautiful)")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.slug().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}
