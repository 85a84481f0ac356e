//! Dashboard categories

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A known dashboard category
///
/// Resources carry the category as a plain string; this enum names the set
/// the schema accepts, listed in the default display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    /// Streaming, downloads, libraries
    Media,
    /// Model front-ends and assistants
    Ai,
    /// Documents, notes, calendars
    Productivity,
    /// Forges, CI, registries
    Development,
    /// Cluster and infrastructure tooling
    Admin,
}

impl Category {
    /// All categories in default display order
    pub const ALL: [Category; 5] = [
        Category::Media,
        Category::Ai,
        Category::Productivity,
        Category::Development,
        Category::Admin,
    ];

    /// Wire name
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Category::Media => "media",
            Category::Ai => "ai",
            Category::Productivity => "productivity",
            Category::Development => "development",
            Category::Admin => "admin",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for a category outside the known set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}
