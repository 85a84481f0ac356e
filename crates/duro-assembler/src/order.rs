//! Category ranking
//!
//! The display order of categories is a value handed to the assembler, not
//! a process-wide table, so alternative orderings can be used side by side.

use duro_model::Category;
use std::cmp::Ordering;

/// Ordered list of category names, first is displayed first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryOrder {
    ranks: Vec<String>,
}

impl CategoryOrder {
    /// Create an order from category names, highest precedence first
    ///
    /// Duplicate names keep their first position.
    #[must_use]
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ranks: Vec<String> = Vec::new();
        for category in categories {
            let category = category.into();
            if !ranks.contains(&category) {
                ranks.push(category);
            }
        }
        Self { ranks }
    }

    /// Rank of a category; unknown categories rank after every known one
    #[inline]
    #[must_use]
    pub fn rank(&self, category: &str) -> usize {
        self.ranks
            .iter()
            .position(|c| c == category)
            .unwrap_or(self.ranks.len())
    }

    /// Whether the category has an explicit rank
    #[inline]
    #[must_use]
    pub fn contains(&self, category: &str) -> bool {
        self.ranks.iter().any(|c| c == category)
    }

    /// Compare two categories by rank
    ///
    /// Unknown categories tie on rank and fall back to their names so the
    /// order stays total.
    #[must_use]
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.rank(a)
            .cmp(&self.rank(b))
            .then_with(|| a.cmp(b))
    }

    /// Category names in rank order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ranks.iter().map(String::as_str)
    }
}

impl Default for CategoryOrder {
    /// media < ai < productivity < development < admin
    fn default() -> Self {
        Self::new(Category::ALL.iter().map(Category::as_str))
    }
}
