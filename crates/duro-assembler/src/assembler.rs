//! Entry assembly
//!
//! Turns the full set of resources into the ordered entry list and its
//! canonical JSON rendering. Pure: the same resources always produce the
//! same bytes, regardless of input order.

use crate::order::CategoryOrder;
use duro_model::{ContentHash, DashboardApp, Entry};
use std::cmp::Ordering;

/// Errors raised while assembling the document
#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    /// JSON rendering failed
    #[error("failed to serialize apps document: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Ordered entries plus their canonical document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    /// Entries in display order
    pub entries: Vec<Entry>,
    /// Pretty-printed JSON array of `entries`
    pub document: String,
}

impl Assembly {
    /// Integrity tag of the document
    #[inline]
    #[must_use]
    pub fn hash(&self) -> ContentHash {
        ContentHash::compute(self.document.as_bytes())
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries were assembled
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Derives, orders and renders dashboard entries
#[derive(Debug, Clone, Default)]
pub struct Assembler {
    order: CategoryOrder,
}

impl Assembler {
    /// Create an assembler using the given category order
    #[inline]
    #[must_use]
    pub fn new(order: CategoryOrder) -> Self {
        Self { order }
    }

    /// Category order in use
    #[inline]
    #[must_use]
    pub fn order(&self) -> &CategoryOrder {
        &self.order
    }

    /// Assemble all resources into the published document
    ///
    /// # Errors
    /// Returns [`AssembleError::Serialization`] if rendering fails
    pub fn assemble(&self, apps: &[DashboardApp]) -> Result<Assembly, AssembleError> {
        let mut entries: Vec<Entry> = apps.iter().map(Entry::from_app).collect();

        for entry in entries.iter().filter(|e| !self.order.contains(&e.category)) {
            tracing::warn!(
                app = %entry.id,
                category = %entry.category,
                "Unknown category, sorting after known categories"
            );
        }

        entries.sort_by(|a, b| self.compare(a, b));

        let document = serde_json::to_string_pretty(&entries)?;
        tracing::debug!(count = entries.len(), bytes = document.len(), "Assembled apps document");

        Ok(Assembly { entries, document })
    }

    /// Category rank, then priority, then display name, then resource name
    fn compare(&self, a: &Entry, b: &Entry) -> Ordering {
        self.order
            .compare(&a.category, &b.category)
            .then(a.priority.cmp(&b.priority))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    }
}
