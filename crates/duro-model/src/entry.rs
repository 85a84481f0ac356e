//! Derived dashboard entries
//!
//! An [`Entry`] is what the dashboard actually reads: one element of the
//! published `apps.json` array. Field order here is the key order of the
//! serialized document and must not change.

use crate::resource::DashboardApp;
use serde::{Deserialize, Serialize};

/// Priority used when a resource leaves it unset
pub const DEFAULT_PRIORITY: i32 = 100;

/// Lowest priority a derived entry can carry
pub const MIN_PRIORITY: i32 = 1;

/// One application in the published document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Source resource name
    pub id: String,
    /// Display name
    pub name: String,
    /// Application URL
    pub url: String,
    /// Category wire name
    pub category: String,
    /// Raw SVG markup
    pub icon: String,
    /// Visibility groups
    pub groups: Vec<String>,
    /// Effective priority, never unset
    pub priority: i32,
}

impl Entry {
    /// Derive an entry from a resource, defaulting the priority
    #[must_use]
    pub fn from_app(app: &DashboardApp) -> Self {
        let spec = &app.spec;
        Self {
            id: app.metadata.name.clone(),
            name: spec.name.clone(),
            url: spec.url.clone(),
            category: spec.category.clone(),
            icon: spec.icon.clone(),
            groups: spec.groups.clone(),
            priority: effective_priority(spec.priority),
        }
    }
}

impl From<&DashboardApp> for Entry {
    fn from(app: &DashboardApp) -> Self {
        Self::from_app(app)
    }
}

/// Resolve the declared priority, mapping the unset sentinel to the default
#[inline]
#[must_use]
pub const fn effective_priority(declared: i32) -> i32 {
    if declared == 0 {
        DEFAULT_PRIORITY
    } else {
        declared
    }
}
