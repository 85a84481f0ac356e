//! duro model
//!
//! Types shared by every stage of a convergence pass.
//!
//! # Core Concepts
//!
//! - [`DashboardApp`]: the declared source resource and its observed status
//! - [`Entry`]: the derived, defaulted form published to the dashboard
//! - [`ConfigObject`]: the stored key/value object holding `apps.json`
//! - [`ContentHash`]: SHA-256 integrity tag of the published document
//!
//! # Example
//!
//! ```rust
//! use duro_model::{DashboardApp, DashboardAppSpec, Entry};
//!
//! let app = DashboardApp::new(
//!     "plex",
//!     DashboardAppSpec {
//!         name: "Plex".into(),
//!         url: "https://plex.example.com".into(),
//!         category: "media".into(),
//!         icon: "<svg/>".into(),
//!         groups: vec!["media-users".into()],
//!         priority: 0,
//!     },
//! );
//! assert_eq!(Entry::from_app(&app).priority, 100);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod artifact;
mod category;
mod entry;
mod hash;
mod resource;
mod validation;

// Re-exports
pub use artifact::{
    ConfigObject, ObjectKey, APPS_DATA_KEY, CONFIG_HASH_ANNOTATION, MANAGED_BY, MANAGED_BY_LABEL,
};
pub use category::{Category, UnknownCategory};
pub use entry::{effective_priority, Entry, DEFAULT_PRIORITY, MIN_PRIORITY};
pub use hash::{ContentHash, HashError};
pub use resource::{
    Condition, ConditionStatus, DashboardApp, DashboardAppSpec, DashboardAppStatus, ObjectMeta,
    StatusPatch, API_VERSION, CONDITION_READY, KIND,
};
pub use validation::{is_known_category, validate, validate_all, ValidationError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
