//! duro core
//!
//! Level-triggered convergence of `DashboardApp` resources into the duro
//! dashboard's apps config object.
//!
//! # Core Concepts
//!
//! - [`ConvergenceEngine`]: one pass from the full resource set to a published
//!   artifact and updated statuses
//! - [`Controller`]: runs passes on triggers under a concurrency cap and deadline
//! - [`ResourceStore`] / [`ArtifactStore`]: the external collaborators
//! - [`OperatorError`]: failures classified as transient, permanent or configuration
//!
//! # Example
//!
//! ```rust
//! use duro_core::prelude::*;
//! use std::sync::Arc;
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! runtime.block_on(async {
//!     let engine = ConvergenceEngine::new(
//!         Arc::new(MemoryResourceStore::new()),
//!         Arc::new(MemoryArtifactStore::new()),
//!         Arc::new(TracingEventSink),
//!         OperatorConfig::default().artifact_key(),
//!     );
//!     let report = engine.reconcile().await;
//!     assert!(matches!(report.outcome, PassOutcome::Idle));
//! });
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod outcome;
pub mod runtime;
pub mod store;

// Re-exports
pub use config::{OperatorConfig, RetryPolicy};
pub use engine::ConvergenceEngine;
pub use error::{classify, should_retry, ConfigError, Context, ErrorKind, OperatorError, StoreError};
pub use events::{EventReason, EventSink, EventType, PassEvent, RecordingEventSink, TracingEventSink};
pub use outcome::{Action, ArtifactWrite, FailureStage, PassOutcome, PassReport, StatusFailure};
pub use runtime::{Controller, RunStats, Trigger};
pub use store::{ArtifactStore, MemoryArtifactStore, MemoryResourceStore, ResourceStore};

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::{OperatorConfig, RetryPolicy};
    pub use crate::engine::ConvergenceEngine;
    pub use crate::error::{ErrorKind, OperatorError, StoreError};
    pub use crate::events::{EventReason, EventSink, PassEvent, RecordingEventSink, TracingEventSink};
    pub use crate::outcome::{Action, ArtifactWrite, PassOutcome, PassReport};
    pub use crate::runtime::{Controller, Trigger};
    pub use crate::store::{ArtifactStore, MemoryArtifactStore, MemoryResourceStore, ResourceStore};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
