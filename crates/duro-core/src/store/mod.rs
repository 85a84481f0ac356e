//! Store collaborators
//!
//! The engine talks to two stores:
//! - a [`ResourceStore`] listing every `DashboardApp` and accepting status patches
//! - an [`ArtifactStore`] holding the single apps config object
//!
//! Both are expected to detect concurrent writers themselves (resource
//! versions); the engine never locks.

use crate::error::StoreError;
use async_trait::async_trait;
use duro_model::{ConfigObject, DashboardApp, ObjectKey, StatusPatch};

mod memory;

pub use memory::{MemoryArtifactStore, MemoryResourceStore};

/// Source of `DashboardApp` resources
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// List every resource, cluster-wide
    async fn list(&self) -> Result<Vec<DashboardApp>, StoreError>;

    /// Apply a status patch to one resource
    async fn update_status(&self, name: &str, patch: &StatusPatch) -> Result<(), StoreError>;
}

/// Holder of the apps config object
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Read an object; `Ok(None)` when it does not exist
    async fn get(&self, key: &ObjectKey) -> Result<Option<ConfigObject>, StoreError>;

    /// Create an object that must not exist yet
    async fn create(&self, object: ConfigObject) -> Result<ConfigObject, StoreError>;

    /// Replace an object, checking its resource version
    async fn update(&self, object: ConfigObject) -> Result<ConfigObject, StoreError>;
}
