//! In-memory stores
//!
//! Thread-safe via `RwLock`. Versions are numeric internally and exposed as
//! strings, like an API server's resource versions.

use super::{ArtifactStore, ResourceStore};
use crate::error::StoreError;
use async_trait::async_trait;
use duro_model::{ConfigObject, DashboardApp, ObjectKey, StatusPatch};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// In-memory `DashboardApp` store
#[derive(Debug, Default)]
pub struct MemoryResourceStore {
    apps: RwLock<BTreeMap<String, DashboardApp>>,
    rejected: RwLock<BTreeSet<String>>,
    version: AtomicU64,
    status_writes: AtomicUsize,
}

impl MemoryResourceStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given resources
    #[must_use]
    pub fn with_apps(apps: impl IntoIterator<Item = DashboardApp>) -> Self {
        let store = Self::new();
        for app in apps {
            store.apply(app);
        }
        store
    }

    /// Create or replace a resource, as an external actor would
    pub fn apply(&self, mut app: DashboardApp) {
        app.metadata.resource_version = Some(self.next_version());
        self.apps.write().insert(app.metadata.name.clone(), app);
    }

    /// Delete a resource
    pub fn delete(&self, name: &str) -> Option<DashboardApp> {
        self.apps.write().remove(name)
    }

    /// Current copy of a resource
    #[must_use]
    pub fn get(&self, name: &str) -> Option<DashboardApp> {
        self.apps.read().get(name).cloned()
    }

    /// Make status updates of `name` fail with a conflict
    pub fn reject_status_updates(&self, name: impl Into<String>) {
        self.rejected.write().insert(name.into());
    }

    /// Let status updates of `name` succeed again
    pub fn accept_status_updates(&self, name: &str) {
        self.rejected.write().remove(name);
    }

    /// Number of successful status writes
    #[must_use]
    pub fn status_write_count(&self) -> usize {
        self.status_writes.load(Ordering::SeqCst)
    }

    fn next_version(&self) -> String {
        (self.version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }
}

#[async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn list(&self) -> Result<Vec<DashboardApp>, StoreError> {
        Ok(self.apps.read().values().cloned().collect())
    }

    async fn update_status(&self, name: &str, patch: &StatusPatch) -> Result<(), StoreError> {
        if self.rejected.read().contains(name) {
            return Err(StoreError::Conflict {
                key: name.to_string(),
                expected: "current".to_string(),
                actual: "newer".to_string(),
            });
        }

        let version = self.next_version();
        let mut apps = self.apps.write();
        let app = apps
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(format!("DashboardApp {name}")))?;
        patch.apply_to(&mut app.status);
        app.metadata.resource_version = Some(version);
        drop(apps);

        self.status_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory config object store
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    objects: RwLock<HashMap<ObjectKey, StoredObject>>,
    writes: AtomicUsize,
}

#[derive(Debug, Clone)]
struct StoredObject {
    object: ConfigObject,
    version: u64,
}

impl StoredObject {
    fn snapshot(&self) -> ConfigObject {
        let mut object = self.object.clone();
        object.resource_version = Some(self.version.to_string());
        object
    }
}

impl MemoryArtifactStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful creates and updates
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Current copy of an object
    #[must_use]
    pub fn object(&self, key: &ObjectKey) -> Option<ConfigObject> {
        self.objects.read().get(key).map(StoredObject::snapshot)
    }

    /// Store an object without going through create/update
    pub fn seed(&self, object: ConfigObject) {
        let key = object.key();
        let mut objects = self.objects.write();
        let version = objects.get(&key).map_or(1, |o| o.version + 1);
        objects.insert(key, StoredObject { object, version });
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<ConfigObject>, StoreError> {
        Ok(self.object(key))
    }

    async fn create(&self, object: ConfigObject) -> Result<ConfigObject, StoreError> {
        let key = object.key();
        let mut objects = self.objects.write();
        if objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        let stored = StoredObject { object, version: 1 };
        let snapshot = stored.snapshot();
        objects.insert(key, stored);
        drop(objects);

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(snapshot)
    }

    async fn update(&self, object: ConfigObject) -> Result<ConfigObject, StoreError> {
        let key = object.key();
        let mut objects = self.objects.write();
        let current = objects
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        let expected = object.resource_version.clone().unwrap_or_default();
        if expected != current.version.to_string() {
            return Err(StoreError::Conflict {
                key: key.to_string(),
                expected,
                actual: current.version.to_string(),
            });
        }

        let stored = StoredObject {
            object,
            version: current.version + 1,
        };
        let snapshot = stored.snapshot();
        objects.insert(key, stored);
        drop(objects);

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(snapshot)
    }
}
