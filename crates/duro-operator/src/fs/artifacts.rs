//! Config objects stored as JSON files

use super::{io_error, is_path_component, write_atomic};
use async_trait::async_trait;
use duro_core::{ArtifactStore, StoreError};
use duro_model::{ConfigObject, ObjectKey};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Artifact store rooted at a directory
///
/// `<root>/<namespace>/<name>.json` holds the whole object. Its data keys
/// are also written to `<root>/<namespace>/<name>/<key>` for consumers that
/// read plain files.
#[derive(Debug)]
pub struct FileArtifactStore {
    root: PathBuf,
    writes: Mutex<()>,
}

impl FileArtifactStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            writes: Mutex::new(()),
        }
    }

    /// Path of the object file
    #[must_use]
    pub fn object_path(&self, key: &ObjectKey) -> PathBuf {
        self.root.join(&key.namespace).join(format!("{}.json", key.name))
    }

    /// Directory of the projected data keys
    #[must_use]
    pub fn data_dir(&self, key: &ObjectKey) -> PathBuf {
        self.root.join(&key.namespace).join(&key.name)
    }

    async fn read(&self, key: &ObjectKey) -> Result<Option<ConfigObject>, StoreError> {
        let path = self.object_path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Invalid(format!("{}: {e}", path.display())))
    }

    async fn write(&self, mut object: ConfigObject, version: u64) -> Result<ConfigObject, StoreError> {
        object.resource_version = Some(version.to_string());
        let key = object.key();

        let body = serde_json::to_vec_pretty(&object)
            .map_err(|e| StoreError::Invalid(format!("{key}: {e}")))?;
        // The object file carries the hash, so it lands only after every
        // projected key is in place.
        self.project(&key, &object).await?;
        write_atomic(&self.object_path(&key), &body).await?;
        Ok(object)
    }

    /// Mirror data keys as files, removing keys that are gone
    async fn project(&self, key: &ObjectKey, object: &ConfigObject) -> Result<(), StoreError> {
        let dir = self.data_dir(key);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| io_error(&dir, e))?;

        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| io_error(&dir, e))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, e))? {
            let stale = entry
                .file_name()
                .to_str()
                .is_some_and(|name| !object.data.contains_key(name) && !name.ends_with(".tmp"));
            if stale {
                let path = entry.path();
                tokio::fs::remove_file(&path).await.map_err(|e| io_error(&path, e))?;
            }
        }

        for (name, value) in &object.data {
            if !is_path_component(name) {
                return Err(StoreError::Invalid(format!("{key}: data key {name:?} is not a file name")));
            }
            write_atomic(&dir.join(name), value.as_bytes()).await?;
        }
        Ok(())
    }
}

fn parse_version(key: &ObjectKey, version: Option<&str>) -> Result<u64, StoreError> {
    version
        .unwrap_or("0")
        .parse()
        .map_err(|_| StoreError::Invalid(format!("{key}: bad resourceVersion {version:?}")))
}

fn check_path_component(key: &ObjectKey) -> Result<(), StoreError> {
    if is_path_component(&key.namespace) && is_path_component(&key.name) {
        Ok(())
    } else {
        Err(StoreError::Invalid(format!("{key}: not a valid object key")))
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<ConfigObject>, StoreError> {
        check_path_component(key)?;
        self.read(key).await
    }

    async fn create(&self, object: ConfigObject) -> Result<ConfigObject, StoreError> {
        let key = object.key();
        check_path_component(&key)?;

        let _guard = self.writes.lock().await;
        if self.read(&key).await?.is_some() {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        let created = self.write(object, 1).await?;
        tracing::debug!(object = %key, path = %self.object_path(&key).display(), "Created config object");
        Ok(created)
    }

    async fn update(&self, object: ConfigObject) -> Result<ConfigObject, StoreError> {
        let key = object.key();
        check_path_component(&key)?;

        let _guard = self.writes.lock().await;
        let current = self
            .read(&key)
            .await?
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        let actual = parse_version(&key, current.resource_version.as_deref())?;
        let expected = object.resource_version.clone().unwrap_or_default();
        if expected != actual.to_string() {
            return Err(StoreError::Conflict {
                key: key.to_string(),
                expected,
                actual: actual.to_string(),
            });
        }

        let updated = self.write(object, actual + 1).await?;
        tracing::debug!(object = %key, version = actual + 1, "Updated config object");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duro_model::{ContentHash, APPS_DATA_KEY};
    use tempfile::TempDir;

    fn key() -> ObjectKey {
        ObjectKey::new("duro", "duro-apps")
    }

    fn object(body: &str) -> ConfigObject {
        ConfigObject::for_apps(&key(), body, &ContentHash::compute(body.as_bytes()))
    }

    fn read_data(dir: &Path, name: &str) -> String {
        std::fs::read_to_string(dir.join(name)).unwrap()
    }

    #[tokio::test]
    async fn create_writes_object_and_projection() {
        let dir = TempDir::new().unwrap();
        let store = FileArtifactStore::new(dir.path());

        let created = store.create(object("[]")).await.unwrap();

        assert_eq!(created.resource_version.as_deref(), Some("1"));
        assert!(dir.path().join("duro/duro-apps.json").is_file());
        assert_eq!(read_data(&store.data_dir(&key()), APPS_DATA_KEY), "[]");

        let read = store.get(&key()).await.unwrap().unwrap();
        assert_eq!(read, created);
    }

    #[tokio::test]
    async fn create_over_existing_fails() {
        let dir = TempDir::new().unwrap();
        let store = FileArtifactStore::new(dir.path());
        store.create(object("[]")).await.unwrap();

        let err = store.create(object("[1]")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn update_enforces_version() {
        let dir = TempDir::new().unwrap();
        let store = FileArtifactStore::new(dir.path());
        let created = store.create(object("[]")).await.unwrap();

        let mut next = created.clone();
        next.set_apps("[1]", &ContentHash::compute(b"[1]"));
        let updated = store.update(next).await.unwrap();
        assert_eq!(updated.resource_version.as_deref(), Some("2"));
        assert_eq!(read_data(&store.data_dir(&key()), APPS_DATA_KEY), "[1]");

        let err = store.update(created).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = FileArtifactStore::new(dir.path());

        let err = store.update(object("[]")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn projection_drops_removed_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileArtifactStore::new(dir.path());
        let mut first = object("[]");
        first.data.insert("extra.txt".to_string(), "x".to_string());
        let created = store.create(first).await.unwrap();

        let mut next = created;
        next.set_apps("[2]", &ContentHash::compute(b"[2]"));
        store.update(next).await.unwrap();

        assert!(!store.data_dir(&key()).join("extra.txt").exists());
    }

    #[tokio::test]
    async fn failed_projection_leaves_no_object_behind() {
        let dir = TempDir::new().unwrap();
        let store = FileArtifactStore::new(dir.path());
        let blocker = store.data_dir(&key()).join(APPS_DATA_KEY);
        std::fs::create_dir_all(blocker.join("occupied")).unwrap();

        let err = store.create(object("[1]")).await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(store.get(&key()).await.unwrap().is_none());

        std::fs::remove_dir_all(&blocker).unwrap();
        store.create(object("[1]")).await.unwrap();
        assert_eq!(read_data(&store.data_dir(&key()), APPS_DATA_KEY), "[1]");
    }

    #[tokio::test]
    async fn failed_projection_keeps_previous_hash() {
        let dir = TempDir::new().unwrap();
        let store = FileArtifactStore::new(dir.path());
        let created = store.create(object("[]")).await.unwrap();

        let blocker = store.data_dir(&key()).join(APPS_DATA_KEY);
        std::fs::remove_file(&blocker).unwrap();
        std::fs::create_dir_all(blocker.join("occupied")).unwrap();

        let mut next = created.clone();
        next.set_apps("[1]", &ContentHash::compute(b"[1]"));
        assert!(store.update(next).await.is_err());

        let stored = store.get(&key()).await.unwrap().unwrap();
        assert_eq!(stored.config_hash(), created.config_hash());
        assert_eq!(stored.resource_version.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn corrupt_object_is_invalid() {
        let dir = TempDir::new().unwrap();
        let store = FileArtifactStore::new(dir.path());
        std::fs::create_dir_all(dir.path().join("duro")).unwrap();
        std::fs::write(dir.path().join("duro/duro-apps.json"), "not json").unwrap();

        let err = store.get(&key()).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn path_traversal_keys_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FileArtifactStore::new(dir.path());

        let err = store.get(&ObjectKey::new("..", "etc")).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }
}
