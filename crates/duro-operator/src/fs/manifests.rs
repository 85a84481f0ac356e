//! `DashboardApp` manifests read from a directory

use super::{io_error, is_path_component, write_atomic};
use async_trait::async_trait;
use duro_core::{ResourceStore, StoreError};
use duro_model::{DashboardApp, DashboardAppStatus, StatusPatch};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Manifest formats, by file extension
const MANIFEST_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Resource store over a manifests directory
///
/// Each `*.yaml`, `*.yml` or `*.json` file holds one resource. Observed
/// status lives apart from the manifests, as `<status-dir>/<name>.json`,
/// and is merged back on list.
#[derive(Debug)]
pub struct ManifestStore {
    manifests_dir: PathBuf,
    status_dir: PathBuf,
    known: RwLock<BTreeSet<String>>,
}

impl ManifestStore {
    /// Create a store over the given directories
    pub fn new(manifests_dir: impl Into<PathBuf>, status_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifests_dir: manifests_dir.into(),
            status_dir: status_dir.into(),
            known: RwLock::new(BTreeSet::new()),
        }
    }

    /// Directory holding the manifests
    #[must_use]
    pub fn manifests_dir(&self) -> &Path {
        &self.manifests_dir
    }

    fn status_path(&self, name: &str) -> PathBuf {
        self.status_dir.join(format!("{name}.json"))
    }

    async fn manifest_paths(&self) -> Result<Vec<PathBuf>, StoreError> {
        let dir = &self.manifests_dir;
        let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| io_error(dir, e))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(dir, e))? {
            let path = entry.path();
            if is_manifest(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    async fn read_status(&self, name: &str) -> Result<DashboardAppStatus, StoreError> {
        let path = self.status_path(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(status) => Ok(status),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Unreadable status, starting over");
                    Ok(DashboardAppStatus::default())
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(DashboardAppStatus::default()),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}

fn is_manifest(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| MANIFEST_EXTENSIONS.contains(&ext))
}

fn parse_manifest(path: &Path, bytes: &[u8]) -> Result<DashboardApp, StoreError> {
    let parsed = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_slice(bytes).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_slice(bytes).map_err(|e| e.to_string())
    };
    parsed.map_err(|e| StoreError::Invalid(format!("{}: {e}", path.display())))
}

#[async_trait]
impl ResourceStore for ManifestStore {
    async fn list(&self) -> Result<Vec<DashboardApp>, StoreError> {
        let mut apps: BTreeMap<String, DashboardApp> = BTreeMap::new();

        for path in self.manifest_paths().await? {
            let bytes = tokio::fs::read(&path).await.map_err(|e| io_error(&path, e))?;
            let mut app = parse_manifest(&path, &bytes)?;
            let name = app.name().to_string();
            if !is_path_component(&name) {
                return Err(StoreError::Invalid(format!(
                    "DashboardApp name {name:?} cannot name a status file ({})",
                    path.display()
                )));
            }
            if apps.contains_key(&name) {
                return Err(StoreError::Invalid(format!(
                    "DashboardApp {name} is declared more than once ({})",
                    path.display()
                )));
            }
            app.status = self.read_status(&name).await?;
            apps.insert(name, app);
        }

        *self.known.write() = apps.keys().cloned().collect();
        tracing::debug!(count = apps.len(), dir = %self.manifests_dir.display(), "Listed manifests");
        Ok(apps.into_values().collect())
    }

    async fn update_status(&self, name: &str, patch: &StatusPatch) -> Result<(), StoreError> {
        if !is_path_component(name) {
            return Err(StoreError::Invalid(format!("DashboardApp name {name:?}")));
        }
        if !self.known.read().contains(name) {
            return Err(StoreError::NotFound(format!("DashboardApp {name}")));
        }

        let mut status = self.read_status(name).await?;
        patch.apply_to(&mut status);
        let body = serde_json::to_vec_pretty(&status)
            .map_err(|e| StoreError::Invalid(format!("status of {name}: {e}")))?;
        write_atomic(&self.status_path(name), &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    const PLEX: &str = r#"
apiVersion: dashboard.homelab.io/v1alpha1
kind: DashboardApp
metadata:
  name: plex
spec:
  name: Plex
  url: https://plex.example.com
  category: media
  icon: "<svg/>"
  groups: [media-users]
  priority: 10
"#;

    const GITEA: &str = r#"{
  "apiVersion": "dashboard.homelab.io/v1alpha1",
  "kind": "DashboardApp",
  "metadata": {"name": "gitea"},
  "spec": {
    "name": "Gitea",
    "url": "https://git.example.com",
    "category": "development",
    "icon": "<svg/>",
    "groups": ["devs"]
  }
}"#;

    fn store(dir: &TempDir) -> ManifestStore {
        let manifests = dir.path().join("manifests");
        std::fs::create_dir_all(&manifests).unwrap();
        ManifestStore::new(manifests, dir.path().join("status"))
    }

    #[tokio::test]
    async fn lists_yaml_and_json_manifests() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        std::fs::write(store.manifests_dir().join("plex.yaml"), PLEX).unwrap();
        std::fs::write(store.manifests_dir().join("gitea.json"), GITEA).unwrap();
        std::fs::write(store.manifests_dir().join("README.md"), "ignored").unwrap();

        let apps = store.list().await.unwrap();
        let names: Vec<&str> = apps.iter().map(DashboardApp::name).collect();
        assert_eq!(names, ["gitea", "plex"]);
        assert_eq!(apps[0].spec.priority, 0);
    }

    #[tokio::test]
    async fn duplicate_names_are_invalid() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        std::fs::write(store.manifests_dir().join("a.yaml"), PLEX).unwrap();
        std::fs::write(store.manifests_dir().join("b.yml"), PLEX).unwrap();

        let err = store.list().await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn malformed_manifest_is_invalid() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        std::fs::write(store.manifests_dir().join("bad.yaml"), "spec: [unclosed").unwrap();

        let err = store.list().await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn missing_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::new(dir.path().join("absent"), dir.path().join("status"));

        let err = store.list().await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[tokio::test]
    async fn status_round_trips_through_status_dir() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        std::fs::write(store.manifests_dir().join("plex.yaml"), PLEX).unwrap();
        store.list().await.unwrap();

        store
            .update_status("plex", &StatusPatch::synced(Utc::now(), "published"))
            .await
            .unwrap();

        assert!(dir.path().join("status/plex.json").is_file());
        let apps = store.list().await.unwrap();
        assert!(apps[0].status.ready);
        assert_eq!(apps[0].status.conditions[0].message, "published");
    }

    #[tokio::test]
    async fn status_of_unlisted_resource_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let err = store
            .update_status("ghost", &StatusPatch::synced(Utc::now(), "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn unreadable_status_starts_over() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        std::fs::write(store.manifests_dir().join("plex.yaml"), PLEX).unwrap();
        std::fs::create_dir_all(dir.path().join("status")).unwrap();
        std::fs::write(dir.path().join("status/plex.json"), "").unwrap();

        let apps = store.list().await.unwrap();
        assert_eq!(apps[0].status, DashboardAppStatus::default());

        store
            .update_status("plex", &StatusPatch::synced(Utc::now(), "published"))
            .await
            .unwrap();
        assert!(store.list().await.unwrap()[0].status.ready);
    }

    #[tokio::test]
    async fn names_escaping_status_dir_are_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        std::fs::write(store.manifests_dir().join("evil.yaml"), PLEX.replace("name: plex", "name: ../escaped")).unwrap();

        let err = store.list().await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));

        let err = store
            .update_status("../escaped", &StatusPatch::synced(Utc::now(), "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        assert!(!dir.path().join("escaped.json").exists());
    }
}
