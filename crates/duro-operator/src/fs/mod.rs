//! File-backed collaborators
//!
//! Lets the operator run against a directory tree instead of a cluster API:
//! - [`ManifestStore`]: `DashboardApp` manifests in, statuses out
//! - [`FileArtifactStore`]: config objects as JSON files, with each data key
//!   projected next to it the way a mounted config map appears
//! - [`poll_for_changes`]: triggers a pass when the manifests change

mod artifacts;
mod manifests;
mod poll;

pub use artifacts::FileArtifactStore;
pub use manifests::ManifestStore;
pub use poll::{fingerprint, poll_for_changes};

use duro_core::StoreError;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Suffix source for temporary files, unique within the process
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Whether `name` can be used as a single path component
pub(crate) fn is_path_component(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}

/// Write `contents` to `path` through a temporary sibling and a rename
///
/// Every call uses its own temporary name, so concurrent writers of the
/// same path never interleave inside one file.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error(parent, e))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(
        ".{}.{}.tmp",
        std::process::id(),
        TMP_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    let tmp = Path::new(&tmp);

    tokio::fs::write(tmp, contents)
        .await
        .map_err(|e| io_error(tmp, e))?;
    if let Err(e) = tokio::fs::rename(tmp, path).await {
        if let Err(cleanup) = tokio::fs::remove_file(tmp).await {
            tracing::debug!(path = %tmp.display(), error = %cleanup, "Temporary file left behind");
        }
        return Err(io_error(path, e));
    }
    Ok(())
}

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::io(path.display().to_string(), source)
}
