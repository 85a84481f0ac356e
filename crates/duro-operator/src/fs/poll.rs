//! Change detection for the manifests directory

use super::io_error;
use duro_core::{StoreError, Trigger};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};
use tokio::sync::{mpsc, watch};

/// SHA-256 over the names, sizes and modification times of a directory's files
///
/// # Errors
/// Returns an IO error when the directory cannot be read
pub async fn fingerprint(dir: &Path) -> Result<String, StoreError> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| io_error(dir, e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(dir, e))? {
        let path = entry.path();
        let meta = entry.metadata().await.map_err(|e| io_error(&path, e))?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_nanos());
        files.push((entry.file_name(), meta.len(), modified));
    }
    files.sort();

    let mut hasher = Sha256::new();
    for (name, len, modified) in &files {
        hasher.update(name.as_encoded_bytes());
        hasher.update([0]);
        hasher.update(len.to_le_bytes());
        hasher.update(modified.to_le_bytes());
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Send [`Trigger::Changed`] whenever the directory's fingerprint changes
///
/// Returns when shutdown is signalled or the trigger channel closes.
pub async fn poll_for_changes(
    dir: &Path,
    interval: Duration,
    triggers: mpsc::Sender<Trigger>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut last = fingerprint(dir).await.ok();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let current = match fingerprint(dir).await {
                    Ok(current) => Some(current),
                    Err(e) => {
                        tracing::warn!(error = %e, "Cannot read manifests directory");
                        None
                    }
                };
                if current == last {
                    continue;
                }
                last = current;
                tracing::debug!(dir = %dir.display(), "Manifests changed");
                if triggers.send(Trigger::Changed).await.is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn fingerprint_tracks_content() {
        let dir = TempDir::new().unwrap();
        let empty = fingerprint(dir.path()).await.unwrap();
        assert_eq!(empty, fingerprint(dir.path()).await.unwrap());

        std::fs::write(dir.path().join("plex.yaml"), "a").unwrap();
        let one = fingerprint(dir.path()).await.unwrap();
        assert_ne!(empty, one);

        std::fs::write(dir.path().join("plex.yaml"), "longer").unwrap();
        assert_ne!(one, fingerprint(dir.path()).await.unwrap());
    }

    #[tokio::test]
    async fn fingerprint_of_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        assert!(fingerprint(&dir.path().join("absent")).await.is_err());
    }

    #[tokio::test]
    async fn poller_triggers_on_change_and_stops() {
        let dir = TempDir::new().unwrap();
        let (tx, mut rx) = mpsc::channel(4);
        let (stop_tx, stop_rx) = watch::channel(false);
        let path = dir.path().to_path_buf();
        let poller = tokio::spawn(async move {
            poll_for_changes(&path, Duration::from_millis(10), tx, stop_rx).await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        std::fs::write(dir.path().join("plex.yaml"), "spec").unwrap();
        let trigger = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(trigger, Some(Trigger::Changed));

        stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), poller).await.unwrap().unwrap();
    }
}
