//! Concurrent Pass Tests
//!
//! Two engines racing on one config object. The store's create and version
//! checks decide the race; the loser fails transient and converges on rerun.
//!
use async_trait::async_trait;
use duro_core::prelude::*;
use duro_core::FailureStage;
use duro_model::{ConfigObject, ContentHash, DashboardApp, ObjectKey};
use duro_test_utils::{app, artifact_key, media_trio, mixed_trio};
use std::error::Error as _;
use std::sync::Arc;

/// Hands control back to the runtime after every read, so concurrent
/// passes both read before either writes
struct YieldingArtifacts(Arc<MemoryArtifactStore>);

#[async_trait]
impl ArtifactStore for YieldingArtifacts {
    async fn get(&self, key: &ObjectKey) -> Result<Option<ConfigObject>, StoreError> {
        let object = self.0.get(key).await;
        tokio::task::yield_now().await;
        object
    }

    async fn create(&self, object: ConfigObject) -> Result<ConfigObject, StoreError> {
        self.0.create(object).await
    }

    async fn update(&self, object: ConfigObject) -> Result<ConfigObject, StoreError> {
        self.0.update(object).await
    }
}

fn engine(apps: Vec<DashboardApp>, artifacts: &Arc<YieldingArtifacts>) -> ConvergenceEngine {
    ConvergenceEngine::new(
        Arc::new(MemoryResourceStore::with_apps(apps)),
        Arc::clone(artifacts) as _,
        Arc::new(RecordingEventSink::new()),
        artifact_key(),
    )
}

fn store_error(report: &PassReport) -> &StoreError {
    let PassOutcome::Failed { stage, error } = &report.outcome else {
        panic!("expected a failed pass, got {:?}", report.outcome);
    };
    assert_eq!(*stage, FailureStage::Artifact);
    assert_eq!(error.kind(), ErrorKind::Transient);
    error
        .source()
        .and_then(|source| source.downcast_ref::<StoreError>())
        .expect("store error as cause")
}

fn assert_consistent(store: &MemoryArtifactStore) -> ContentHash {
    let object = store.object(&artifact_key()).unwrap();
    let hash = ContentHash::compute(object.apps_body().unwrap().as_bytes());
    assert!(hash.matches_tag(object.config_hash()));
    hash
}

#[tokio::test]
async fn test_racing_creates_leave_one_winner() {
    let store = Arc::new(MemoryArtifactStore::new());
    let artifacts = Arc::new(YieldingArtifacts(Arc::clone(&store)));
    let first = engine(media_trio(), &artifacts);
    let second = engine(mixed_trio(), &artifacts);

    let (a, b) = tokio::join!(first.reconcile(), second.reconcile());

    assert_eq!(a.outcome.artifact_write(), Some(ArtifactWrite::Created));
    assert!(matches!(store_error(&b), StoreError::AlreadyExists(_)));
    assert_eq!(store.write_count(), 1);
    assert_consistent(&store);

    let rerun = second.reconcile().await;
    assert_eq!(rerun.outcome.artifact_write(), Some(ArtifactWrite::Updated));
    let PassOutcome::Synced { hash, .. } = rerun.outcome else {
        panic!("rerun should sync");
    };
    assert_eq!(assert_consistent(&store), hash);
}

#[tokio::test]
async fn test_racing_updates_conflict() {
    let store = Arc::new(MemoryArtifactStore::new());
    store.seed(ConfigObject::for_apps(&artifact_key(), "[]", &ContentHash::compute(b"[]")));
    let artifacts = Arc::new(YieldingArtifacts(Arc::clone(&store)));
    let first = engine(media_trio(), &artifacts);
    let second = engine(vec![app("solo", "Solo", "admin", 5)], &artifacts);

    let (a, b) = tokio::join!(first.reconcile(), second.reconcile());

    assert_eq!(a.outcome.artifact_write(), Some(ArtifactWrite::Updated));
    assert!(matches!(store_error(&b), StoreError::Conflict { .. }));
    assert_consistent(&store);

    let rerun = second.reconcile().await;
    let PassOutcome::Synced { hash, write, .. } = rerun.outcome else {
        panic!("rerun should sync");
    };
    assert_eq!(write, ArtifactWrite::Updated);
    assert_eq!(assert_consistent(&store), hash);
    assert_eq!(store.object(&artifact_key()).unwrap().resource_version.as_deref(), Some("3"));
}
