//! Pass runtime
//!
//! Runs engine passes when triggered, bounded by:
//! - a concurrency cap (semaphore permits)
//! - a per-pass deadline; an expired pass counts as a transient failure
//!
//! Requeues re-enter through the same trigger channel, so every retry is a
//! fresh, independently timed pass.

use crate::config::{OperatorConfig, RetryPolicy};
use crate::engine::ConvergenceEngine;
use crate::error::{ErrorKind, OperatorError};
use crate::outcome::{Action, FailureStage, PassOutcome, PassReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinSet;
use uuid::Uuid;

/// Why a pass was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// First pass after start
    Startup,
    /// Resources may have changed
    Changed,
    /// Scheduled retry of an earlier pass
    Requeue,
}

/// Pass runtime around a [`ConvergenceEngine`]
#[derive(Debug)]
pub struct Controller {
    engine: Arc<ConvergenceEngine>,
    permits: Arc<Semaphore>,
    timeout: Duration,
    retry: RetryPolicy,
}

/// Statistics of the runtime loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Passes started
    pub passes: usize,
    /// Triggers merged into an already pending one
    pub coalesced: usize,
}

impl Controller {
    /// Create a controller using the limits of `config`
    #[must_use]
    pub fn new(engine: ConvergenceEngine, config: &OperatorConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            permits: Arc::new(Semaphore::new(config.max_concurrent_reconciles)),
            timeout: config.reconcile_timeout,
            retry: config.retry,
        }
    }

    /// Engine driven by this controller
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &ConvergenceEngine {
        &self.engine
    }

    /// Run one pass under the concurrency cap and deadline
    pub async fn run_pass(&self) -> (PassReport, Action) {
        let trace_id = Uuid::new_v4();

        let report = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(_permit) => match tokio::time::timeout(self.timeout, self.engine.reconcile_traced(trace_id)).await {
                Ok(report) => report,
                Err(elapsed) => {
                    let error = OperatorError::transient("reconcile deadline exceeded", elapsed)
                        .with_context("timeout_secs", self.timeout.as_secs().to_string());
                    tracing::warn!(trace_id = %trace_id, error = %error, "Pass abandoned");
                    PassReport {
                        trace_id,
                        outcome: PassOutcome::Failed {
                            stage: FailureStage::Deadline,
                            error,
                        },
                    }
                }
            },
            Err(_) => PassReport {
                trace_id,
                outcome: PassOutcome::Failed {
                    stage: FailureStage::Shutdown,
                    error: OperatorError::new(ErrorKind::Transient, "pass runtime is shutting down"),
                },
            },
        };

        let action = report.outcome.action(&self.retry);
        tracing::debug!(trace_id = %trace_id, outcome = report.outcome.label(), ?action, "Pass finished");
        (report, action)
    }

    /// Serve triggers until shutdown is signalled or every sender is gone
    ///
    /// `requeue` must feed the same channel as `triggers`. Triggers that pile
    /// up while a pass is being started are merged, since every pass reads
    /// the full state anyway.
    pub async fn run(
        self: Arc<Self>,
        mut triggers: mpsc::Receiver<Trigger>,
        requeue: mpsc::Sender<Trigger>,
        mut shutdown: watch::Receiver<bool>,
    ) -> RunStats {
        let mut stats = RunStats::default();
        let mut passes = JoinSet::new();

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Shutdown requested, stopping pass runtime");
                        break;
                    }
                }
                trigger = triggers.recv() => {
                    let Some(trigger) = trigger else { break };
                    while triggers.try_recv().is_ok() {
                        stats.coalesced += 1;
                    }
                    stats.passes += 1;
                    tracing::debug!(?trigger, "Pass triggered");

                    let controller = Arc::clone(&self);
                    let requeue = requeue.clone();
                    passes.spawn(async move {
                        let (_, action) = controller.run_pass().await;
                        if let Action::Requeue(delay) = action {
                            tokio::time::sleep(delay).await;
                            if requeue.send(Trigger::Requeue).await.is_err() {
                                tracing::debug!("Trigger channel closed, dropping requeue");
                            }
                        }
                    });
                }
                Some(joined) = passes.join_next(), if !passes.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Pass task failed");
                    }
                }
            }
        }

        self.permits.close();
        passes.shutdown().await;
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::events::RecordingEventSink;
    use crate::store::{MemoryArtifactStore, MemoryResourceStore, ResourceStore};
    use async_trait::async_trait;
    use duro_model::{DashboardApp, DashboardAppSpec, ObjectKey, StatusPatch};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn app(name: &str) -> DashboardApp {
        DashboardApp::new(
            name,
            DashboardAppSpec {
                name: name.to_uppercase(),
                url: format!("https://{name}.example.com"),
                category: "media".to_string(),
                icon: "<svg/>".to_string(),
                groups: vec!["users".to_string()],
                priority: 0,
            },
        )
    }

    /// Lists slowly and tracks how many lists overlap
    #[derive(Default)]
    struct SlowStore {
        delay: Duration,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ResourceStore for SlowStore {
        async fn list(&self) -> Result<Vec<DashboardApp>, StoreError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn update_status(&self, _: &str, _: &StatusPatch) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn engine(resources: Arc<dyn ResourceStore>, artifacts: Arc<MemoryArtifactStore>) -> ConvergenceEngine {
        ConvergenceEngine::new(
            resources,
            artifacts,
            Arc::new(RecordingEventSink::new()),
            ObjectKey::new("duro", "duro-apps"),
        )
    }

    #[tokio::test]
    async fn pass_past_deadline_is_transient() {
        let store = Arc::new(SlowStore {
            delay: Duration::from_secs(5),
            ..SlowStore::default()
        });
        let config = OperatorConfig::default().with_reconcile_timeout(Duration::from_millis(20));
        let controller = Controller::new(engine(store, Arc::new(MemoryArtifactStore::new())), &config);

        let (report, action) = controller.run_pass().await;

        match report.outcome {
            PassOutcome::Failed { stage, ref error } => {
                assert_eq!(stage, FailureStage::Deadline);
                assert_eq!(error.kind(), ErrorKind::Transient);
                assert_eq!(error.context().get("timeout_secs"), Some("0"));
            }
            ref other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(action, Action::Requeue(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn pass_after_shutdown_is_not_a_deadline() {
        let store = Arc::new(SlowStore::default());
        let controller = Controller::new(engine(store, Arc::new(MemoryArtifactStore::new())), &OperatorConfig::default());
        controller.permits.close();

        let (report, action) = controller.run_pass().await;

        match report.outcome {
            PassOutcome::Failed { stage, ref error } => {
                assert_eq!(stage, FailureStage::Shutdown);
                assert_eq!(error.kind(), ErrorKind::Transient);
            }
            ref other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(matches!(action, Action::Requeue(_)));
    }

    #[tokio::test]
    async fn concurrent_passes_respect_cap() {
        let store = Arc::new(SlowStore {
            delay: Duration::from_millis(30),
            ..SlowStore::default()
        });
        let config = OperatorConfig::default().with_max_concurrent_reconciles(2);
        let controller = Arc::new(Controller::new(
            engine(Arc::clone(&store) as Arc<dyn ResourceStore>, Arc::new(MemoryArtifactStore::new())),
            &config,
        ));

        let mut passes = JoinSet::new();
        for _ in 0..6 {
            let controller = Arc::clone(&controller);
            passes.spawn(async move { controller.run_pass().await.1 });
        }
        while let Some(action) = passes.join_next().await {
            assert_eq!(action.unwrap(), Action::AwaitChange);
        }

        assert!(store.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn run_serves_triggers_until_shutdown() {
        let resources = Arc::new(MemoryResourceStore::with_apps([app("plex")]));
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let controller = Arc::new(Controller::new(
            engine(Arc::clone(&resources) as Arc<dyn ResourceStore>, Arc::clone(&artifacts)),
            &OperatorConfig::default(),
        ));

        let (tx, rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);
        tx.send(Trigger::Startup).await.unwrap();
        let runner = tokio::spawn(Arc::clone(&controller).run(rx, tx.clone(), stop_rx));

        for _ in 0..100 {
            if resources.status_write_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(artifacts.write_count(), 1);
        assert!(resources.get("plex").unwrap().status.ready);

        stop_tx.send(true).unwrap();
        let stats = runner.await.unwrap();
        assert_eq!(stats.passes, 1);
    }

    #[tokio::test]
    async fn run_stops_when_senders_are_gone() {
        let controller = Arc::new(Controller::new(
            engine(Arc::new(MemoryResourceStore::new()), Arc::new(MemoryArtifactStore::new())),
            &OperatorConfig::default(),
        ));
        let (tx, rx) = mpsc::channel(8);
        let (_stop_tx, stop_rx) = watch::channel(false);

        // requeue sender is a separate, never-used channel so dropping `tx` closes `rx`
        let (requeue, _requeue_rx) = mpsc::channel(1);
        tx.send(Trigger::Changed).await.unwrap();
        tx.send(Trigger::Changed).await.unwrap();
        drop(tx);

        let stats = controller.run(rx, requeue, stop_rx).await;
        assert_eq!(stats.passes + stats.coalesced, 2);
    }
}
