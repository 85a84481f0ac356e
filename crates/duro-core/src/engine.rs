//! Convergence engine
//!
//! One pass takes the full current set of `DashboardApp` resources and makes
//! the world match it:
//! - assembles the apps document
//! - publishes it to the config object if its hash changed
//! - marks every resource ready

use crate::error::{OperatorError, StoreError};
use crate::events::{EventReason, EventSink, PassEvent};
use crate::outcome::{ArtifactWrite, FailureStage, PassOutcome, PassReport, StatusFailure};
use crate::store::{ArtifactStore, ResourceStore};
use chrono::Utc;
use duro_assembler::{Assembler, Assembly};
use duro_model::{validate_all, ConfigObject, ContentHash, DashboardApp, ObjectKey, StatusPatch};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Drives passes against the configured stores
pub struct ConvergenceEngine {
    /// Source of resources, target of status patches
    resources: Arc<dyn ResourceStore>,
    /// Holder of the apps config object
    artifacts: Arc<dyn ArtifactStore>,
    /// Operator-visible events
    events: Arc<dyn EventSink>,
    /// Pure document assembly
    assembler: Assembler,
    /// Location of the apps config object
    artifact_key: ObjectKey,
}

impl std::fmt::Debug for ConvergenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvergenceEngine")
            .field("assembler", &self.assembler)
            .field("artifact_key", &self.artifact_key)
            .finish_non_exhaustive()
    }
}

impl ConvergenceEngine {
    /// Create an engine with the default category order
    #[must_use]
    pub fn new(
        resources: Arc<dyn ResourceStore>,
        artifacts: Arc<dyn ArtifactStore>,
        events: Arc<dyn EventSink>,
        artifact_key: ObjectKey,
    ) -> Self {
        Self {
            resources,
            artifacts,
            events,
            assembler: Assembler::default(),
            artifact_key,
        }
    }

    /// With a custom assembler
    #[must_use]
    pub fn with_assembler(mut self, assembler: Assembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// Location of the apps config object
    #[inline]
    #[must_use]
    pub fn artifact_key(&self) -> &ObjectKey {
        &self.artifact_key
    }

    /// List every resource and run a pass over them
    pub async fn reconcile(&self) -> PassReport {
        self.reconcile_traced(Uuid::new_v4()).await
    }

    /// [`reconcile`](Self::reconcile) under a caller-chosen trace id
    pub async fn reconcile_traced(&self, trace_id: Uuid) -> PassReport {
        let span = tracing::info_span!("pass", trace_id = %trace_id);
        let outcome = async {
            tracing::debug!("Starting reconciliation");
            match self.resources.list().await {
                Ok(apps) => self.converge(trace_id, &apps).await,
                Err(e) => {
                    let error = OperatorError::classified("failed to list DashboardApps", e);
                    tracing::error!(error = %error, kind = %error.kind(), "Listing failed");
                    PassOutcome::Failed {
                        stage: FailureStage::List,
                        error,
                    }
                }
            }
        }
        .instrument(span)
        .await;

        PassReport { trace_id, outcome }
    }

    /// Run one pass over an already-listed resource collection
    ///
    /// # Workflow
    /// 1. Validate and assemble the document (empty input is a no-op)
    /// 2. Hash the document
    /// 3. Create, update or leave the config object
    /// 4. Patch every resource's status, collecting failures
    /// 5. Emit one event describing the outcome
    pub async fn run_pass(&self, apps: &[DashboardApp]) -> PassReport {
        let trace_id = Uuid::new_v4();
        let outcome = self
            .converge(trace_id, apps)
            .instrument(tracing::info_span!("pass", trace_id = %trace_id))
            .await;
        PassReport { trace_id, outcome }
    }

    async fn converge(&self, trace_id: Uuid, apps: &[DashboardApp]) -> PassOutcome {
        if apps.is_empty() {
            tracing::info!("No DashboardApp resources found, skipping reconciliation");
            return PassOutcome::Idle;
        }

        let assembly = match self.assemble(apps) {
            Ok(assembly) => assembly,
            Err(error) => {
                tracing::error!(error = %error, kind = %error.kind(), "Assembly failed");
                let resource = error.context().get("resource").map(str::to_string);
                self.emit(
                    PassEvent::new(trace_id, EventReason::AssemblyFailed, error.to_string())
                        .with_resource(resource),
                )
                .await;
                return PassOutcome::Failed {
                    stage: FailureStage::Assembly,
                    error,
                };
            }
        };

        let hash = assembly.hash();
        let write = match self.publish(&assembly.document, &hash).await {
            Ok(write) => write,
            Err(error) => {
                tracing::error!(error = %error, kind = %error.kind(), "Config update failed");
                self.emit(PassEvent::new(
                    trace_id,
                    EventReason::ConfigUpdateFailed,
                    format!("Failed to update duro apps config: {error}"),
                ))
                .await;
                return PassOutcome::Failed {
                    stage: FailureStage::Artifact,
                    error,
                };
            }
        };

        let app_count = assembly.len();
        let failures = self.update_statuses(apps, &hash).await;

        if failures.is_empty() {
            tracing::info!(app_count, hash = %hash.short(), "Reconciliation completed successfully");
            self.emit(PassEvent::new(
                trace_id,
                EventReason::Synced,
                format!("Successfully assembled {app_count} dashboard apps"),
            ))
            .await;
            return PassOutcome::Synced {
                app_count,
                hash,
                write,
            };
        }

        tracing::info!(failed_count = failures.len(), "Some status updates failed, requeueing");
        let first = &failures[0];
        self.emit(
            PassEvent::new(
                trace_id,
                EventReason::StatusUpdateFailed,
                format!(
                    "{} of {} status updates failed, first {}: {}",
                    failures.len(),
                    apps.len(),
                    first.resource,
                    first.error
                ),
            )
            .with_resource(Some(first.resource.clone())),
        )
        .await;

        PassOutcome::Partial {
            app_count,
            hash,
            write,
            failures,
        }
    }

    /// Validate declared fields, then assemble
    fn assemble(&self, apps: &[DashboardApp]) -> Result<Assembly, OperatorError> {
        validate_all(apps).map_err(|e| {
            let resource = e.resource().unwrap_or_default().to_string();
            OperatorError::permanent("invalid DashboardApp", e).with_context("resource", resource)
        })?;

        self.assembler
            .assemble(apps)
            .map_err(|e| OperatorError::permanent("failed to assemble apps document", e))
    }

    /// Write the document only when the stored hash differs
    async fn publish(&self, body: &str, hash: &ContentHash) -> Result<ArtifactWrite, OperatorError> {
        let key = &self.artifact_key;
        let store_error = |message: &str, e: StoreError| {
            OperatorError::classified(message, e).with_context("object", key.to_string())
        };

        let existing = self
            .artifacts
            .get(key)
            .await
            .map_err(|e| store_error("failed to read duro apps config", e))?;

        match existing {
            None => {
                tracing::info!(name = %key, hash = %hash, "Creating duro apps config");
                self.artifacts
                    .create(ConfigObject::for_apps(key, body, hash))
                    .await
                    .map_err(|e| store_error("failed to create duro apps config", e))?;
                Ok(ArtifactWrite::Created)
            }
            Some(object) if hash.matches_tag(object.config_hash()) => {
                tracing::debug!(name = %key, "Duro apps config unchanged (hash match), skipping update");
                Ok(ArtifactWrite::Unchanged)
            }
            Some(mut object) => {
                object.set_apps(body, hash);
                tracing::info!(name = %key, hash = %hash, "Updating duro apps config");
                self.artifacts
                    .update(object)
                    .await
                    .map_err(|e| store_error("failed to update duro apps config", e))?;
                Ok(ArtifactWrite::Updated)
            }
        }
    }

    /// Patch every resource; one failure never stops the others
    async fn update_statuses(&self, apps: &[DashboardApp], hash: &ContentHash) -> Vec<StatusFailure> {
        let patch = StatusPatch::synced(
            Utc::now(),
            format!("Published in {} ({})", self.artifact_key, hash.short()),
        );

        let mut failures = Vec::new();
        for app in apps {
            match self.resources.update_status(app.name(), &patch).await {
                Ok(()) => tracing::debug!(app = %app.name(), "Status updated"),
                Err(error) => {
                    tracing::error!(app = %app.name(), error = %error, "Failed to update DashboardApp status");
                    failures.push(StatusFailure {
                        resource: app.name().to_string(),
                        error,
                    });
                }
            }
        }
        failures
    }

    async fn emit(&self, event: PassEvent) {
        self.events.record(event).await;
    }
}
