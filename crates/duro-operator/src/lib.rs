//! duro operator
//!
//! Wires the convergence engine to file-backed stores and runs it until
//! interrupted.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cli;
pub mod fs;
pub mod observability;

use cli::Args;
use duro_core::{ConfigError, ConvergenceEngine, Controller, OperatorConfig, TracingEventSink, Trigger};
use fs::{FileArtifactStore, ManifestStore};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Capacity of the trigger channel
const TRIGGER_BUFFER: usize = 16;

/// Validated configuration and the controller built from it
pub fn build_controller(args: &Args) -> Result<(OperatorConfig, Controller), ConfigError> {
    let config = args.operator_config();
    config.validate()?;

    let engine = ConvergenceEngine::new(
        Arc::new(ManifestStore::new(&args.manifests_dir, &args.status_dir)),
        Arc::new(FileArtifactStore::new(&args.artifact_root)),
        Arc::new(TracingEventSink),
        config.artifact_key(),
    );
    let controller = Controller::new(engine, &config);
    Ok((config, controller))
}

/// Run passes until `shutdown` flips to true
///
/// One pass runs at start; later passes follow manifest changes and
/// requeues.
pub async fn serve(args: &Args, controller: Controller, shutdown: watch::Receiver<bool>) {
    let (tx, rx) = mpsc::channel(TRIGGER_BUFFER);
    if tx.send(Trigger::Startup).await.is_err() {
        return;
    }

    let poller = tokio::spawn({
        let dir = args.manifests_dir.clone();
        let interval = args.poll_interval();
        let tx = tx.clone();
        let shutdown = shutdown.clone();
        async move { fs::poll_for_changes(&dir, interval, tx, shutdown).await }
    });

    let stats = Arc::new(controller).run(rx, tx, shutdown).await;
    poller.abort();
    tracing::info!(passes = stats.passes, coalesced = stats.coalesced, "Operator stopped");
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
