use anyhow::Context;
use clap::Parser;
use duro_operator::cli::Args;
use duro_operator::observability::init_logging;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_format, &args.log_level);

    let (config, controller) = match duro_operator::build_controller(&args) {
        Ok(built) => built,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    tracing::info!(
        version = duro_operator::VERSION,
        max_concurrent_reconciles = config.max_concurrent_reconciles,
        reconcile_timeout_secs = config.reconcile_timeout.as_secs(),
        artifact = %config.artifact_key(),
        manifests = %args.manifests_dir.display(),
        "Starting duro-operator"
    );
    if config.enable_leader_election {
        tracing::warn!(
            lease = %config.leader_election_id,
            "Leader election requested but not supported by file-backed stores; running as the only instance"
        );
    }

    tokio::fs::create_dir_all(&args.status_dir)
        .await
        .with_context(|| format!("creating status dir {}", args.status_dir.display()))?;

    let (stop_tx, stop_rx) = watch::channel(false);
    let shutdown = tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received shutdown signal");
        if stop_tx.send(true).is_err() {
            tracing::debug!("Pass runtime already stopped");
        }
    });

    duro_operator::serve(&args, controller, stop_rx).await;
    shutdown.abort();
    Ok(())
}
