//! Command-line arguments
//!
//! Every flag can also be set through an environment variable.

use crate::observability::LogFormat;
use clap::Parser;
use duro_core::OperatorConfig;
use std::path::PathBuf;
use std::time::Duration;

/// duro-operator - publishes DashboardApp resources as the duro apps config
#[derive(Parser, Debug, Clone)]
#[command(name = "duro-operator")]
#[command(about = "Converges DashboardApp resources into the duro dashboard's apps config")]
#[command(version)]
pub struct Args {
    /// Request leader election before running passes
    #[arg(long = "leader-elect", env = "DURO_LEADER_ELECT", default_value_t = false)]
    pub leader_elect: bool,

    /// Lease name used for leader election
    #[arg(long, env = "DURO_LEADER_ELECTION_ID", default_value = "duro-operator")]
    pub leader_election_id: String,

    /// Maximum passes running at once
    #[arg(long, env = "DURO_MAX_CONCURRENT_RECONCILES", default_value_t = 3)]
    pub max_concurrent_reconciles: usize,

    /// Deadline of a single pass, in seconds
    #[arg(long = "reconcile-timeout", env = "DURO_RECONCILE_TIMEOUT", default_value_t = 300)]
    pub reconcile_timeout_secs: u64,

    /// Namespace of the apps config object
    #[arg(long, env = "DURO_NAMESPACE", default_value = "duro")]
    pub duro_namespace: String,

    /// Name of the apps config object
    #[arg(long = "duro-configmap", env = "DURO_CONFIGMAP", default_value = "duro-apps")]
    pub duro_config_map_name: String,

    /// Default log level when RUST_LOG is unset (debug, info, warn, error)
    #[arg(long, env = "DURO_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "DURO_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// Directory holding one DashboardApp manifest per file
    #[arg(long, env = "DURO_MANIFESTS_DIR", default_value = "manifests")]
    pub manifests_dir: PathBuf,

    /// Directory where observed statuses are written
    #[arg(long, env = "DURO_STATUS_DIR", default_value = "status")]
    pub status_dir: PathBuf,

    /// Root directory of published config objects
    #[arg(long, env = "DURO_ARTIFACT_ROOT", default_value = "artifacts")]
    pub artifact_root: PathBuf,

    /// How often the manifests directory is checked for changes, in seconds
    #[arg(long = "poll-interval", env = "DURO_POLL_INTERVAL", default_value_t = 5)]
    pub poll_interval_secs: u64,
}

impl Args {
    /// Operator configuration described by these arguments
    #[must_use]
    pub fn operator_config(&self) -> OperatorConfig {
        OperatorConfig::new()
            .with_leader_election(self.leader_elect, &self.leader_election_id)
            .with_max_concurrent_reconciles(self.max_concurrent_reconciles)
            .with_reconcile_timeout(Duration::from_secs(self.reconcile_timeout_secs))
            .with_artifact(&self.duro_namespace, &self.duro_config_map_name)
    }

    /// Interval of the manifests poller, never below one second
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
