//! Operator configuration

use crate::error::ConfigError;
use duro_model::ObjectKey;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed requeue delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay after a transient list, assembly or artifact failure
    pub failure_backoff: Duration,
    /// Delay after a pass where some status writes failed
    pub status_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            failure_backoff: Duration::from_secs(30),
            status_backoff: Duration::from_secs(10),
        }
    }
}

/// Operator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Whether leader election is requested
    pub enable_leader_election: bool,
    /// Lease name used for leader election
    pub leader_election_id: String,
    /// Maximum passes running at once
    pub max_concurrent_reconciles: usize,
    /// Deadline of a single pass
    pub reconcile_timeout: Duration,
    /// Namespace of the apps config object
    pub duro_namespace: String,
    /// Name of the apps config object
    pub duro_config_map_name: String,
    /// Requeue delays
    pub retry: RetryPolicy,
}

impl OperatorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With max concurrent passes
    #[inline]
    #[must_use]
    pub fn with_max_concurrent_reconciles(mut self, max: usize) -> Self {
        self.max_concurrent_reconciles = max;
        self
    }

    /// With per-pass timeout
    #[inline]
    #[must_use]
    pub fn with_reconcile_timeout(mut self, timeout: Duration) -> Self {
        self.reconcile_timeout = timeout;
        self
    }

    /// With location of the apps config object
    #[inline]
    #[must_use]
    pub fn with_artifact(mut self, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        self.duro_namespace = namespace.into();
        self.duro_config_map_name = name.into();
        self
    }

    /// With leader election toggle
    #[inline]
    #[must_use]
    pub fn with_leader_election(mut self, enabled: bool, id: impl Into<String>) -> Self {
        self.enable_leader_election = enabled;
        self.leader_election_id = id.into();
        self
    }

    /// With requeue delays
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Key of the apps config object
    #[must_use]
    pub fn artifact_key(&self) -> ObjectKey {
        ObjectKey::new(&self.duro_namespace, &self.duro_config_map_name)
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns the first violated constraint
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_reconciles < 1 {
            return Err(ConfigError::InvalidConcurrency(self.max_concurrent_reconciles));
        }
        if self.reconcile_timeout < Duration::from_secs(1) {
            return Err(ConfigError::TimeoutTooShort(self.reconcile_timeout));
        }
        if self.duro_namespace.trim().is_empty() {
            return Err(ConfigError::Missing("duroNamespace"));
        }
        if self.duro_config_map_name.trim().is_empty() {
            return Err(ConfigError::Missing("duroConfigMapName"));
        }
        if self.enable_leader_election && self.leader_election_id.trim().is_empty() {
            return Err(ConfigError::Missing("leaderElectionId"));
        }
        if self.retry.failure_backoff.is_zero() {
            return Err(ConfigError::InvalidBackoff("failure"));
        }
        if self.retry.status_backoff.is_zero() {
            return Err(ConfigError::InvalidBackoff("status"));
        }
        Ok(())
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            enable_leader_election: false,
            leader_election_id: "duro-operator".to_string(),
            max_concurrent_reconciles: 3,
            reconcile_timeout: Duration::from_secs(5 * 60),
            duro_namespace: "duro".to_string(),
            duro_config_map_name: "duro-apps".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}
