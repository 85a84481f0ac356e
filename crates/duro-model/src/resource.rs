//! The `DashboardApp` source resource
//!
//! Declared fields live in [`DashboardAppSpec`] and are owned by whoever
//! applies the resource. Observed fields live in [`DashboardAppStatus`] and
//! are only ever changed through a [`StatusPatch`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// API group/version of the resource
pub const API_VERSION: &str = "dashboard.homelab.io/v1alpha1";

/// Kind of the resource
pub const KIND: &str = "DashboardApp";

/// Condition type set on every synced resource
pub const CONDITION_READY: &str = "Ready";

/// Identity and bookkeeping of a stored object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Cluster-unique name
    pub name: String,
    /// Opaque version token used for optimistic concurrency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

/// A declared dashboard application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardApp {
    /// API group/version
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Resource kind
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Object identity
    pub metadata: ObjectMeta,
    /// Declared state
    pub spec: DashboardAppSpec,
    /// Observed state
    #[serde(default)]
    pub status: DashboardAppStatus,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND.to_string()
}

impl DashboardApp {
    /// Create a resource with empty status
    #[must_use]
    pub fn new(name: impl Into<String>, spec: DashboardAppSpec) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ObjectMeta {
                name: name.into(),
                resource_version: None,
            },
            spec,
            status: DashboardAppStatus::default(),
        }
    }

    /// Resource name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

/// Declared fields of a dashboard application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAppSpec {
    /// Display name of the application
    pub name: String,
    /// Application URL
    pub url: String,
    /// Dashboard category (media, ai, productivity, development, admin)
    pub category: String,
    /// Raw SVG markup for the icon
    pub icon: String,
    /// Groups allowed to see the app (OR logic)
    #[serde(default)]
    pub groups: Vec<String>,
    /// Sort order within a category, lower first; 0 means unset
    #[serde(default, skip_serializing_if = "is_zero")]
    pub priority: i32,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &i32) -> bool {
    *value == 0
}

/// Observed state, written by the operator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAppStatus {
    /// Whether the app is part of the published artifact
    #[serde(default)]
    pub ready: bool,
    /// Last successful sync
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Structured conditions, at most one per type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Status of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    /// Condition holds
    True,
    /// Condition does not hold
    False,
    /// Not determined
    Unknown,
}

/// A structured status condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type, e.g. `Ready`
    #[serde(rename = "type")]
    pub type_: String,
    /// Current status
    pub status: ConditionStatus,
    /// Machine-readable reason
    pub reason: String,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
    /// When `status` last changed
    pub last_transition_time: DateTime<Utc>,
}

/// The change one pass applies to a resource's status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPatch {
    /// New ready flag
    pub ready: bool,
    /// New last-synced timestamp
    pub last_synced_at: DateTime<Utc>,
    /// Condition to upsert by type
    pub condition: Condition,
}

impl StatusPatch {
    /// Patch marking a resource as published in the artifact
    #[must_use]
    pub fn synced(now: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            ready: true,
            last_synced_at: now,
            condition: Condition {
                type_: CONDITION_READY.to_string(),
                status: ConditionStatus::True,
                reason: "Synced".to_string(),
                message: message.into(),
                last_transition_time: now,
            },
        }
    }

    /// Apply the patch to a status
    ///
    /// The condition replaces any existing one of the same type; its
    /// transition time is kept when the status value did not change.
    pub fn apply_to(&self, status: &mut DashboardAppStatus) {
        status.ready = self.ready;
        status.last_synced_at = Some(self.last_synced_at);

        let mut condition = self.condition.clone();
        match status
            .conditions
            .iter_mut()
            .find(|c| c.type_ == condition.type_)
        {
            Some(existing) => {
                if existing.status == condition.status {
                    condition.last_transition_time = existing.last_transition_time;
                }
                *existing = condition;
            }
            None => status.conditions.push(condition),
        }
    }
}
