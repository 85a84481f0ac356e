//! Pass outcomes and the follow-up they call for

use crate::config::RetryPolicy;
use crate::error::{OperatorError, StoreError};
use duro_model::ContentHash;
use std::time::Duration;
use uuid::Uuid;

/// What happened to the apps config object during a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactWrite {
    /// Object did not exist and was created
    Created,
    /// Stored hash differed; body and hash were replaced
    Updated,
    /// Stored hash matched; nothing was written
    Unchanged,
}

impl ArtifactWrite {
    /// Whether the store was written to
    #[inline]
    #[must_use]
    pub fn wrote(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Step at which a pass failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// Listing resources
    List,
    /// Validating or assembling the document
    Assembly,
    /// Reading or writing the config object
    Artifact,
    /// The pass ran past its deadline
    Deadline,
    /// The pass runtime was shutting down
    Shutdown,
}

/// A status write that did not go through
#[derive(Debug)]
pub struct StatusFailure {
    /// Resource name
    pub resource: String,
    /// Store error
    pub error: StoreError,
}

/// Result of one pass
#[derive(Debug)]
pub enum PassOutcome {
    /// No resources exist; nothing was touched
    Idle,
    /// Artifact current and every status written
    Synced {
        /// Number of published entries
        app_count: usize,
        /// Hash of the published document
        hash: ContentHash,
        /// Artifact write performed
        write: ArtifactWrite,
    },
    /// Artifact current but some status writes failed
    Partial {
        /// Number of published entries
        app_count: usize,
        /// Hash of the published document
        hash: ContentHash,
        /// Artifact write performed
        write: ArtifactWrite,
        /// Failed status writes, in resource order
        failures: Vec<StatusFailure>,
    },
    /// Pass aborted before status writes
    Failed {
        /// Where it failed
        stage: FailureStage,
        /// Classified error
        error: OperatorError,
    },
}

impl PassOutcome {
    /// Follow-up under the given retry policy
    #[must_use]
    pub fn action(&self, retry: &RetryPolicy) -> Action {
        match self {
            Self::Idle | Self::Synced { .. } => Action::AwaitChange,
            Self::Partial { .. } => Action::Requeue(retry.status_backoff),
            Self::Failed { error, .. } if error.is_retryable() => {
                Action::Requeue(retry.failure_backoff)
            }
            Self::Failed { .. } => Action::AwaitChange,
        }
    }

    /// Artifact write of a pass that got past the artifact step
    #[must_use]
    pub fn artifact_write(&self) -> Option<ArtifactWrite> {
        match self {
            Self::Synced { write, .. } | Self::Partial { write, .. } => Some(*write),
            Self::Idle | Self::Failed { .. } => None,
        }
    }

    /// Error of a failed pass
    #[must_use]
    pub fn error(&self) -> Option<&OperatorError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Short label for logs
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Synced { .. } => "synced",
            Self::Partial { .. } => "partial",
            Self::Failed { .. } => "failed",
        }
    }
}

/// A pass outcome tagged with its trace id
#[derive(Debug)]
pub struct PassReport {
    /// Trace id shared by the pass's logs and event
    pub trace_id: Uuid,
    /// What happened
    pub outcome: PassOutcome,
}

/// What the runtime should do after a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Run another pass after the delay
    Requeue(Duration),
    /// Wait for the next change
    AwaitChange,
}
