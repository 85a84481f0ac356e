//! Error types and failure classification
//!
//! Every failure inside a pass ends up as an [`OperatorError`] tagged with
//! an [`ErrorKind`]. The kind alone decides what happens next:
//! - `Transient`: the pass is requeued after a fixed backoff
//! - `Permanent`: surfaced as an event, not retried until something changes
//! - `Configuration`: fatal at startup, never produced mid-pass

use duro_assembler::AssembleError;
use duro_model::{HashError, ValidationError};
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

/// Failure category driving retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Likely to resolve on its own (timeouts, conflicts, store hiccups)
    Transient,
    /// Needs an external fix (malformed declared data)
    Permanent,
    /// Invalid operator settings
    Configuration,
}

impl ErrorKind {
    /// Wire name
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Permanent => "permanent",
            Self::Configuration => "configuration",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context information for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    /// Key-value context pairs
    pub entries: Vec<(String, String)>,
}

impl Context {
    /// Create empty context
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add context entry
    #[inline]
    #[must_use]
    pub fn add(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// First value stored under `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether no entries were added
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

type Cause = Box<dyn StdError + Send + Sync + 'static>;

/// A classified failure raised during a pass
#[derive(Debug)]
pub struct OperatorError {
    kind: ErrorKind,
    message: String,
    cause: Option<Cause>,
    context: Context,
}

impl OperatorError {
    /// Create an error of the given kind
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
            context: Context::empty(),
        }
    }

    /// Transient error wrapping a cause
    #[must_use]
    pub fn transient<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::new(ErrorKind::Transient, message).with_cause(cause)
    }

    /// Permanent error wrapping a cause
    #[must_use]
    pub fn permanent<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::new(ErrorKind::Permanent, message).with_cause(cause)
    }

    /// Configuration error wrapping a cause
    #[must_use]
    pub fn configuration<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::new(ErrorKind::Configuration, message).with_cause(cause)
    }

    /// Wrap a cause, taking the kind from [`classify`]
    #[must_use]
    pub fn classified<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let kind = classify(&cause);
        Self::new(kind, message).with_cause(cause)
    }

    /// Attach a cause
    #[must_use]
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Add context entry
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context = self.context.add(key, value);
        self
    }

    /// Failure category
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Message without the cause
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Attached diagnostic context
    #[inline]
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
}

impl Display for OperatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.message, cause),
            None => f.write_str(&self.message),
        }
    }
}

impl StdError for OperatorError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn StdError + 'static))
    }
}

/// Errors reported by resource and artifact stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Object does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Object already exists (create race)
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Optimistic concurrency check failed
    #[error("conflict on {key}: expected version {expected}, found {actual}")]
    Conflict {
        key: String,
        expected: String,
        actual: String,
    },

    /// Store unreachable or refusing requests
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Store call timed out
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    /// Stored data cannot be understood
    #[error("invalid stored data: {0}")]
    Invalid(String),

    /// IO failure in a file-backed store
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Failure category of this store error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Invalid(_) => ErrorKind::Permanent,
            Self::NotFound(_)
            | Self::AlreadyExists(_)
            | Self::Conflict { .. }
            | Self::Unavailable(_)
            | Self::Timeout(_)
            | Self::Io { .. } => ErrorKind::Transient,
        }
    }

    /// Create an IO error for path
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Invalid operator settings
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Concurrency limit below one
    #[error("maxConcurrentReconciles must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    /// Per-pass timeout below one second
    #[error("reconcileTimeout must be at least 1 second, got {0:?}")]
    TimeoutTooShort(Duration),

    /// Required string setting left empty
    #[error("{0} is required")]
    Missing(&'static str),

    /// Zero retry backoff
    #[error("{0} backoff must be greater than zero")]
    InvalidBackoff(&'static str),
}

/// Classify any error
///
/// Walks the source chain and returns the kind of the first error type it
/// recognizes. Unrecognized errors are `Transient` so a pass is never
/// silently dropped.
#[must_use]
pub fn classify(err: &(dyn StdError + 'static)) -> ErrorKind {
    std::iter::successors(Some(err), |&e| e.source())
        .find_map(known_kind)
        .unwrap_or(ErrorKind::Transient)
}

fn known_kind(err: &(dyn StdError + 'static)) -> Option<ErrorKind> {
    if let Some(e) = err.downcast_ref::<OperatorError>() {
        return Some(e.kind());
    }
    if let Some(e) = err.downcast_ref::<StoreError>() {
        return Some(e.kind());
    }
    if err.is::<ConfigError>() {
        return Some(ErrorKind::Configuration);
    }
    if err.is::<ValidationError>()
        || err.is::<AssembleError>()
        || err.is::<HashError>()
        || err.is::<serde_json::Error>()
    {
        return Some(ErrorKind::Permanent);
    }
    if err.is::<tokio::time::error::Elapsed>() {
        return Some(ErrorKind::Transient);
    }
    None
}

/// Check if an error should be retried
#[inline]
#[must_use]
pub fn should_retry(err: &(dyn StdError + 'static)) -> bool {
    classify(err) == ErrorKind::Transient
}
