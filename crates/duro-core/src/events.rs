//! Operator-visible pass events
//!
//! A pass emits at most one event. Events are recorded against the operator
//! itself; when a failure concerns a particular resource its name travels
//! in [`PassEvent::resource`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use uuid::Uuid;

/// Severity of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// Expected progress
    Normal,
    /// Something needs attention
    Warning,
}

/// Machine-readable reason of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventReason {
    /// Artifact and statuses are current
    Synced,
    /// Validation or assembly of the document failed
    AssemblyFailed,
    /// Reading or writing the apps config object failed
    ConfigUpdateFailed,
    /// Some resource statuses could not be written
    StatusUpdateFailed,
}

impl EventReason {
    /// Wire name
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Synced => "Synced",
            Self::AssemblyFailed => "AssemblyFailed",
            Self::ConfigUpdateFailed => "ConfigUpdateFailed",
            Self::StatusUpdateFailed => "StatusUpdateFailed",
        }
    }

    /// Severity implied by the reason
    #[inline]
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::Synced => EventType::Normal,
            _ => EventType::Warning,
        }
    }
}

impl Display for EventReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record for a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassEvent {
    /// Pass that produced the event
    pub trace_id: Uuid,
    /// Severity
    pub event_type: EventType,
    /// Reason
    pub reason: EventReason,
    /// Human-readable message
    pub message: String,
    /// First affected resource, if the event concerns one
    pub resource: Option<String>,
    /// When the event was produced
    pub timestamp: DateTime<Utc>,
}

impl PassEvent {
    /// Create an event, deriving the severity from the reason
    #[must_use]
    pub fn new(trace_id: Uuid, reason: EventReason, message: impl Into<String>) -> Self {
        Self {
            trace_id,
            event_type: reason.event_type(),
            reason,
            message: message.into(),
            resource: None,
            timestamp: Utc::now(),
        }
    }

    /// Name the first affected resource
    #[must_use]
    pub fn with_resource(mut self, resource: Option<String>) -> Self {
        self.resource = resource;
        self
    }
}

/// Destination of pass events
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Record an event; delivery failures stay inside the sink
    async fn record(&self, event: PassEvent);
}

/// Sink that writes events to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn record(&self, event: PassEvent) {
        let resource = event.resource.as_deref().unwrap_or("-");
        match event.event_type {
            EventType::Normal => tracing::info!(
                trace_id = %event.trace_id,
                reason = %event.reason,
                resource,
                "{}",
                event.message
            ),
            EventType::Warning => tracing::warn!(
                trace_id = %event.trace_id,
                reason = %event.reason,
                resource,
                "{}",
                event.message
            ),
        }
    }
}

/// Sink that keeps events in memory
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<PassEvent>>,
}

impl RecordingEventSink {
    /// Create an empty sink
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events
    #[must_use]
    pub fn events(&self) -> Vec<PassEvent> {
        self.events.lock().clone()
    }

    /// Reasons of recorded events, in order
    #[must_use]
    pub fn reasons(&self) -> Vec<EventReason> {
        self.events.lock().iter().map(|e| e.reason).collect()
    }

    /// Most recent event
    #[must_use]
    pub fn last(&self) -> Option<PassEvent> {
        self.events.lock().last().cloned()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn record(&self, event: PassEvent) {
        self.events.lock().push(event);
    }
}
