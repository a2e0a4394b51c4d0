//! Audit sinks and cascade collaborators
//!
//! The repository calls these after every successful save and delete.

use provenant_domain::traits::{AuditEvent, AuditSink, CascadeCleanup};
use provenant_domain::{TloId, TloKind};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Writes audit events as structured tracing events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        info!(
            target: "provenant::audit",
            kind = %event.kind,
            id = %event.id,
            user = %event.user,
            operation = event.operation.as_str(),
            timestamp = event.timestamp,
            "audit"
        );
    }
}

/// Keeps audit events in memory
///
/// Clones share the same event log, so a handle can be kept after the sink
/// is handed to a repository.
#[derive(Debug, Clone, Default)]
pub struct RecordingAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl RecordingAuditSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events, oldest first
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, event: &AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}

/// Cascade collaborator for deployments with no dependent artifacts
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCascade;

impl CascadeCleanup for NoopCascade {
    fn cleanup(&self, _kind: TloKind, _id: &TloId) {}
}

/// Remembers which TLOs were handed to cascade cleanup
#[derive(Debug, Clone, Default)]
pub struct RecordingCascade {
    deleted: Arc<Mutex<Vec<(TloKind, TloId)>>>,
}

impl RecordingCascade {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// TLOs cleaned up so far, oldest first
    pub fn deleted(&self) -> Vec<(TloKind, TloId)> {
        self.deleted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl CascadeCleanup for RecordingCascade {
    fn cleanup(&self, kind: TloKind, id: &TloId) {
        self.deleted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((kind, *id));
    }
}
