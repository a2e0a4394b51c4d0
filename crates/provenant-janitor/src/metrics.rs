//! Metrics collection for janitor sweeps

use provenant_domain::{TloId, TloKind};
use std::collections::BTreeMap;

/// A document a sweep could not process
#[derive(Debug, Clone, PartialEq)]
pub struct SweepFailure {
    /// Kind of the document
    pub kind: TloKind,
    /// Identifier of the document
    pub id: TloId,
    /// Error message
    pub message: String,
}

/// Metrics collected across janitor sweeps
#[derive(Debug, Clone, Default)]
pub struct JanitorMetrics {
    /// Documents migrated per kind
    pub migrated: BTreeMap<TloKind, usize>,

    /// Outdated documents found in dry-run mode per kind
    pub outdated: BTreeMap<TloKind, usize>,

    /// Relationship mirrors restored per owner kind
    pub repaired: BTreeMap<TloKind, usize>,

    /// Documents that failed to migrate or load
    pub failures: Vec<SweepFailure>,

    /// Total sweep iterations completed
    pub sweep_count: usize,

    /// Total runtime in milliseconds
    pub total_runtime_ms: u64,
}

impl JanitorMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a migrated document
    pub fn record_migration(&mut self, kind: TloKind) {
        *self.migrated.entry(kind).or_insert(0) += 1;
    }

    /// Record outdated documents seen without migrating
    pub fn record_outdated(&mut self, kind: TloKind, count: usize) {
        *self.outdated.entry(kind).or_insert(0) += count;
    }

    /// Record restored mirrors
    pub fn record_repairs(&mut self, kind: TloKind, count: usize) {
        if count > 0 {
            *self.repaired.entry(kind).or_insert(0) += count;
        }
    }

    /// Record a document that could not be processed
    ///
    /// A document is listed once; a later failure replaces the message.
    pub fn record_failure(&mut self, kind: TloKind, id: TloId, message: impl Into<String>) {
        let message = message.into();
        match self
            .failures
            .iter_mut()
            .find(|f| f.kind == kind && f.id == id)
        {
            Some(existing) => existing.message = message,
            None => self.failures.push(SweepFailure { kind, id, message }),
        }
    }

    /// Record a sweep cycle completion
    pub fn record_sweep(&mut self) {
        self.sweep_count += 1;
    }

    /// Total documents migrated
    pub fn total_migrated(&self) -> usize {
        self.migrated.values().sum()
    }

    /// Total outdated documents reported in dry-run mode
    pub fn total_outdated(&self) -> usize {
        self.outdated.values().sum()
    }

    /// Total mirrors restored
    pub fn total_repaired(&self) -> usize {
        self.repaired.values().sum()
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Janitor Metrics Summary".to_string(),
            "======================".to_string(),
            format!("Sweep cycles: {}", self.sweep_count),
            format!("Total runtime: {}ms", self.total_runtime_ms),
            String::new(),
        ];

        for (title, counts, total) in [
            ("Migrated by kind:", &self.migrated, self.total_migrated()),
            ("Outdated by kind (dry run):", &self.outdated, self.total_outdated()),
            ("Mirrors repaired by kind:", &self.repaired, self.total_repaired()),
        ] {
            if counts.is_empty() {
                continue;
            }
            lines.push(title.to_string());
            for (kind, count) in counts {
                lines.push(format!("  {}: {}", kind, count));
            }
            lines.push(format!("  Total: {}", total));
            lines.push(String::new());
        }

        if !self.failures.is_empty() {
            lines.push(format!("Failures: {}", self.failures.len()));
            for failure in &self.failures {
                lines.push(format!("  {} {}: {}", failure.kind, failure.id, failure.message));
            }
        }

        lines.join("\n")
    }
}
