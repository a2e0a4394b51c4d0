//! Per-kind migration chains

use crate::error::SchemaError;
use crate::steps;
use provenant_domain::{Document, TloKind};
use std::collections::HashMap;

/// Signature of a single migration step
///
/// A step only rewrites fields; bumping the version and persisting the result
/// is the migrator's job.
pub type StepFn = fn(&mut Document) -> anyhow::Result<()>;

/// Migration from one schema version to the next
#[derive(Debug, Clone, Copy)]
pub struct MigrationStep {
    /// Version the step starts from; it produces `from + 1`
    pub from: u32,

    /// Human-readable summary, used in logs
    pub description: &'static str,

    /// Field rewrite
    pub apply: StepFn,
}

/// Ordered steps taking one kind from version 1 to its latest version
#[derive(Debug, Clone)]
pub struct MigrationChain {
    kind: TloKind,
    steps: Vec<MigrationStep>,
}

impl MigrationChain {
    /// Create an empty chain
    pub fn new(kind: TloKind) -> Self {
        Self {
            kind,
            steps: Vec::new(),
        }
    }

    /// Add a step leaving version `from`
    pub fn with_step(mut self, from: u32, description: &'static str, apply: StepFn) -> Self {
        self.steps.retain(|s| s.from != from);
        self.steps.push(MigrationStep {
            from,
            description,
            apply,
        });
        self.steps.sort_by_key(|s| s.from);
        self
    }

    /// Kind this chain migrates
    pub fn kind(&self) -> TloKind {
        self.kind
    }

    /// Step leaving a version
    pub fn step(&self, from: u32) -> Option<&MigrationStep> {
        self.steps.iter().find(|s| s.from == from)
    }

    /// All steps, ordered by starting version
    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }
}

/// Lookup table from kind to migration chain, built once at startup
#[derive(Debug, Clone, Default)]
pub struct MigrationRegistry {
    chains: HashMap<TloKind, MigrationChain>,
}

impl MigrationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the chains shipped with this crate
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for kind in TloKind::ALL {
            let mut chain = MigrationChain::new(kind)
                .with_step(
                    1,
                    "normalize relationship edge fields and labels",
                    steps::normalize_relationships,
                )
                .with_step(
                    2,
                    "default source instance fields, split bucket list",
                    steps::normalize_sources,
                );
            if kind == TloKind::Indicator {
                chain = chain.with_step(
                    3,
                    "rename legacy indicator types",
                    steps::rename_indicator_types,
                );
            }
            registry.register(chain);
        }
        registry
    }

    /// Register (or replace) the chain of a kind
    pub fn register(&mut self, chain: MigrationChain) {
        self.chains.insert(chain.kind(), chain);
    }

    /// Chain of a kind, if one is registered
    pub fn chain(&self, kind: TloKind) -> Option<&MigrationChain> {
        self.chains.get(&kind)
    }

    /// Step leaving `from` for a kind
    pub fn step(&self, kind: TloKind, from: u32) -> Option<&MigrationStep> {
        self.chain(kind).and_then(|chain| chain.step(from))
    }

    /// Check every kind has a contiguous chain from 1 to its latest version
    pub fn validate(&self) -> Result<(), SchemaError> {
        for kind in TloKind::ALL {
            for from in 1..kind.latest_schema_version() {
                if self.step(kind, from).is_none() {
                    return Err(SchemaError::MissingStep {
                        kind,
                        id: None,
                        from,
                    });
                }
            }
        }
        Ok(())
    }
}
