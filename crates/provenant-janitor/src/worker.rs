//! Background worker for scheduled janitor sweeps

use crate::{Janitor, JanitorConfig, JanitorError, JanitorMetrics};
use provenant_domain::traits::DocumentStore;
use provenant_gatekeeper::Repository;
use tokio::time::{interval, Duration};

/// Background worker that runs the janitor on a schedule
///
/// Sweeps themselves are synchronous; the worker only drives the schedule
/// and stops on Ctrl+C.
///
/// # Examples
///
/// ```no_run
/// use provenant_gatekeeper::Repository;
/// use provenant_janitor::{JanitorConfig, JanitorWorker};
/// use provenant_store::SqliteStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let repo = Repository::new(SqliteStore::new("provenant.db")?);
///     let mut worker = JanitorWorker::new(JanitorConfig::default());
///
///     // Run until Ctrl+C
///     worker.run(repo).await?;
///     Ok(())
/// }
/// ```
pub struct JanitorWorker {
    janitor: Janitor,
    interval: Duration,
}

impl JanitorWorker {
    /// Create a new background worker with the given configuration
    pub fn new(config: JanitorConfig) -> Self {
        Self::with_janitor(Janitor::new(config))
    }

    /// Create a worker around an existing janitor
    pub fn with_janitor(janitor: Janitor) -> Self {
        let interval = janitor.config().sweep_interval();
        Self { janitor, interval }
    }

    /// Create a worker with default configuration
    pub fn default_config() -> Self {
        Self::new(JanitorConfig::default())
    }

    /// Run the worker until a shutdown signal (Ctrl+C) is received
    ///
    /// A failed sweep is logged and the next one runs on schedule.
    pub async fn run<S: DocumentStore>(
        &mut self,
        mut repo: Repository<S>,
    ) -> Result<(), JanitorError> {
        self.janitor.config().validate()?;
        let mut ticker = interval(self.interval);

        tracing::info!("Janitor worker started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::debug!("Starting sweep cycle");

                    match self.janitor.sweep(&mut repo) {
                        Ok(metrics) => {
                            tracing::info!(
                                "Sweep completed: {} migrated, {} repaired, {} failed",
                                metrics.total_migrated(),
                                metrics.total_repaired(),
                                metrics.failures.len()
                            );
                        }
                        Err(e) => {
                            tracing::error!("Sweep failed: {}", e);
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping janitor");
                    break;
                }
            }
        }

        tracing::info!(
            "Janitor stopped. Final metrics:\n{}",
            self.janitor.metrics().summary()
        );

        Ok(())
    }

    /// Run a fixed number of cycles, stopping at the first failed sweep
    ///
    /// The repository is handed back so callers can inspect the result.
    pub async fn run_cycles<S: DocumentStore>(
        &mut self,
        mut repo: Repository<S>,
        cycles: usize,
    ) -> Result<Repository<S>, JanitorError> {
        self.janitor.config().validate()?;
        let mut ticker = interval(self.interval);

        tracing::info!(
            "Janitor worker started for {} cycles (interval: {:?})",
            cycles,
            self.interval
        );

        for cycle in 0..cycles {
            ticker.tick().await;

            tracing::debug!("Starting sweep cycle {}/{}", cycle + 1, cycles);

            match self.janitor.sweep(&mut repo) {
                Ok(metrics) => {
                    tracing::info!(
                        "Sweep {}/{} completed: {} migrated, {} repaired, {} failed",
                        cycle + 1,
                        cycles,
                        metrics.total_migrated(),
                        metrics.total_repaired(),
                        metrics.failures.len()
                    );
                }
                Err(e) => {
                    tracing::error!("Sweep {}/{} failed: {}", cycle + 1, cycles, e);
                    return Err(e);
                }
            }
        }

        tracing::info!(
            "Janitor finished {} cycles. Final metrics:\n{}",
            cycles,
            self.janitor.metrics().summary()
        );

        Ok(repo)
    }

    /// Get a reference to the janitor's current metrics
    pub fn metrics(&self) -> &JanitorMetrics {
        self.janitor.metrics()
    }

    /// Reset the janitor's metrics counters
    pub fn reset_metrics(&mut self) {
        self.janitor.reset_metrics();
    }
}
