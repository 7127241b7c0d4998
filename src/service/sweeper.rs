//! Background deadline sweeper.
//!
//! One sweeper task runs per process. Each cycle tries the cluster mutex
//! without waiting; only the holder queries overdue drafts and ticks them,
//! so at most one instance sweeps at a time. Correctness does not depend on
//! the mutex: every tick re-checks the deadline under the draft lock.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use super::timer_service::{TickMode, TickOutcome, TimerService};
use crate::domain::Clock;
use crate::error::DraftError;
use crate::persistence::{ClusterMutex, DraftStore};

/// Sweeper tuning.
#[derive(Debug, Clone)]
pub struct SweeperSettings {
    /// Time between cycles.
    pub interval: Duration,
    /// Maximum drafts ticked per cycle.
    pub batch_size: i64,
    /// Name of the cluster mutex guarding cycles.
    pub lock_name: String,
}

/// Summary of one sweep cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// `false` when another instance held the cluster mutex.
    pub acquired: bool,
    /// Overdue drafts selected.
    pub selected: usize,
    /// Ticks that autopicked.
    pub autopicked: usize,
    /// Ticks that announced an expiry.
    pub expired: usize,
    /// Ticks that found nothing to do (raced with a pick).
    pub idle: usize,
    /// Ticks that failed; their deadlines are pushed back one timer period.
    pub failed: usize,
}

/// Periodically ticks drafts whose deadline elapsed.
#[derive(Debug)]
pub struct DeadlineSweeper {
    store: Arc<dyn DraftStore>,
    mutex: Arc<dyn ClusterMutex>,
    timer: TimerService,
    clock: Arc<dyn Clock>,
    settings: SweeperSettings,
}

impl DeadlineSweeper {
    /// Creates a sweeper.
    #[must_use]
    pub fn new(
        store: Arc<dyn DraftStore>,
        mutex: Arc<dyn ClusterMutex>,
        timer: TimerService,
        clock: Arc<dyn Clock>,
        settings: SweeperSettings,
    ) -> Self {
        Self {
            store,
            mutex,
            timer,
            clock,
            settings,
        }
    }

    /// Runs cycles until `shutdown` flips to `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.settings.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(
            interval_ms = self.settings.interval.as_millis(),
            batch_size = self.settings.batch_size,
            lock = %self.settings.lock_name,
            "deadline sweeper started"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    match self.run_cycle().await {
                        Ok(report) if report.selected > 0 => {
                            tracing::info!(?report, "sweep cycle finished");
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "sweep cycle failed"),
                    }
                }
            }
        }

        tracing::info!("deadline sweeper stopped");
    }

    /// Runs one cycle: acquire, select, tick each, release.
    ///
    /// A busy mutex yields an empty report with `acquired == false`. Per-draft
    /// tick failures are counted and logged, never propagated, and the failed
    /// draft's deadline is deferred so it does not crowd out the next batch.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure failures: acquiring the
    /// mutex or querying overdue drafts.
    pub async fn run_cycle(&self) -> Result<SweepReport, DraftError> {
        let Some(lease) = self.mutex.try_acquire(&self.settings.lock_name).await? else {
            tracing::debug!(lock = %self.settings.lock_name, "sweeper lock busy; skipping cycle");
            return Ok(SweepReport::default());
        };

        let result = self.sweep().await;
        if let Err(e) = lease.release().await {
            tracing::warn!(error = %e, "failed to release sweeper lock");
        }
        result
    }

    async fn sweep(&self) -> Result<SweepReport, DraftError> {
        let now = self.clock.now();
        let overdue = self
            .store
            .overdue_drafts(now, self.settings.batch_size)
            .await?;
        let mut report = SweepReport {
            acquired: true,
            selected: overdue.len(),
            ..SweepReport::default()
        };

        for draft_id in overdue {
            match self.timer.tick(draft_id, TickMode::Sweep).await {
                Ok(TickOutcome::Autopicked { .. }) => report.autopicked += 1,
                Ok(TickOutcome::Expired { .. }) => report.expired += 1,
                Ok(TickOutcome::Idle { .. }) => report.idle += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(%draft_id, error = %e, "deadline tick failed");
                    if let Err(e) = self.timer.defer(draft_id).await {
                        tracing::warn!(%draft_id, error = %e, "failed to defer deadline");
                    }
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{EventBus, SystemClock};
    use crate::persistence::{MemoryClusterMutex, MemoryDraftStore};

    fn sweeper(mutex: Arc<dyn ClusterMutex>) -> DeadlineSweeper {
        let store: Arc<dyn DraftStore> = Arc::new(MemoryDraftStore::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let timer = TimerService::new(
            Arc::clone(&store),
            Arc::new(EventBus::new(16)),
            Arc::clone(&clock),
        );
        DeadlineSweeper::new(
            store,
            mutex,
            timer,
            clock,
            SweeperSettings {
                interval: Duration::from_millis(10),
                batch_size: 10,
                lock_name: "draft-sweeper".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn busy_lock_skips_cycle() {
        let mutex: Arc<dyn ClusterMutex> = Arc::new(MemoryClusterMutex::new());
        let Ok(Some(_held)) = mutex.try_acquire("draft-sweeper").await else {
            panic!("lock should be free");
        };
        let sweeper = sweeper(Arc::clone(&mutex));
        let Ok(report) = sweeper.run_cycle().await else {
            panic!("busy lock must not be an error");
        };
        assert!(!report.acquired);
        assert_eq!(report.selected, 0);
    }

    #[tokio::test]
    async fn cycle_releases_lock() {
        let mutex: Arc<dyn ClusterMutex> = Arc::new(MemoryClusterMutex::new());
        let sweeper = sweeper(Arc::clone(&mutex));
        let Ok(report) = sweeper.run_cycle().await else {
            panic!("cycle failed");
        };
        assert!(report.acquired);
        let Ok(Some(_lease)) = mutex.try_acquire("draft-sweeper").await else {
            panic!("lock should be released after the cycle");
        };
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let sweeper = sweeper(Arc::new(MemoryClusterMutex::new()));
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(sweeper.run(rx));
        tokio::time::sleep(Duration::from_millis(30)).await;
        let Ok(()) = tx.send(true) else {
            panic!("sweeper dropped its receiver");
        };
        let Ok(Ok(())) = tokio::time::timeout(Duration::from_secs(1), handle).await else {
            panic!("sweeper did not stop");
        };
    }
}
