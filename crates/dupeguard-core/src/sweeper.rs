//! Periodic background task that drains the deletion queue.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use crate::index::Storage;
use crate::Result;

/// Drains `due_deletions` every `period`, archiving and deleting one report
/// at a time. Errors on an individual report are logged and the report is
/// left for the next run — the sweeper is safe to re-run.
pub struct Sweeper {
    storage: Arc<Storage>,
    period: Duration,
}

impl Sweeper {
    pub fn new(storage: Arc<Storage>, period: Duration) -> Self {
        Self { storage, period }
    }

    /// Runs one sweep pass immediately, returning the number of reports
    /// archived. Exposed separately from [`Self::spawn`] so callers (and
    /// the CLI's `sweep` subcommand) can trigger a sweep on demand.
    pub fn sweep_once(&self) -> Result<usize> {
        let now = Utc::now();
        let due = self.storage.due_deletions(now)?;
        let mut archived = 0;
        for report in due {
            match self.storage.archive_and_delete(&report.id) {
                Ok(_) => {
                    tracing::info!(report_id = %report.id, "archived duplicate report");
                    archived += 1;
                }
                Err(e) => {
                    tracing::warn!(report_id = %report.id, error = %e, "sweeper failed on report, will retry next run");
                }
            }
        }
        Ok(archived)
    }

    /// Spawns the periodic loop on the current tokio runtime. The returned
    /// `watch::Sender<()>` triggers a graceful shutdown: the signal is
    /// honored only between items, never mid-item.
    pub fn spawn(self: Arc<Self>) -> (tokio::task::JoinHandle<()>, watch::Sender<()>) {
        let (tx, mut rx) = watch::channel(());
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(self.period) => {
                        if let Err(e) = self.sweep_once() {
                            tracing::warn!(error = %e, "sweeper pass failed");
                        }
                    }
                    _ = rx.changed() => {
                        tracing::info!("sweeper received shutdown signal");
                        break;
                    }
                }
            }
        });
        (handle, tx)
    }
}
