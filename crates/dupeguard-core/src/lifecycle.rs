//! The duplicate lifecycle state machine: feedback, reclassification,
//! scheduled deletion, merge, and upvotes.

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::index::Storage;
use crate::report::{FeedbackKind, Report};
use crate::{EngineError, Result};

/// Outcome of submitting duplicate feedback, reported back to the caller so
/// it can explain what happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// Feedback recorded; no state transition triggered.
    Recorded,
    /// `confirmation_count >= 3 && confirmation_count > 2 * dispute_count`:
    /// the report is now scheduled for deletion.
    ScheduledForDeletion { deletion_at: DateTime<Utc> },
    /// `dispute_count >= 3 && dispute_count > 2 * confirmation_count`: the
    /// report has been reclassified back to an independent report.
    Reclassified,
}

/// Orchestrates confirm/dispute transitions, merges, and deletion scheduling
/// over the candidate index.
pub struct LifecycleManager<'a> {
    storage: &'a Storage,
    deletion_grace_days: i64,
}

impl<'a> LifecycleManager<'a> {
    pub fn new(storage: &'a Storage, config: &EngineConfig) -> Self {
        Self {
            storage,
            deletion_grace_days: config.deletion_grace_days,
        }
    }

    /// Records a confirm/dispute vote on a duplicate-linked report and
    /// evaluates whether it crosses a transition threshold.
    pub fn submit_feedback(
        &self,
        report_id: &str,
        user_id: &str,
        kind: FeedbackKind,
        comment: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<FeedbackOutcome> {
        let report = self
            .storage
            .get(report_id)?
            .ok_or_else(|| EngineError::NotFound(format!("report {report_id} not found")))?;

        if report.duplicate_of.is_none() {
            return Err(EngineError::ValidationError(
                "feedback requires the report to be duplicate-linked".to_string(),
            ));
        }

        let (confirmation_count, dispute_count) =
            self.storage.add_feedback(report_id, user_id, kind, comment, now)?;

        if confirmation_count >= 3 && confirmation_count > 2 * dispute_count {
            let deletion_at = now + chrono::Duration::days(self.deletion_grace_days);
            self.storage
                .schedule_deletion(report_id, deletion_at, "confirmed duplicate")?;
            return Ok(FeedbackOutcome::ScheduledForDeletion { deletion_at });
        }

        if dispute_count >= 3 && dispute_count > 2 * confirmation_count {
            self.storage
                .unlink(report_id, "sustained user dispute", now)?;
            return Ok(FeedbackOutcome::Reclassified);
        }

        Ok(FeedbackOutcome::Recorded)
    }

    /// Admin merge: folds `source` into `target`, atomically.
    pub fn merge(&self, target_id: &str, source_id: &str, now: DateTime<Utc>) -> Result<()> {
        if target_id == source_id {
            return Err(EngineError::ValidationError(
                "cannot merge a report into itself".to_string(),
            ));
        }
        self.storage.merge(target_id, source_id, now)
    }

    /// Admin: cancels a pending scheduled deletion, returning the report to
    /// `SOFT_DUP` (i.e. leaving it duplicate-linked but no longer queued).
    pub fn cancel_deletion(&self, report_id: &str) -> Result<()> {
        self.storage.cancel_deletion(report_id)
    }

    /// Idempotent upvote on `(report_id, user_id)`. When the report is a
    /// soft duplicate, the vote is recorded as a non-counted audit entry on
    /// the target instead of inflating the report's own upvote count.
    pub fn upvote(&self, report_id: &str, user_id: &str, now: DateTime<Utc>) -> Result<()> {
        let report = self
            .storage
            .get(report_id)?
            .ok_or_else(|| EngineError::NotFound(format!("report {report_id} not found")))?;

        match &report.duplicate_of {
            Some(target_id) => {
                self.storage.add_duplicate_upvote(target_id, user_id, now)?;
            }
            None => {
                self.storage.add_upvote(report_id, user_id, now)?;
            }
        }
        Ok(())
    }

    /// Fetches the current duplicates of `report_id` — every report whose
    /// `duplicate_of` currently points at it.
    pub fn duplicates_of(&self, report_id: &str) -> Result<Vec<Report>> {
        let all = self.storage.list(&crate::index::ReportFilter {
            is_duplicate: Some(true),
            ..Default::default()
        })?;
        Ok(all
            .into_iter()
            .filter(|r| r.duplicate_of.as_deref() == Some(report_id))
            .collect())
    }
}
