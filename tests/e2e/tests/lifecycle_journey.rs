//! An end-to-end duplicate journey: ingest, soft-duplicate link, contested
//! feedback, admin merge, and a final sweep — exercising the whole
//! lifecycle state machine in one continuous story rather than isolated
//! scenarios.

use chrono::Utc;
use dupeguard_core::{FeedbackKind, FeedbackOutcome, Location, Report, ReportStatus};
use dupeguard_e2e_tests::fixtures::ReportFactory;
use dupeguard_e2e_tests::harness::TestEngine;

fn soft_duplicate_of(id: &str, target: &str, reporter: &str, now: chrono::DateTime<Utc>) -> Report {
    Report {
        id: id.to_string(),
        reporter_id: reporter.to_string(),
        location: Location::new(12.9716, 77.5946).unwrap(),
        category: "POTHOLE".into(),
        severity: "medium".into(),
        description: "a pothole reportedly at the same spot as another report".into(),
        photo_urls: vec!["photo://0".into()],
        image_vectors: vec![vec![0.0; 512]],
        text_vector: None,
        text_provider_version: None,
        image_provider_version: None,
        created_at: now,
        updated_at: now,
        status: ReportStatus::Duplicate,
        upvotes: vec![],
        duplicate_of: Some(target.to_string()),
        similarity_score: Some(0.82),
        similarity_details: None,
        duplicate_feedback: vec![],
        confirmation_count: 0,
        dispute_count: 0,
        scheduled_for_deletion: None,
        was_reclassified: false,
        reclassified_at: None,
        reclassification_reason: None,
        manually_merged: false,
        merged_at: None,
    }
}

/// A soft duplicate that gathers two disputes and one confirm stays linked
/// (neither threshold reached), an admin then merges it into a second,
/// unrelated original, and the merge cascades cleanly.
#[test]
fn contested_duplicate_survives_until_merged() {
    let harness = TestEngine::new();
    let now = Utc::now();

    let original = harness
        .ingest(
            ReportFactory::pothole_at_market("reporter-a", "A deep pothole blocking the market road"),
            None,
        )
        .unwrap();

    let soft_dup = soft_duplicate_of("soft-1", &original.issue_id, "reporter-b", now);
    harness.storage.insert(&soft_dup).unwrap();

    // Two disputes and one confirm: neither threshold (3 of either kind,
    // outnumbering the other 2:1) is reached, so the link survives.
    for user in ["disputer-1", "disputer-2"] {
        let outcome = harness
            .submit_feedback(&soft_dup.id, user, FeedbackKind::Dispute, None)
            .unwrap();
        assert_eq!(outcome, FeedbackOutcome::Recorded);
    }
    let outcome = harness
        .submit_feedback(&soft_dup.id, "confirmer-1", FeedbackKind::Confirm, Some("looks right to me"))
        .unwrap();
    assert_eq!(outcome, FeedbackOutcome::Recorded);

    let still_linked = harness.get(&soft_dup.id).unwrap().unwrap();
    assert_eq!(still_linked.duplicate_of.as_deref(), Some(original.issue_id.as_str()));
    assert_eq!(still_linked.dispute_count, 2);
    assert_eq!(still_linked.confirmation_count, 1);

    // A second, unrelated original report; the admin merges the contested
    // duplicate's target into it, which must relink the duplicate too.
    let other = harness
        .ingest(
            ReportFactory::custom(
                "reporter-c",
                12.9800,
                77.6000,
                "STREETLIGHT",
                "A streetlight that has been dark for several nights",
                1,
            ),
            None,
        )
        .unwrap();

    harness.merge(&other.issue_id, &original.issue_id).unwrap();

    let original_after = harness.get(&original.issue_id).unwrap().unwrap();
    assert_eq!(original_after.duplicate_of.as_deref(), Some(other.issue_id.as_str()));
    assert!(original_after.manually_merged);

    let soft_dup_after = harness.get(&soft_dup.id).unwrap().unwrap();
    assert_eq!(soft_dup_after.duplicate_of.as_deref(), Some(other.issue_id.as_str()));
}

/// A duplicate that accumulates three confirms is scheduled for deletion,
/// the schedule can be cancelled before the grace period elapses, and
/// feedback continues to accrue normally afterward.
#[test]
fn scheduled_deletion_can_be_cancelled_before_sweep() {
    let harness = TestEngine::new();
    let now = Utc::now();

    let original = harness
        .ingest(
            ReportFactory::pothole_at_market("reporter-a", "A deep pothole blocking the market road"),
            None,
        )
        .unwrap();
    let soft_dup = soft_duplicate_of("soft-2", &original.issue_id, "reporter-b", now);
    harness.storage.insert(&soft_dup).unwrap();

    for user in ["u1", "u2", "u3"] {
        harness
            .submit_feedback(&soft_dup.id, user, FeedbackKind::Confirm, None)
            .unwrap();
    }
    let scheduled = harness.get(&soft_dup.id).unwrap().unwrap();
    assert!(scheduled.scheduled_for_deletion.is_some());

    harness.cancel_deletion(&soft_dup.id).unwrap();
    let cancelled = harness.get(&soft_dup.id).unwrap().unwrap();
    assert!(cancelled.scheduled_for_deletion.is_none());
    // Cancelling a deletion leaves the duplicate link itself untouched.
    assert_eq!(cancelled.duplicate_of.as_deref(), Some(original.issue_id.as_str()));

    // A sweep immediately after cancellation archives nothing.
    let archived = harness.sweep().unwrap();
    assert_eq!(archived, 0);
    assert!(harness.get(&soft_dup.id).unwrap().is_some());
}
