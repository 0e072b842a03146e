//! Six concrete duplicate-lifecycle scenarios, driven end to end through
//! [`dupeguard_core::Engine`].

use chrono::Utc;
use dupeguard_core::{DefaultTextEmbedder, EngineConfig, Location, Report, ReportStatus};
use dupeguard_e2e_tests::fixtures::{ReportFactory, MARKET_LAT, MARKET_LON};
use dupeguard_e2e_tests::harness::TestEngine;

/// 1. Clear duplicate: an identical report is rejected as a hard duplicate.
#[test]
fn clear_duplicate_is_rejected() {
    let harness = TestEngine::new();
    let a = harness
        .ingest(
            ReportFactory::pothole_at_market("reporter-a", "Large pothole near market"),
            None,
        )
        .unwrap();
    assert_eq!(a.status, "Reported");

    let b = harness
        .ingest(
            ReportFactory::pothole_at_market("reporter-b", "Large pothole near market"),
            None,
        )
        .unwrap();
    assert_eq!(b.status, "Duplicate");
    assert_eq!(b.duplicate_of.as_deref(), Some(a.issue_id.as_str()));
    assert!(b.similarity_score.unwrap() >= 0.90);
}

/// 2. Nearby but different: a dissimilar description at the same location
/// is persisted as an independent report.
#[test]
fn nearby_but_textually_different_is_new() {
    let harness = TestEngine::new();
    harness
        .ingest(
            ReportFactory::pothole_at_market("reporter-a", "Large pothole near market"),
            None,
        )
        .unwrap();

    let c = harness
        .ingest(
            ReportFactory::pothole_at_market(
                "reporter-c",
                "Broken streetlight over 5 meters high",
            ),
            None,
        )
        .unwrap();
    assert_eq!(c.status, "Reported");
    assert!(c.duplicate_of.is_none());
}

/// Inserts `b` directly as a soft duplicate of `a`, at a fixed similarity
/// score, bypassing the real scorer. The hash-based default text embedder
/// makes a *real* soft-duplicate composite (spanning exactly [T_SOFT,
/// T_HARD)) non-deterministic to set up from free text alone, so — as the
/// `lifecycle` and `sweeper` unit tests in `dupeguard-core` already do —
/// these lifecycle-focused scenarios construct the soft-duplicate state
/// directly and exercise the feedback/sweep machinery against it.
fn insert_soft_duplicate(harness: &TestEngine, id: &str, target_id: &str) -> Report {
    let now = Utc::now();
    let mut report = Report {
        id: id.to_string(),
        reporter_id: "reporter-b".to_string(),
        location: Location::new(MARKET_LAT, MARKET_LON).unwrap(),
        category: "POTHOLE".to_string(),
        severity: "medium".to_string(),
        description: "A pothole reportedly near the same market area".to_string(),
        photo_urls: vec!["photo://b/0".to_string()],
        image_vectors: vec![vec![0.0; 512]],
        text_vector: None,
        text_provider_version: None,
        image_provider_version: None,
        created_at: now,
        updated_at: now,
        status: ReportStatus::Duplicate,
        upvotes: vec![],
        duplicate_of: Some(target_id.to_string()),
        similarity_score: Some(0.8),
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
    };
    report.validate().unwrap();
    harness.storage.insert(&report).unwrap();
    report
}

/// 3. Soft duplicate + feedback reclassification: three distinct disputes
/// send a soft duplicate back to an independent report.
#[test]
fn soft_duplicate_reclassifies_on_sustained_dispute() {
    let harness = TestEngine::new();
    let a = harness
        .ingest(
            ReportFactory::pothole_at_market("reporter-a", "Large pothole near the market"),
            None,
        )
        .unwrap();
    let b = insert_soft_duplicate(&harness, "soft-dup-b", &a.issue_id);

    for user in ["u1", "u2", "u3"] {
        harness
            .submit_feedback(&b.id, user, dupeguard_core::FeedbackKind::Dispute, None)
            .unwrap();
    }

    let reclassified = harness.get(&b.id).unwrap().unwrap();
    assert!(reclassified.was_reclassified);
    assert!(reclassified.duplicate_of.is_none());
    assert_eq!(reclassified.confirmation_count, 0);
    assert_eq!(reclassified.dispute_count, 0);
}

/// 4. Confirmed duplicate deletion: three confirms schedule a deletion; the
/// sweeper archives the report once the grace period elapses.
#[test]
fn confirmed_duplicate_is_archived_after_grace_period() {
    let harness = TestEngine::new();
    let a = harness
        .ingest(
            ReportFactory::pothole_at_market("reporter-a", "Large pothole near the market"),
            None,
        )
        .unwrap();
    let b = insert_soft_duplicate(&harness, "soft-dup-b", &a.issue_id);

    for user in ["u1", "u2", "u3"] {
        harness
            .submit_feedback(&b.id, user, dupeguard_core::FeedbackKind::Confirm, None)
            .unwrap();
    }

    let scheduled = harness.get(&b.id).unwrap().unwrap();
    let deletion = scheduled
        .scheduled_for_deletion
        .expect("expected a scheduled deletion after 3 confirms");
    assert_eq!(deletion.reason, "confirmed duplicate");
    assert!(deletion.deletion_at > Utc::now());

    // Simulate the grace period elapsing by rewriting the schedule directly
    // (the sweeper reads wall-clock time, so the only way to exercise "due"
    // from a unit test is to back-date the row through storage).
    harness
        .storage
        .schedule_deletion(&b.id, Utc::now() - chrono::Duration::seconds(1), "confirmed duplicate")
        .unwrap();

    let archived = harness.sweep().unwrap();
    assert_eq!(archived, 1);
    assert!(harness.get(&b.id).unwrap().is_none());
    let tombstone = harness.get_archive(&b.id).unwrap().unwrap();
    assert_eq!(tombstone.duplicate_of, a.issue_id);
}

/// 5. Merge cascades pointers: merging Y into X relinks every report
/// pointing at Y, and unions the two reports' upvotes.
#[test]
fn merge_cascades_pointers_and_upvotes() {
    let harness = TestEngine::new();
    let x = harness
        .ingest(ReportFactory::pothole_at_market("owner-x", "A pothole report near the market"), None)
        .unwrap();
    let y = harness
        .ingest(
            ReportFactory::custom("owner-y", 12.9720, 77.5950, "STREETLIGHT", "A broken streetlight on main road", 1),
            None,
        )
        .unwrap();

    // Z is a soft duplicate of Y, built directly through storage so its
    // similarity details don't have to survive a real scoring pass.
    let mut z: Report = harness.get(&y.issue_id).unwrap().unwrap();
    z.id = dupeguard_core::index::new_report_id();
    z.reporter_id = "owner-z".to_string();
    z.duplicate_of = Some(y.issue_id.clone());
    z.status = ReportStatus::Duplicate;
    harness.storage.insert(&z).unwrap();

    harness.upvote(&x.issue_id, "voter-x").unwrap();
    harness.upvote(&y.issue_id, "voter-y").unwrap();

    harness.merge(&x.issue_id, &y.issue_id).unwrap();

    let y_after = harness.get(&y.issue_id).unwrap().unwrap();
    assert_eq!(y_after.duplicate_of.as_deref(), Some(x.issue_id.as_str()));
    assert!(y_after.manually_merged);

    let z_after = harness.get(&z.id).unwrap().unwrap();
    assert_eq!(z_after.duplicate_of.as_deref(), Some(x.issue_id.as_str()));

    let x_after = harness.get(&x.issue_id).unwrap().unwrap();
    let voters: std::collections::HashSet<_> = x_after.upvotes.iter().map(|u| u.user_id.clone()).collect();
    assert!(voters.contains("voter-x"));
    assert!(voters.contains("voter-y"));
}

/// 6. Out-of-window non-duplicate: a report 40 days old is not a candidate
/// under a 30-day time window.
#[test]
fn out_of_window_report_is_not_a_candidate() {
    let config = EngineConfig::default();
    assert_eq!(config.time_window_days, 30);
    let harness = TestEngine::with_config(config);

    let now = Utc::now();
    let old_at = now - chrono::Duration::days(40);
    let old_report = Report {
        id: dupeguard_core::index::new_report_id(),
        reporter_id: "reporter-a".to_string(),
        location: dupeguard_core::Location::new(
            dupeguard_e2e_tests::fixtures::MARKET_LAT,
            dupeguard_e2e_tests::fixtures::MARKET_LON,
        )
        .unwrap(),
        category: "POTHOLE".to_string(),
        severity: "medium".to_string(),
        description: "Large pothole near market spotted a while back".to_string(),
        photo_urls: vec!["photo://old/0".to_string()],
        image_vectors: vec![vec![0.0; 512]],
        text_vector: Some(dupeguard_core::DefaultTextEmbedder::new(100).embed(
            "Large pothole near market spotted a while back",
        )),
        text_provider_version: Some("default-text-v1".to_string()),
        image_provider_version: Some("zero-image-v1".to_string()),
        created_at: old_at,
        updated_at: old_at,
        status: ReportStatus::Reported,
        upvotes: vec![],
        duplicate_of: None,
        similarity_score: None,
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
    };
    old_report.validate().unwrap();
    harness.storage.insert(&old_report).unwrap();

    let b = harness
        .ingest(
            ReportFactory::pothole_at_market("reporter-b", "Large pothole near market spotted again"),
            None,
        )
        .unwrap();
    assert_eq!(b.status, "Reported");
    assert!(b.duplicate_of.is_none());
}
