//! `Engine`: the injected-context struct tying the five components
//! together. Carries the index, the embedding providers, the
//! configuration, and the clock — replacing the module-level globals and
//! singletons the original system relied on.

use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::decider::{Disposition, DuplicateDecider};
use crate::embeddings::{DefaultTextEmbedder, ImageEmbedder, TextEmbedder, ZeroImageEmbedder};
use crate::index::{ReportFilter, Storage};
use crate::lifecycle::{FeedbackOutcome, LifecycleManager};
use crate::report::{
    ArchiveTombstone, FeedbackKind, IngestInput, Report, ReportStatus, SimilarityDetails,
};
use crate::{EngineError, Result};

/// The disposition returned from [`Engine::ingest`], matching the payload
/// shape of the ingestion endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionDisposition {
    pub issue_id: String,
    pub created_at: DateTime<Utc>,
    pub status: &'static str,
    pub duplicate_of: Option<String>,
    pub similarity_score: Option<f64>,
    pub duplicate_details: Option<DuplicateDetails>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateDetails {
    pub original_issue: OriginalIssueSummary,
    pub similarity_score: f64,
    pub score_details: SimilarityDetails,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginalIssueSummary {
    pub id: String,
    pub category: String,
    pub description: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub photo_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateStats {
    pub total_reports: usize,
    pub soft_duplicates: usize,
    pub hard_duplicates: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionStats {
    pub scheduled: usize,
    pub archived: usize,
}

/// Injected-context engine: the index, the embedding providers, the
/// configuration, and everything needed to run ingestion, feedback, and
/// administration end to end.
pub struct Engine {
    storage: Arc<Storage>,
    text_embedder: Box<dyn TextEmbedder>,
    image_embedder: Box<dyn ImageEmbedder>,
    config: EngineConfig,
}

impl Engine {
    /// Builds an engine with the default, fully-local providers (the
    /// deterministic hash-based text embedder and the zero-vector image
    /// embedder), reading tunables from the environment and the database
    /// location from `DUPEGUARD_DB_PATH`.
    pub fn from_env() -> Result<Self> {
        let config = EngineConfig::from_env();
        let db_path = std::env::var("DUPEGUARD_DB_PATH").ok().map(std::path::PathBuf::from);
        let storage = Arc::new(Storage::new(db_path)?);
        Ok(Self::new(
            storage,
            Box::new(DefaultTextEmbedder::new(config.d_txt)),
            Box::new(ZeroImageEmbedder::new(config.d_img)),
            config,
        ))
    }

    /// Builds an engine from explicit components — the constructor a test
    /// harness or a caller wanting real ONNX-backed embeddings should use.
    pub fn new(
        storage: Arc<Storage>,
        text_embedder: Box<dyn TextEmbedder>,
        image_embedder: Box<dyn ImageEmbedder>,
        config: EngineConfig,
    ) -> Self {
        Self {
            storage,
            text_embedder,
            image_embedder,
            config,
        }
    }

    fn lifecycle(&self) -> LifecycleManager<'_> {
        LifecycleManager::new(&self.storage, &self.config)
    }

    fn check_deadline(started: Instant, deadline: Option<StdDuration>) -> Result<()> {
        if let Some(d) = deadline {
            if started.elapsed() >= d {
                return Err(EngineError::Timeout);
            }
        }
        Ok(())
    }

    /// Ingests a new report: embeds its description and photos, pre-filters
    /// the candidate index, scores candidates, classifies, and persists
    /// according to the decider's disposition. No partial writes occur —
    /// either the full write succeeds or none of it does.
    #[tracing::instrument(skip(self, input), fields(category = %input.category))]
    pub fn ingest(&self, input: IngestInput, deadline: Option<StdDuration>) -> Result<IngestionDisposition> {
        let started = Instant::now();
        let now = Utc::now();

        if !(20..=1000).contains(&input.description.chars().count()) {
            return Err(EngineError::ValidationError(
                "description must be 20 to 1000 characters".to_string(),
            ));
        }
        if input.photo_bytes.is_empty() || input.photo_bytes.len() > 3 {
            return Err(EngineError::ValidationError(
                "between 1 and 3 photos are required".to_string(),
            ));
        }

        Self::check_deadline(started, deadline)?;
        let text_vector = self.text_embedder.embed(&input.description);

        Self::check_deadline(started, deadline)?;
        let image_vectors: Vec<Vec<f32>> = input
            .photo_bytes
            .iter()
            .map(|bytes| self.image_embedder.embed(bytes))
            .collect();

        Self::check_deadline(started, deadline)?;
        let candidates = self.storage.candidates(
            input.location,
            &input.category,
            now,
            self.config.time_window_days,
            self.config.max_distance_meters,
        )?;

        Self::check_deadline(started, deadline)?;

        let mut new_report = Report {
            id: crate::index::new_report_id(),
            reporter_id: input.reporter_id,
            location: input.location,
            category: input.category,
            severity: input.severity,
            description: input.description,
            photo_urls: (0..input.photo_bytes.len())
                .map(|i| format!("photo://{}/{}", Utc::now().timestamp_nanos_opt().unwrap_or(0), i))
                .collect(),
            image_vectors,
            text_vector: Some(text_vector),
            text_provider_version: Some(self.text_embedder.provider_version().to_string()),
            image_provider_version: Some(self.image_embedder.provider_version().to_string()),
            created_at: now,
            updated_at: now,
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
        new_report.validate()?;

        let decider = DuplicateDecider::new(&self.config);
        let disposition = decider.decide(&new_report, &candidates, now);

        Self::check_deadline(started, deadline)?;

        match disposition {
            Disposition::Hard { target_id, details } => {
                let original = self
                    .storage
                    .get(&target_id)?
                    .ok_or_else(|| EngineError::NotFound(format!("report {target_id} not found")))?;
                tracing::info!(target_id = %target_id, score = details.overall_score, "hard duplicate detected, not persisting");
                Ok(IngestionDisposition {
                    issue_id: "duplicate_detected".to_string(),
                    created_at: now,
                    status: "Duplicate",
                    duplicate_of: Some(target_id),
                    similarity_score: Some(details.overall_score),
                    duplicate_details: Some(DuplicateDetails {
                        original_issue: OriginalIssueSummary {
                            id: original.id,
                            category: original.category,
                            description: original.description,
                            status: original.status,
                            created_at: original.created_at,
                            photo_urls: original.photo_urls,
                        },
                        similarity_score: details.overall_score,
                        score_details: details,
                    }),
                })
            }
            Disposition::Soft { target_id, details } => {
                new_report.duplicate_of = Some(target_id.clone());
                new_report.similarity_score = Some(details.overall_score);
                new_report.similarity_details = Some(details);
                new_report.status = ReportStatus::Duplicate;
                self.storage.insert(&new_report)?;
                let original = self.storage.get(&target_id)?;
                tracing::info!(target_id = %target_id, score = details.overall_score, "soft duplicate persisted with link");
                Ok(IngestionDisposition {
                    issue_id: new_report.id.clone(),
                    created_at: now,
                    status: "Reported",
                    duplicate_of: Some(target_id),
                    similarity_score: Some(details.overall_score),
                    duplicate_details: original.map(|original| DuplicateDetails {
                        original_issue: OriginalIssueSummary {
                            id: original.id,
                            category: original.category,
                            description: original.description,
                            status: original.status,
                            created_at: original.created_at,
                            photo_urls: original.photo_urls,
                        },
                        similarity_score: details.overall_score,
                        score_details: details,
                    }),
                })
            }
            Disposition::New => {
                self.storage.insert(&new_report)?;
                tracing::info!(report_id = %new_report.id, "new report persisted");
                Ok(IngestionDisposition {
                    issue_id: new_report.id,
                    created_at: now,
                    status: "Reported",
                    duplicate_of: None,
                    similarity_score: None,
                    duplicate_details: None,
                })
            }
        }
    }

    pub fn get(&self, id: &str) -> Result<Option<Report>> {
        self.storage.get(id)
    }

    pub fn list(&self, filter: &ReportFilter) -> Result<Vec<Report>> {
        self.storage.list(filter)
    }

    pub fn duplicates_of(&self, id: &str) -> Result<Vec<Report>> {
        self.lifecycle().duplicates_of(id)
    }

    pub fn submit_feedback(
        &self,
        report_id: &str,
        user_id: &str,
        kind: FeedbackKind,
        comment: Option<&str>,
    ) -> Result<FeedbackOutcome> {
        self.lifecycle()
            .submit_feedback(report_id, user_id, kind, comment, Utc::now())
    }

    pub fn upvote(&self, report_id: &str, user_id: &str) -> Result<()> {
        self.lifecycle().upvote(report_id, user_id, Utc::now())
    }

    pub fn update_status(&self, id: &str, status: ReportStatus, cascade: bool) -> Result<()> {
        self.storage.update_status(id, status, cascade)
    }

    pub fn merge(&self, target_id: &str, source_id: &str) -> Result<()> {
        self.lifecycle().merge(target_id, source_id, Utc::now())
    }

    pub fn cancel_deletion(&self, report_id: &str) -> Result<()> {
        self.lifecycle().cancel_deletion(report_id)
    }

    /// Triggers one sweep pass immediately, returning the number of
    /// reports archived.
    pub fn sweep(&self) -> Result<usize> {
        crate::sweeper::Sweeper::new(self.storage.clone(), StdDuration::from_secs(self.config.sweeper_period_secs))
            .sweep_once()
    }

    /// Spawns the periodic sweeper on the current tokio runtime.
    pub fn spawn_sweeper(&self) -> (tokio::task::JoinHandle<()>, tokio::sync::watch::Sender<()>) {
        let sweeper = Arc::new(crate::sweeper::Sweeper::new(
            self.storage.clone(),
            StdDuration::from_secs(self.config.sweeper_period_secs),
        ));
        sweeper.spawn()
    }

    pub fn stats_duplicates(&self) -> Result<DuplicateStats> {
        let all = self.storage.list(&ReportFilter::default())?;
        let total_reports = all.len();
        // Every duplicate-linked report is persisted with `status ==
        // Duplicate`, so status can't distinguish soft from hard; a manual
        // merge is recorded with `similarity_score = 1.0` and counts as hard
        // alongside anything that crossed `t_hard`.
        let linked = all.iter().filter(|r| r.duplicate_of.is_some());
        let hard_duplicates = linked
            .clone()
            .filter(|r| r.manually_merged || r.similarity_score.is_some_and(|s| s >= self.config.t_hard))
            .count();
        let soft_duplicates = linked
            .filter(|r| !r.manually_merged && r.similarity_score.is_some_and(|s| s < self.config.t_hard))
            .count();
        Ok(DuplicateStats {
            total_reports,
            soft_duplicates,
            hard_duplicates,
        })
    }

    pub fn stats_deletions(&self) -> Result<DeletionStats> {
        let all = self.storage.list(&ReportFilter::default())?;
        let scheduled = all.iter().filter(|r| r.scheduled_for_deletion.is_some()).count();
        let archived = self.storage.count_archived()?;
        Ok(DeletionStats { scheduled, archived })
    }

    pub fn get_archive(&self, original_id: &str) -> Result<Option<ArchiveTombstone>> {
        self.storage.get_archive(original_id)
    }
}
