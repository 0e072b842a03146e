//! Domain types for civic-issue reports and their duplicate metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A geographic coordinate, validated at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> crate::Result<Self> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(crate::EngineError::ValidationError(format!(
                "latitude {lat} out of range [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(crate::EngineError::ValidationError(format!(
                "longitude {lon} out of range [-180, 180]"
            )));
        }
        Ok(Self { lat, lon })
    }
}

/// Status of a report within its own lifecycle (not the duplicate sub-lifecycle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Reported,
    UnderReview,
    InProgress,
    Resolved,
    Duplicate,
}

impl ReportStatus {
    pub fn as_db_str(self) -> &'static str {
        match self {
            ReportStatus::Reported => "REPORTED",
            ReportStatus::UnderReview => "UNDER_REVIEW",
            ReportStatus::InProgress => "IN_PROGRESS",
            ReportStatus::Resolved => "RESOLVED",
            ReportStatus::Duplicate => "DUPLICATE",
        }
    }

    pub fn from_db_str(s: &str) -> crate::Result<Self> {
        Ok(match s {
            "REPORTED" => ReportStatus::Reported,
            "UNDER_REVIEW" => ReportStatus::UnderReview,
            "IN_PROGRESS" => ReportStatus::InProgress,
            "RESOLVED" => ReportStatus::Resolved,
            "DUPLICATE" => ReportStatus::Duplicate,
            other => {
                return Err(crate::EngineError::Internal(format!(
                    "unknown report status {other}"
                )))
            }
        })
    }
}

/// Kind of duplicate feedback a user can submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeedbackKind {
    Confirm,
    Dispute,
}

impl FeedbackKind {
    pub fn as_db_str(self) -> &'static str {
        match self {
            FeedbackKind::Confirm => "CONFIRM",
            FeedbackKind::Dispute => "DISPUTE",
        }
    }

    pub fn from_db_str(s: &str) -> crate::Result<Self> {
        Ok(match s {
            "CONFIRM" => FeedbackKind::Confirm,
            "DISPUTE" => FeedbackKind::Dispute,
            other => {
                return Err(crate::EngineError::Internal(format!(
                    "unknown feedback kind {other}"
                )))
            }
        })
    }
}

/// A single upvote, unique by `user_id` within a report's upvote set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upvote {
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Feedback a user has submitted about a report's duplicate classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateFeedback {
    pub user_id: String,
    pub kind: FeedbackKind,
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Why a report is scheduled for eventual archival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledDeletion {
    pub deletion_at: DateTime<Utc>,
    pub reason: String,
}

/// The four similarity components in `[0, 1]`, plus the weights used to
/// combine them into the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreComponents {
    pub location: f64,
    pub text: f64,
    pub image: f64,
    pub recency: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreWeights {
    pub location: f64,
    pub text: f64,
    pub image: f64,
    pub recency: f64,
}

/// Full similarity breakdown captured at ingestion (or merge) time, retained
/// on the report for explainability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityDetails {
    pub overall_score: f64,
    pub components: ScoreComponents,
    pub weights: ScoreWeights,
}

/// A civic-issue report, with its embeddings and duplicate-lifecycle metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub reporter_id: String,
    pub location: Location,
    pub category: String,
    pub severity: String,
    pub description: String,
    pub photo_urls: Vec<String>,
    pub image_vectors: Vec<Vec<f32>>,
    /// Text embedding of `description`, computed once at ingestion and
    /// cached for scoring against future candidates.
    #[serde(skip)]
    pub text_vector: Option<Vec<f32>>,
    /// Identifies which [`crate::embeddings::TextEmbedder`] produced
    /// `text_vector`, so a provider swap can be detected and the vector
    /// re-embedded on read rather than silently scored against a mismatched
    /// space.
    pub text_provider_version: Option<String>,
    /// Identifies which [`crate::embeddings::ImageEmbedder`] produced every
    /// vector in `image_vectors` — one embedder is used for all photos of a
    /// single ingestion, so one version covers the whole set.
    pub image_provider_version: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: ReportStatus,
    pub upvotes: Vec<Upvote>,
    pub duplicate_of: Option<String>,
    pub similarity_score: Option<f64>,
    pub similarity_details: Option<SimilarityDetails>,
    pub duplicate_feedback: Vec<DuplicateFeedback>,
    pub confirmation_count: u32,
    pub dispute_count: u32,
    pub scheduled_for_deletion: Option<ScheduledDeletion>,
    pub was_reclassified: bool,
    pub reclassified_at: Option<DateTime<Utc>>,
    pub reclassification_reason: Option<String>,
    pub manually_merged: bool,
    pub merged_at: Option<DateTime<Utc>>,
}

impl Report {
    /// Validates the cross-field invariants required of every stored report.
    pub fn validate(&self) -> crate::Result<()> {
        if self.photo_urls.is_empty() || self.photo_urls.len() > 3 {
            return Err(crate::EngineError::ValidationError(
                "photo_urls must contain between 1 and 3 entries".to_string(),
            ));
        }
        if self.photo_urls.len() != self.image_vectors.len() {
            return Err(crate::EngineError::ValidationError(
                "photo_urls and image_vectors must be the same length".to_string(),
            ));
        }
        if !(20..=1000).contains(&self.description.chars().count()) {
            return Err(crate::EngineError::ValidationError(
                "description must be 20 to 1000 characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// Immutable record written when a report is archived and removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveTombstone {
    pub original_id: String,
    pub duplicate_of: String,
    pub category: String,
    pub location: Location,
    pub created_at: DateTime<Utc>,
    pub deleted_at: DateTime<Utc>,
    pub upvote_count: u32,
    pub confirmation_count: u32,
    pub dispute_count: u32,
}

/// Inputs accepted by [`crate::engine::Engine::ingest`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestInput {
    pub reporter_id: String,
    pub location: Location,
    pub category: String,
    pub severity: String,
    pub description: String,
    pub photo_bytes: Vec<Vec<u8>>,
}
