//! # dupeguard-core
//!
//! Duplicate-detection and duplicate-lifecycle engine for civic-issue reports.
//!
//! Five cooperating components, leaves-first:
//!
//! - [`embeddings`] — pure mappings from a photograph or description to a
//!   unit-length feature vector.
//! - [`index`] — the persistent candidate index: geospatial, categorical,
//!   and temporal pre-filtering over stored reports.
//! - [`scorer`] — location/text/image/recency similarity components and
//!   their weighted composite.
//! - [`decider`] — classifies a new report against a candidate set as NEW,
//!   a soft duplicate, or a hard duplicate.
//! - [`lifecycle`] — the duplicate feedback state machine: confirmation,
//!   dispute, reclassification, scheduled deletion, merge.
//!
//! [`engine::Engine`] is the injected-context struct tying these together —
//! the index, the embedding providers, the configuration, and the clock —
//! replacing the module-level globals a simpler design might reach for.
//! [`sweeper::Sweeper`] drains the deletion queue on a schedule.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use dupeguard_core::{Engine, IngestInput, Location};
//!
//! let engine = Engine::from_env()?;
//! let disposition = engine.ingest(
//!     IngestInput {
//!         reporter_id: "user-1".to_string(),
//!         location: Location::new(12.9716, 77.5946)?,
//!         category: "POTHOLE".to_string(),
//!         severity: "medium".to_string(),
//!         description: "Large pothole near the market entrance".to_string(),
//!         photo_bytes: vec![vec![0u8; 16]],
//!     },
//!     None,
//! )?;
//! println!("{}", disposition.status);
//! # Ok::<(), dupeguard_core::EngineError>(())
//! ```

pub mod config;
pub mod decider;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod geo;
pub mod index;
pub mod lifecycle;
pub mod report;
pub mod scorer;
pub mod sweeper;

pub use config::EngineConfig;
pub use decider::{Disposition, DuplicateDecider};
pub use embeddings::{cosine_similarity, DefaultTextEmbedder, ImageEmbedder, TextEmbedder, ZeroImageEmbedder};
pub use engine::{DeletionStats, DuplicateDetails, DuplicateStats, Engine, IngestionDisposition, OriginalIssueSummary};
pub use error::{EngineError, Result};
pub use geo::haversine_distance_meters;
pub use index::{ReportFilter, Storage};
pub use lifecycle::{FeedbackOutcome, LifecycleManager};
pub use report::{
    ArchiveTombstone, DuplicateFeedback, FeedbackKind, IngestInput, Location, Report, ReportStatus,
    ScoreComponents, ScoreWeights, ScheduledDeletion, SimilarityDetails, Upvote,
};
pub use sweeper::Sweeper;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::{
        DefaultTextEmbedder, Disposition, Engine, EngineConfig, EngineError, IngestInput, Location,
        Report, ReportStatus, Result, Storage, ZeroImageEmbedder,
    };
}
