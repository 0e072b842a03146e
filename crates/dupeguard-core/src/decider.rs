//! Classifies a new report against a candidate set.

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::report::{Report, SimilarityDetails};
use crate::scorer::SimilarityScorer;

/// The decider's classification of a new report.
#[derive(Debug, Clone)]
pub enum Disposition {
    /// No candidate scored at or above `T_SOFT`.
    New,
    /// `T_SOFT <= composite < T_HARD`: persisted with a link to `target_id`.
    Soft {
        target_id: String,
        details: SimilarityDetails,
    },
    /// `composite >= T_HARD`: the new report is not persisted independently.
    Hard {
        target_id: String,
        details: SimilarityDetails,
    },
}

/// Consumes scorer output over a candidate set and classifies the result.
pub struct DuplicateDecider {
    scorer: SimilarityScorer,
    t_hard: f64,
    t_soft: f64,
}

impl DuplicateDecider {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            scorer: SimilarityScorer::new(config),
            t_hard: config.t_hard,
            t_soft: config.t_soft,
        }
    }

    /// Selects the single best-matching candidate (by composite score, tied
    /// by smaller geo distance then earlier `created_at`) and classifies the
    /// new report against it. An empty candidate set is `New` by definition.
    pub fn decide(&self, new_report: &Report, candidates: &[Report], now: DateTime<Utc>) -> Disposition {
        let mut best: Option<(&Report, SimilarityDetails)> = None;

        for candidate in candidates {
            let details = self.scorer.score(new_report, candidate, now);
            best = match best {
                None => Some((candidate, details)),
                Some((best_candidate, best_details)) => {
                    if self.is_better(new_report, candidate, &details, best_candidate, &best_details) {
                        Some((candidate, details))
                    } else {
                        Some((best_candidate, best_details))
                    }
                }
            };
        }

        match best {
            None => Disposition::New,
            Some((candidate, details)) if details.overall_score >= self.t_hard => Disposition::Hard {
                target_id: candidate.id.clone(),
                details,
            },
            Some((candidate, details)) if details.overall_score >= self.t_soft => Disposition::Soft {
                target_id: candidate.id.clone(),
                details,
            },
            Some(_) => Disposition::New,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn is_better(
        &self,
        new_report: &Report,
        candidate: &Report,
        details: &SimilarityDetails,
        best_candidate: &Report,
        best_details: &SimilarityDetails,
    ) -> bool {
        if details.overall_score != best_details.overall_score {
            return details.overall_score > best_details.overall_score;
        }
        let d1 = crate::geo::haversine_distance_meters(new_report.location, candidate.location);
        let d2 = crate::geo::haversine_distance_meters(new_report.location, best_candidate.location);
        if d1 != d2 {
            return d1 < d2;
        }
        candidate.created_at < best_candidate.created_at
    }
}
