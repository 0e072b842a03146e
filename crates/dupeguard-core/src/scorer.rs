//! Similarity scoring between a new report and a single candidate.

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::embeddings::cosine_similarity;
use crate::geo::haversine_distance_meters;
use crate::report::{Report, ScoreComponents, ScoreWeights, SimilarityDetails};

/// Stateless scorer over a fixed configuration (weights, thresholds, windows).
#[derive(Debug, Clone, Copy)]
pub struct SimilarityScorer {
    max_distance_meters: f64,
    time_window_days: i64,
    weights: ScoreWeights,
}

impl SimilarityScorer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_distance_meters: config.max_distance_meters,
            time_window_days: config.time_window_days,
            weights: config.weights,
        }
    }

    /// Scores `candidate` against `new_report` as of `now`, returning the
    /// full breakdown used both for thresholding and for explainability.
    pub fn score(&self, new_report: &Report, candidate: &Report, now: DateTime<Utc>) -> SimilarityDetails {
        let distance = haversine_distance_meters(new_report.location, candidate.location);
        let location = (1.0 - distance / self.max_distance_meters).clamp(0.0, 1.0);

        let text = self.text_component(new_report, candidate);
        let (image, weights) = self.image_component_and_weights(new_report, candidate);

        let window_secs = self.time_window_days as f64 * 86_400.0;
        let age_secs = (now - candidate.created_at).num_seconds() as f64;
        let recency = (1.0 - age_secs / window_secs).clamp(0.0, 1.0);

        let components = ScoreComponents {
            location,
            text,
            image,
            recency,
        };

        let overall_score = weights.location * components.location
            + weights.text * components.text
            + weights.image * components.image
            + weights.recency * components.recency;

        SimilarityDetails {
            overall_score,
            components,
            weights,
        }
    }

    fn text_component(&self, new_report: &Report, candidate: &Report) -> f64 {
        match (new_report.text_vector.as_ref(), candidate.text_vector.as_ref()) {
            (Some(a), Some(b)) => cosine_similarity(a, b).max(0.0),
            _ => 0.0,
        }
    }

    /// Computes the image component and redistributes its weight to the
    /// remaining three components proportionally when either side has no
    /// usable image signal: no vectors at all, or nothing but zero vectors.
    /// A failed or degraded embedding is treated as an absent one, not as a
    /// genuine zero-similarity comparison.
    fn image_component_and_weights(&self, new_report: &Report, candidate: &Report) -> (f64, ScoreWeights) {
        if lacks_image_signal(&new_report.image_vectors) || lacks_image_signal(&candidate.image_vectors) {
            return (0.0, redistribute_away_from_image(self.weights));
        }

        let maxima: Vec<f64> = new_report
            .image_vectors
            .iter()
            .map(|v| {
                candidate
                    .image_vectors
                    .iter()
                    .map(|u| cosine_similarity(v, u))
                    .fold(f64::MIN, f64::max)
            })
            .collect();

        let image = maxima.iter().sum::<f64>() / maxima.len() as f64;
        (image.max(0.0), self.weights)
    }
}

/// True when `vectors` carries no usable image signal: empty, or every
/// vector in it is the all-zero "embedding failed" sentinel.
fn lacks_image_signal(vectors: &[Vec<f32>]) -> bool {
    vectors.is_empty() || vectors.iter().all(|v| v.iter().all(|x| *x == 0.0))
}

fn redistribute_away_from_image(weights: ScoreWeights) -> ScoreWeights {
    let remaining = weights.location + weights.text + weights.recency;
    if remaining <= 0.0 {
        return weights;
    }
    let scale = (remaining + weights.image) / remaining;
    ScoreWeights {
        location: weights.location * scale,
        text: weights.text * scale,
        image: 0.0,
        recency: weights.recency * scale,
    }
}
