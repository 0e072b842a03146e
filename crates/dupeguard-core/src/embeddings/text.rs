//! Text embedding providers.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::l2_normalize;

/// Maps a description string to a unit-length feature vector of fixed
/// dimension. Infallible: degraded input still returns a vector, possibly
/// the zero vector.
pub trait TextEmbedder: Send + Sync {
    fn embed(&self, text: &str) -> Vec<f32>;
    fn dims(&self) -> usize;
    /// Identifies the provider and model version, persisted alongside
    /// stored vectors so a provider swap can be detected and re-embedded.
    fn provider_version(&self) -> &str;
}

/// The always-available fallback text embedder: lowercase, split on
/// non-word characters, hash each token modulo the target dimension,
/// accumulate, then L2-normalize. Deterministic given its dimension.
pub struct DefaultTextEmbedder {
    dims: usize,
}

impl DefaultTextEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl TextEmbedder for DefaultTextEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut acc = vec![0.0f32; self.dims];
        let lowered = text.to_lowercase();
        let mut has_token = false;
        for token in lowered.split(|c: char| !c.is_alphanumeric() && c != '_') {
            if token.is_empty() {
                continue;
            }
            has_token = true;
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dims;
            acc[bucket] += 1.0;
        }
        if !has_token {
            return acc; // zero vector for empty input
        }
        l2_normalize(&mut acc);
        acc
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn provider_version(&self) -> &str {
        "default-text-v1"
    }
}
