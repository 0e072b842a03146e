//! Embedding providers.
//!
//! Pure mappings from report inputs to unit-length feature vectors. No
//! network calls required — the default providers are fully local and
//! deterministic; an optional `fastembed`-backed image provider is
//! available behind the `embeddings` cargo feature for environments with
//! an ONNX runtime available.

mod image;
mod text;

pub use image::{ImageEmbedder, ZeroImageEmbedder};
pub use text::{DefaultTextEmbedder, TextEmbedder};

#[cfg(feature = "embeddings")]
pub use image::FastEmbedImageEmbedder;

/// Cosine similarity between two vectors. Zero vectors (and dimension
/// mismatches) are defined to have similarity 0, per the scorer's numeric
/// semantics.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| *x as f64 * *x as f64).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| *x as f64 * *x as f64).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| *x as f64 * *x as f64).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x = (*x as f64 / norm) as f32;
        }
    }
}
