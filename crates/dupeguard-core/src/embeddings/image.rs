//! Image embedding providers.

/// Maps decoded photo bytes to a unit-length feature vector of fixed
/// dimension. Infallible: on any failure (decode error, model unavailable)
/// implementations return the zero vector, which the scorer treats as "no
/// image signal".
pub trait ImageEmbedder: Send + Sync {
    fn embed(&self, photo_bytes: &[u8]) -> Vec<f32>;
    fn dims(&self) -> usize;
    fn provider_version(&self) -> &str;
}

/// Default image provider: always returns the zero vector. Safe by
/// default — no model weights, no ONNX runtime, no network dependency.
/// Swap in [`FastEmbedImageEmbedder`] (behind the `embeddings` feature)
/// for real image signal.
pub struct ZeroImageEmbedder {
    dims: usize,
}

impl ZeroImageEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl ImageEmbedder for ZeroImageEmbedder {
    fn embed(&self, _photo_bytes: &[u8]) -> Vec<f32> {
        vec![0.0; self.dims]
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn provider_version(&self) -> &str {
        "zero-image-v1"
    }
}

/// Local ONNX-backed image embedder using fastembed's image pipeline.
/// Falls back to the zero vector on any internal error rather than
/// propagating: embedding failure is a degraded signal, never a hard
/// error for the engine.
#[cfg(feature = "embeddings")]
pub struct FastEmbedImageEmbedder {
    model: std::sync::Mutex<fastembed::ImageEmbedding>,
    dims: usize,
}

#[cfg(feature = "embeddings")]
impl FastEmbedImageEmbedder {
    pub fn try_new(dims: usize) -> crate::Result<Self> {
        let cache_dir = embedding_cache_dir();
        if let Err(e) = std::fs::create_dir_all(&cache_dir) {
            tracing::warn!("failed to create embedding cache dir {:?}: {}", cache_dir, e);
        }
        let options = fastembed::ImageInitOptions::new(fastembed::ImageEmbeddingModel::ClipVitB32)
            .with_cache_dir(cache_dir)
            .with_show_download_progress(true);
        let model = fastembed::ImageEmbedding::try_new(options).map_err(|e| {
            crate::EngineError::DependencyUnavailable(format!(
                "failed to initialize image embedding model: {e}"
            ))
        })?;
        Ok(Self {
            model: std::sync::Mutex::new(model),
            dims,
        })
    }
}

#[cfg(feature = "embeddings")]
impl ImageEmbedder for FastEmbedImageEmbedder {
    fn embed(&self, photo_bytes: &[u8]) -> Vec<f32> {
        let tmp = match write_temp_image(photo_bytes) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("failed to stage photo for embedding: {e}");
                return vec![0.0; self.dims];
            }
        };

        let result = self
            .model
            .lock()
            .map_err(|_| "embedding model lock poisoned".to_string())
            .and_then(|mut m| m.embed(vec![tmp.clone()], None).map_err(|e| e.to_string()));

        let _ = std::fs::remove_file(&tmp);

        match result {
            Ok(mut vectors) if !vectors.is_empty() => vectors.remove(0),
            Ok(_) => {
                tracing::warn!("image embedding model returned no vectors");
                vec![0.0; self.dims]
            }
            Err(e) => {
                tracing::warn!("image embedding failed, degrading to zero vector: {e}");
                vec![0.0; self.dims]
            }
        }
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn provider_version(&self) -> &str {
        "fastembed:clip-vit-b-32"
    }
}

#[cfg(feature = "embeddings")]
fn embedding_cache_dir() -> std::path::PathBuf {
    if let Ok(path) = std::env::var("DUPEGUARD_EMBEDDING_CACHE") {
        return std::path::PathBuf::from(path);
    }
    if let Some(proj_dirs) = directories::ProjectDirs::from("com", "dupeguard", "core") {
        return proj_dirs.cache_dir().join("fastembed");
    }
    std::path::PathBuf::from(".dupeguard_embedding_cache")
}

#[cfg(feature = "embeddings")]
fn write_temp_image(bytes: &[u8]) -> std::io::Result<std::path::PathBuf> {
    let mut path = std::env::temp_dir();
    path.push(format!("dupeguard-photo-{}.bin", uuid::Uuid::new_v4()));
    std::fs::write(&path, bytes)?;
    Ok(path)
}
