//! prodmatch embedding collaborators
//!
//! The model that turns an image into a vector sits behind the [`Embedder`]
//! trait. Both the index builder and the query service receive an explicitly
//! constructed `Arc<dyn Embedder>`; nothing here is loaded into global state.
//!
//! Two implementations ship with the crate:
//!
//! - **Histogram** - decodes PNG/JPEG/WebP and returns a joint RGB histogram
//!   (`bins^3` dimensions, 512 by default).
//! - **Stub** - hashes the raw bytes into a reproducible vector. Never decodes,
//!   so it is handy in tests.
//!
//! Embedders return raw vectors. Normalization to unit length is the caller's
//! job (the builder and the search engine both normalize).
//!
//! ```
//! use embed::{build_embedder, EmbedConfig, EmbedMode};
//!
//! let cfg = EmbedConfig { mode: EmbedMode::Stub, dim: 16, ..Default::default() };
//! let embedder = build_embedder(&cfg).unwrap();
//! let vector = embedder.embed(b"raw image bytes").unwrap();
//! assert_eq!(vector.len(), 16);
//! ```

pub mod config;
pub mod error;

mod histogram;
mod stub;

pub use crate::config::{EmbedConfig, EmbedMode};
pub use crate::error::EmbedError;
pub use crate::histogram::HistogramEmbedder;
pub use crate::stub::StubEmbedder;

use std::sync::Arc;

/// Image-to-vector function shared by indexing and querying.
///
/// Implementations must be deterministic for identical bytes and must report
/// failures (unreadable image, model error) as [`EmbedError`], never panic.
pub trait Embedder: Send + Sync {
    /// Short label surfaced in logs and build reports.
    fn name(&self) -> &str;
    /// Length of every vector returned by [`embed`](Self::embed).
    fn dimension(&self) -> usize;
    /// Embed raw image bytes.
    fn embed(&self, image: &[u8]) -> Result<Vec<f32>, EmbedError>;
}

/// Construct the embedder described by `cfg`.
pub fn build_embedder(cfg: &EmbedConfig) -> Result<Arc<dyn Embedder>, EmbedError> {
    cfg.validate()?;
    let embedder: Arc<dyn Embedder> = match cfg.mode {
        EmbedMode::Stub => Arc::new(StubEmbedder::new(cfg.dim)?),
        EmbedMode::Histogram => Arc::new(HistogramEmbedder::new(
            cfg.bins_per_channel,
            cfg.max_side,
        )?),
    };
    tracing::info!(
        embedder = embedder.name(),
        dimension = embedder.dimension(),
        "embedder ready"
    );
    Ok(embedder)
}

/// Embed and check that the output length matches the advertised dimension.
pub fn embed_checked(embedder: &dyn Embedder, image: &[u8]) -> Result<Vec<f32>, EmbedError> {
    let vector = embedder.embed(image)?;
    if vector.len() != embedder.dimension() {
        return Err(EmbedError::DimensionMismatch {
            expected: embedder.dimension(),
            actual: vector.len(),
        });
    }
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ShortEmbedder;

    impl Embedder for ShortEmbedder {
        fn name(&self) -> &str {
            "short"
        }

        fn dimension(&self) -> usize {
            4
        }

        fn embed(&self, _image: &[u8]) -> Result<Vec<f32>, EmbedError> {
            Ok(vec![1.0, 0.0])
        }
    }

    #[test]
    fn build_respects_mode() {
        let stub = build_embedder(&EmbedConfig {
            mode: EmbedMode::Stub,
            dim: 7,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(stub.name(), "stub");
        assert_eq!(stub.dimension(), 7);

        let histogram = build_embedder(&EmbedConfig::default()).unwrap();
        assert_eq!(histogram.name(), "histogram");
        assert_eq!(histogram.dimension(), 512);
    }

    #[test]
    fn build_rejects_invalid_config() {
        let cfg = EmbedConfig {
            bins_per_channel: 0,
            ..Default::default()
        };
        assert!(build_embedder(&cfg).is_err());
    }

    #[test]
    fn embed_checked_catches_wrong_length() {
        let err = embed_checked(&ShortEmbedder, b"x").unwrap_err();
        assert_eq!(
            err,
            EmbedError::DimensionMismatch {
                expected: 4,
                actual: 2
            }
        );
    }
}
