use catalog::CatalogError;
use embed::EmbedError;
use index::IndexError;
use thiserror::Error;

/// Whole-build failures. Per-item problems never surface here; they are
/// recorded as [`SkipReason`](crate::SkipReason)s in the report.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("embedder error: {0}")]
    Embedder(#[from] EmbedError),
    #[error("store error: {0}")]
    Store(#[from] IndexError),
    #[error("worker pool error: {0}")]
    Pool(String),
    #[error("report write failed: {0}")]
    Report(String),
}
