use thiserror::Error;

/// Errors surfaced by [`Embedder`](crate::Embedder) implementations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmbedError {
    /// No image bytes were supplied.
    #[error("empty image payload")]
    EmptyInput,
    /// The bytes could not be decoded as a supported image format.
    #[error("image decode failed: {0}")]
    Decode(String),
    /// Configuration is inconsistent (e.g. zero dimensions).
    #[error("invalid embed config: {0}")]
    InvalidConfig(String),
    /// The model produced output of the wrong length.
    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Model-side failure for embedders backed by an external runtime.
    #[error("inference failure: {0}")]
    Inference(String),
}

impl From<image::ImageError> for EmbedError {
    fn from(err: image::ImageError) -> Self {
        EmbedError::Decode(err.to_string())
    }
}
