use thiserror::Error;

/// Errors surfaced by the embedding store and the search engine.
///
/// Load-time variants (`NotFound`, `Corrupt`) are fatal for a query service:
/// it must refuse to serve rather than rank against a store whose ids and
/// vectors may be out of alignment. Query-time variants (`DimensionMismatch`,
/// `DegenerateVector`) go back to the caller unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    /// The store artifact (or one half of the pair) does not exist.
    #[error("store artifact not found: {path}")]
    NotFound { path: String },
    /// Artifacts exist but are structurally inconsistent.
    #[error("store is corrupt: {0}")]
    Corrupt(String),
    /// `ids` and `vectors` have different lengths.
    #[error("{ids} ids but {vectors} vectors")]
    ShapeMismatch { ids: usize, vectors: usize },
    /// A vector does not have the store's dimensionality.
    #[error("vector has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Zero, near-zero, or non-finite vector; its direction is undefined.
    #[error("degenerate vector: norm is zero or not finite")]
    DegenerateVector,
    /// A stored vector contains NaN or infinity.
    #[error("vector at position {position} contains a non-finite value")]
    NonFinite { position: usize },
    /// A stored vector is not unit length.
    #[error("vector at position {position} is not unit length (norm {norm})")]
    NotNormalized { position: usize, norm: f32 },
    /// Filesystem failure while reading or writing artifacts.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Io(e.to_string())
    }
}

impl IndexError {
    pub fn corrupt<E: std::fmt::Display>(err: E) -> Self {
        Self::Corrupt(err.to_string())
    }

    /// True for errors caused by the caller's input rather than the store.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            IndexError::DimensionMismatch { .. } | IndexError::DegenerateVector
        )
    }
}
