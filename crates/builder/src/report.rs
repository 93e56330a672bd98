use std::fmt;
use std::path::Path;
use std::time::Duration;

use catalog::ItemId;
use serde::{Deserialize, Serialize};

use crate::BuildError;

/// Why a catalog item was left out of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The resolved image file does not exist.
    MissingImage { path: String },
    /// The image exists but could not be read.
    ImageRead { path: String, message: String },
    /// The embedder rejected the bytes.
    Embedding { message: String },
    /// The embedding had zero or non-finite norm.
    Degenerate,
    /// The embedding length differs from the embedder's dimension.
    DimensionMismatch { expected: usize, actual: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingImage { path } => write!(f, "image not found: {path}"),
            SkipReason::ImageRead { path, message } => write!(f, "cannot read {path}: {message}"),
            SkipReason::Embedding { message } => write!(f, "embedding failed: {message}"),
            SkipReason::Degenerate => f.write_str("degenerate embedding"),
            SkipReason::DimensionMismatch { expected, actual } => {
                write!(f, "embedding has {actual} dimensions, expected {expected}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub id: ItemId,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Outcome of one index build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    /// Catalog items considered.
    pub total: usize,
    /// Items written to the store.
    pub indexed: usize,
    pub skipped: Vec<SkippedItem>,
    pub dim: usize,
    pub embedder: String,
    /// Store generation made live by this build.
    pub generation: String,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl BuildReport {
    /// True when no item made it into the store.
    pub fn is_empty(&self) -> bool {
        self.indexed == 0
    }

    pub fn write_json(&self, path: &Path) -> Result<(), BuildError> {
        let json =
            serde_json::to_vec_pretty(self).map_err(|e| BuildError::Report(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| BuildError::Report(format!("{}: {e}", path.display())))
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
