use serde::{Deserialize, Serialize};

use crate::EmbedError;

/// Which embedder implementation to construct.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbedMode {
    /// Joint RGB color histogram computed from the decoded image.
    #[default]
    Histogram,
    /// Deterministic content-hash vectors; no decoding. For tests and dry runs.
    Stub,
}

/// Runtime configuration for the embedding collaborator.
///
/// # Example
/// ```
/// use embed::{EmbedConfig, EmbedMode};
///
/// let cfg = EmbedConfig {
///     mode: EmbedMode::Stub,
///     dim: 64,
///     ..Default::default()
/// };
/// assert_eq!(cfg.dimension(), 64);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbedConfig {
    /// Implementation selector.
    pub mode: EmbedMode,
    /// Output dimensionality of the stub embedder.
    pub dim: usize,
    /// Bins per color channel for the histogram embedder; the vector has
    /// `bins_per_channel^3` dimensions.
    pub bins_per_channel: u32,
    /// Images larger than this on either side are downscaled before binning.
    pub max_side: u32,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            mode: EmbedMode::Histogram,
            dim: 512,
            bins_per_channel: 8,
            max_side: 256,
        }
    }
}

impl EmbedConfig {
    /// Dimensionality produced by the configured embedder.
    pub fn dimension(&self) -> usize {
        match self.mode {
            EmbedMode::Stub => self.dim,
            EmbedMode::Histogram => (self.bins_per_channel as usize).pow(3),
        }
    }

    pub fn validate(&self) -> Result<(), EmbedError> {
        match self.mode {
            EmbedMode::Stub if self.dim == 0 => {
                Err(EmbedError::InvalidConfig("dim must be at least 1".into()))
            }
            EmbedMode::Histogram if !(1..=16).contains(&self.bins_per_channel) => {
                Err(EmbedError::InvalidConfig(format!(
                    "bins_per_channel must be within 1..=16, got {}",
                    self.bins_per_channel
                )))
            }
            EmbedMode::Histogram if self.max_side == 0 => {
                Err(EmbedError::InvalidConfig("max_side must be at least 1".into()))
            }
            _ => Ok(()),
        }
    }
}
