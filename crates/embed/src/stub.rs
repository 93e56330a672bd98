use fxhash::hash64;

use crate::{EmbedError, Embedder};

/// Deterministic stand-in for a real model.
///
/// The vector is derived from a hash of the raw bytes, so identical files map to
/// identical vectors and different files almost surely differ. Nothing is
/// decoded, which makes it usable on arbitrary payloads in tests.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    dim: usize,
}

impl StubEmbedder {
    pub fn new(dim: usize) -> Result<Self, EmbedError> {
        if dim == 0 {
            return Err(EmbedError::InvalidConfig("dim must be at least 1".into()));
        }
        Ok(Self { dim })
    }
}

impl Embedder for StubEmbedder {
    fn name(&self) -> &str {
        "stub"
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn embed(&self, image: &[u8]) -> Result<Vec<f32>, EmbedError> {
        if image.is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        let h = hash64(image);
        let vector = (0..self.dim)
            .map(|idx| {
                let mixed = h.rotate_left((idx % 64) as u32)
                    ^ (idx as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
                let mixed = mixed ^ (mixed >> 29);
                // top 24 bits mapped onto [-1, 1)
                ((mixed >> 40) as f32 / (1u64 << 23) as f32) - 1.0
            })
            .collect();
        Ok(vector)
    }
}
