//! Local color-histogram embedder.
//!
//! Decodes the image, downsizes it if needed, and counts pixels in a joint RGB
//! grid of `bins^3` cells. Counts are divided by the pixel total and square
//! rooted, so the cosine between two outputs is the Bhattacharyya coefficient
//! of the two color distributions.

use image::GenericImageView;

use crate::{EmbedError, Embedder};

#[derive(Debug, Clone)]
pub struct HistogramEmbedder {
    bins: u32,
    max_side: u32,
}

impl HistogramEmbedder {
    pub fn new(bins_per_channel: u32, max_side: u32) -> Result<Self, EmbedError> {
        if !(1..=16).contains(&bins_per_channel) {
            return Err(EmbedError::InvalidConfig(format!(
                "bins_per_channel must be within 1..=16, got {bins_per_channel}"
            )));
        }
        if max_side == 0 {
            return Err(EmbedError::InvalidConfig("max_side must be at least 1".into()));
        }
        Ok(Self {
            bins: bins_per_channel,
            max_side,
        })
    }

    #[inline]
    fn bin(&self, channel: u8) -> usize {
        (channel as u32 * self.bins / 256) as usize
    }
}

impl Embedder for HistogramEmbedder {
    fn name(&self) -> &str {
        "histogram"
    }

    fn dimension(&self) -> usize {
        (self.bins as usize).pow(3)
    }

    fn embed(&self, image: &[u8]) -> Result<Vec<f32>, EmbedError> {
        if image.is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        let mut decoded = image::load_from_memory(image)?;
        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err(EmbedError::Decode("image has no pixels".into()));
        }
        if width > self.max_side || height > self.max_side {
            decoded = decoded.thumbnail(self.max_side, self.max_side);
        }
        let rgb = decoded.to_rgb8();

        let bins = self.bins as usize;
        let mut counts = vec![0u32; self.dimension()];
        for pixel in rgb.pixels() {
            let [r, g, b] = pixel.0;
            counts[self.bin(r) * bins * bins + self.bin(g) * bins + self.bin(b)] += 1;
        }

        let total = (rgb.width() as f32) * (rgb.height() as f32);
        Ok(counts
            .into_iter()
            .map(|count| (count as f32 / total).sqrt())
            .collect())
    }
}
