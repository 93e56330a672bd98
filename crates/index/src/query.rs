use std::cmp::Ordering;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::normalize::{dot, is_unit, l2_normalized};
use crate::store::EmbeddingStore;
use crate::{IndexError, ItemId};

/// Stores at or above this many rows are scored in parallel.
pub const PARALLEL_SCAN_THRESHOLD: usize = 4096;

/// One ranked result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ItemId,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
}

/// Ranking knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub k: usize,
    /// Drop hits scoring below this value, applied after ranking.
    pub min_score: Option<f32>,
}

impl SearchOptions {
    pub fn top(k: usize) -> Self {
        Self { k, min_score: None }
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::top(5)
    }
}

/// Rank `vectors` by cosine similarity to `query` and return the best `k`.
///
/// `vectors` must be unit length and aligned with `ids`. Results are ordered
/// by descending score; equal scores keep their relative order in `vectors`.
pub fn search(
    query: &[f32],
    k: usize,
    vectors: &[Vec<f32>],
    ids: &[ItemId],
) -> Result<Vec<SearchHit>, IndexError> {
    if ids.len() != vectors.len() {
        return Err(IndexError::ShapeMismatch {
            ids: ids.len(),
            vectors: vectors.len(),
        });
    }
    if k == 0 || vectors.is_empty() {
        return Ok(Vec::new());
    }
    let dim = vectors[0].len();
    if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
        return Err(IndexError::DimensionMismatch {
            expected: dim,
            actual: bad.len(),
        });
    }
    let query = prepare_query(query, dim)?;
    let scores: Vec<f32> = vectors.iter().map(|v| clamp_score(dot(&query, v))).collect();
    Ok(rank(scores, ids, SearchOptions::top(k)))
}

impl EmbeddingStore {
    /// Top-`k` search against this store.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        self.search_with(query, SearchOptions::top(k))
    }

    /// Search with explicit [`SearchOptions`].
    pub fn search_with(
        &self,
        query: &[f32],
        options: SearchOptions,
    ) -> Result<Vec<SearchHit>, IndexError> {
        if options.k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        let query = prepare_query(query, self.dim())?;
        let scores = score_rows(self.data(), self.dim(), &query);
        Ok(rank(scores, self.ids(), options))
    }
}

/// Check the query's dimensionality and bring it to unit length.
fn prepare_query(query: &[f32], dim: usize) -> Result<Vec<f32>, IndexError> {
    if query.len() != dim {
        return Err(IndexError::DimensionMismatch {
            expected: dim,
            actual: query.len(),
        });
    }
    if query.iter().all(|v| v.is_finite()) && is_unit(query) {
        return Ok(query.to_vec());
    }
    l2_normalized(query)
}

fn score_rows(data: &[f32], dim: usize, query: &[f32]) -> Vec<f32> {
    let rows = data.len() / dim;
    if rows >= PARALLEL_SCAN_THRESHOLD {
        data.par_chunks_exact(dim)
            .map(|row| clamp_score(dot(query, row)))
            .collect()
    } else {
        data.chunks_exact(dim)
            .map(|row| clamp_score(dot(query, row)))
            .collect()
    }
}

/// Rounding can push a unit-vector dot product just past 1.
fn clamp_score(score: f32) -> f32 {
    let score = score.clamp(-1.0, 1.0);
    // -0.0 would otherwise sort below 0.0 under total_cmp
    if score == 0.0 {
        0.0
    } else {
        score
    }
}

/// Descending score, then ascending store position.
fn by_rank(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

fn rank(scores: Vec<f32>, ids: &[ItemId], options: SearchOptions) -> Vec<SearchHit> {
    let mut scored: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
    let k = options.k.min(scored.len());
    if k < scored.len() {
        scored.select_nth_unstable_by(k - 1, by_rank);
        scored.truncate(k);
    }
    scored.sort_unstable_by(by_rank);

    scored
        .into_iter()
        .filter(|(_, score)| options.min_score.map_or(true, |min| *score >= min))
        .map(|(position, score)| SearchHit {
            id: ids[position],
            score,
        })
        .collect()
}
