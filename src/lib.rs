//! Workspace umbrella crate for prodmatch, the visual product matcher.
//!
//! The workspace splits along the data flow:
//!
//! ```text
//! catalog JSON ─▶ builder ─▶ index::StoreDir ─▶ ProductMatcher ─▶ ranked products
//!                   ▲                                ▲
//!                   └──────── embed::Embedder ───────┘
//! ```
//!
//! This crate re-exports the pieces and adds [`ProductMatcher`], which joins
//! store hits back to catalog records. The HTTP service in `crates/server`
//! is a thin shell around it.

pub use builder::{BuildError, BuildReport, BuilderConfig, IndexBuilder, SkipReason, SkippedItem};
pub use catalog::{Catalog, CatalogError, CatalogItem, ItemId};
pub use embed::{
    EmbedConfig, EmbedError, EmbedMode, Embedder, HistogramEmbedder, StubEmbedder, build_embedder,
};
pub use index::{
    EmbeddingStore, IndexError, SearchHit, SearchOptions, Snapshot, StoreDir, StoreHandle,
    l2_normalized, search,
};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Errors from matching an image against the catalog.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("embedding failed: {0}")]
    Embed(#[from] EmbedError),
    #[error("search failed: {0}")]
    Index(#[from] IndexError),
    /// The store was built by an embedder of a different dimensionality.
    #[error("store has {store_dim} dimensions but embedder {embedder} produces {embedder_dim}")]
    StoreMismatch {
        store_dim: usize,
        embedder_dim: usize,
        embedder: String,
    },
}

/// A catalog record with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMatch {
    pub product: CatalogItem,
    pub score: f32,
}

/// Query-side composition of catalog, store, and embedder.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct ProductMatcher {
    catalog: Arc<Catalog>,
    store: StoreHandle,
    embedder: Arc<dyn Embedder>,
}

impl ProductMatcher {
    /// Fails with [`MatchError::StoreMismatch`] when a non-empty store does
    /// not match the embedder's dimensionality.
    pub fn new(
        catalog: Catalog,
        store: StoreHandle,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, MatchError> {
        check_dimension(&store.store(), embedder.as_ref())?;
        Ok(Self {
            catalog: Arc::new(catalog),
            store,
            embedder,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Embed `image` and return the best catalog matches, best first.
    pub fn match_image(
        &self,
        image: &[u8],
        options: SearchOptions,
    ) -> Result<Vec<ProductMatch>, MatchError> {
        let query = embed::embed_checked(self.embedder.as_ref(), image)?;
        self.match_vector(&query, options)
    }

    /// Rank against an already computed query embedding.
    ///
    /// Hits whose id the catalog does not know are dropped, so fewer than `k`
    /// matches may come back.
    pub fn match_vector(
        &self,
        query: &[f32],
        options: SearchOptions,
    ) -> Result<Vec<ProductMatch>, MatchError> {
        let hits = self.store.search(query, options)?;
        let total = hits.len();
        let matches: Vec<ProductMatch> = hits
            .into_iter()
            .filter_map(|hit| {
                self.catalog.get(hit.id).map(|product| ProductMatch {
                    product: product.clone(),
                    score: hit.score,
                })
            })
            .collect();

        let dropped = total - matches.len();
        if dropped > 0 {
            tracing::warn!(dropped, "search hits missing from catalog were dropped");
        }
        Ok(matches)
    }

    /// Swap in the store's latest on-disk generation, refusing one the
    /// embedder cannot query.
    pub fn reload(&self) -> Result<Arc<Snapshot>, MatchError> {
        let embedder = self.embedder.as_ref();
        self.store
            .reload_validated(|store| {
                if store.is_empty() || store.dim() == embedder.dimension() {
                    return Ok(());
                }
                Err(IndexError::DimensionMismatch {
                    expected: embedder.dimension(),
                    actual: store.dim(),
                })
            })
            .map_err(|err| match err {
                // loading never yields this; only the check above does
                IndexError::DimensionMismatch { expected, actual } => MatchError::StoreMismatch {
                    store_dim: actual,
                    embedder_dim: expected,
                    embedder: embedder.name().to_string(),
                },
                other => other.into(),
            })
    }
}

fn check_dimension(store: &EmbeddingStore, embedder: &dyn Embedder) -> Result<(), MatchError> {
    if store.is_empty() || store.dim() == embedder.dimension() {
        return Ok(());
    }
    Err(MatchError::StoreMismatch {
        store_dim: store.dim(),
        embedder_dim: embedder.dimension(),
        embedder: embedder.name().to_string(),
    })
}
