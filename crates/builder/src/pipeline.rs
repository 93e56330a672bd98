use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use catalog::{Catalog, CatalogItem};
use embed::{Embedder, EmbedError};
use index::{l2_normalize_in_place, EmbeddingStore, StoreDir};
use rayon::prelude::*;

use crate::{BuildError, BuildReport, SkipReason, SkippedItem};

/// Embeds a catalog and writes the resulting store.
///
/// Items are embedded on a dedicated, bounded rayon pool. Results are
/// reassembled in catalog order, so the store layout never depends on which
/// worker finished first.
pub struct IndexBuilder {
    embedder: Arc<dyn Embedder>,
    workers: usize,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            workers: 1,
        }
    }

    /// Number of embedding workers (minimum 1).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Embed every item of `catalog`, skipping failures, then save the
    /// survivors to `store_dir` as one new generation.
    pub fn build(
        &self,
        catalog: &Catalog,
        image_root: &Path,
        store_dir: &StoreDir,
    ) -> Result<BuildReport, BuildError> {
        let started = Instant::now();
        let dim = self.embedder.dimension();
        tracing::info!(
            items = catalog.len(),
            embedder = self.embedder.name(),
            dim,
            workers = self.workers,
            "index build started"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("prodmatch-embed-{i}"))
            .build()
            .map_err(|e| BuildError::Pool(e.to_string()))?;

        let embedder = self.embedder.as_ref();
        let outcomes: Vec<Result<Vec<f32>, SkipReason>> = pool.install(|| {
            catalog
                .items()
                .par_iter()
                .map(|item| embed_item(embedder, image_root, item))
                .collect()
        });

        let mut ids = Vec::with_capacity(outcomes.len());
        let mut vectors = Vec::with_capacity(outcomes.len());
        let mut skipped = Vec::new();
        for (item, outcome) in catalog.items().iter().zip(outcomes) {
            match outcome {
                Ok(vector) => {
                    ids.push(item.id);
                    vectors.push(vector);
                }
                Err(reason) => {
                    tracing::warn!(id = item.id, %reason, "skipping catalog item");
                    skipped.push(SkippedItem {
                        id: item.id,
                        reason,
                    });
                }
            }
        }

        let indexed = ids.len();
        let store = if vectors.is_empty() {
            EmbeddingStore::empty(dim)
        } else {
            EmbeddingStore::new(dim, ids, &vectors)?
        };
        let generation = store_dir.save_store(&store)?;

        let report = BuildReport {
            total: catalog.len(),
            indexed,
            skipped,
            dim,
            embedder: self.embedder.name().to_string(),
            generation,
            elapsed: started.elapsed(),
        };
        if report.is_empty() {
            tracing::warn!(
                total = report.total,
                "index build produced an empty store; every item was skipped"
            );
        } else {
            tracing::info!(
                indexed = report.indexed,
                skipped = report.skipped.len(),
                generation = %report.generation,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "index build complete"
            );
        }
        Ok(report)
    }
}

/// Read, embed, and normalize one item's image.
pub fn embed_item(
    embedder: &dyn Embedder,
    image_root: &Path,
    item: &CatalogItem,
) -> Result<Vec<f32>, SkipReason> {
    let path = Catalog::resolve_image(image_root, item);
    let bytes = std::fs::read(&path).map_err(|err| {
        let path = path.display().to_string();
        match err.kind() {
            io::ErrorKind::NotFound => SkipReason::MissingImage { path },
            _ => SkipReason::ImageRead {
                path,
                message: err.to_string(),
            },
        }
    })?;

    let mut vector = embed::embed_checked(embedder, &bytes).map_err(|err| match err {
        EmbedError::DimensionMismatch { expected, actual } => {
            SkipReason::DimensionMismatch { expected, actual }
        }
        other => SkipReason::Embedding {
            message: other.to_string(),
        },
    })?;
    l2_normalize_in_place(&mut vector).map_err(|_| SkipReason::Degenerate)?;
    Ok(vector)
}
