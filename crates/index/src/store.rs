//! The embedding store: `N` unit vectors aligned 1:1 with `N` item ids, and
//! its on-disk form.
//!
//! A store directory holds one subdirectory per saved generation plus a
//! `CURRENT` pointer naming the live one:
//!
//! ```text
//! <root>/CURRENT            "gen-000002"
//! <root>/gen-000001/...     previous generation, kept for rollback
//! <root>/gen-000002/vectors.bin
//! <root>/gen-000002/ids.json
//! ```
//!
//! A save writes the whole pair into a fresh generation and only then
//! replaces `CURRENT` by rename, so a reader sees the old pair or the new pair
//! and never one half of each.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::format::{decode_vectors, encode_vectors};
use crate::normalize::{l2_norm, UNIT_TOLERANCE};
use crate::{IndexError, ItemId};

pub const CURRENT_FILE: &str = "CURRENT";
pub const VECTORS_FILE: &str = "vectors.bin";
pub const IDS_FILE: &str = "ids.json";

const GENERATION_PREFIX: &str = "gen-";

/// Immutable, validated set of aligned `(id, vector)` rows.
///
/// Vectors are kept in one dense row-major block so a scan walks contiguous
/// memory.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingStore {
    dim: usize,
    ids: Vec<ItemId>,
    data: Vec<f32>,
}

impl EmbeddingStore {
    /// Build a store from aligned sequences.
    ///
    /// Fails with `ShapeMismatch` when the lengths differ, `DimensionMismatch`
    /// when a vector is not `dim` long, `DegenerateVector` for zero-length
    /// rows, `NonFinite` on NaN/inf, and `NotNormalized` when a vector is not
    /// unit length.
    pub fn new(dim: usize, ids: Vec<ItemId>, vectors: &[Vec<f32>]) -> Result<Self, IndexError> {
        if ids.len() != vectors.len() {
            return Err(IndexError::ShapeMismatch {
                ids: ids.len(),
                vectors: vectors.len(),
            });
        }
        if dim == 0 {
            match vectors.first() {
                None => {}
                Some(first) if first.is_empty() => return Err(IndexError::DegenerateVector),
                Some(first) => {
                    return Err(IndexError::DimensionMismatch {
                        expected: 0,
                        actual: first.len(),
                    })
                }
            }
        }
        let mut data = Vec::with_capacity(vectors.len() * dim);
        for (position, vector) in vectors.iter().enumerate() {
            validate_row(position, dim, vector)?;
            data.extend_from_slice(vector);
        }
        Ok(Self { dim, ids, data })
    }

    /// Build a store from aligned sequences, taking `D` from the first vector.
    /// An empty input yields an empty, zero-dimensional store.
    pub fn from_vectors(ids: Vec<ItemId>, vectors: &[Vec<f32>]) -> Result<Self, IndexError> {
        let dim = vectors.first().map_or(0, Vec::len);
        Self::new(dim, ids, vectors)
    }

    /// An empty store of the given dimensionality.
    pub fn empty(dim: usize) -> Self {
        Self {
            dim,
            ids: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Reassemble a store from decoded artifacts. Any inconsistency is `Corrupt`.
    fn from_artifacts(dim: usize, ids: Vec<ItemId>, data: Vec<f32>) -> Result<Self, IndexError> {
        let rows = if dim == 0 { 0 } else { data.len() / dim };
        if rows * dim != data.len() {
            return Err(IndexError::corrupt("vector block is ragged"));
        }
        if ids.len() != rows {
            return Err(IndexError::corrupt(format!(
                "{} ids but {rows} vectors",
                ids.len()
            )));
        }
        for (position, row) in data.chunks_exact(dim.max(1)).enumerate().take(rows) {
            let norm = l2_norm(row);
            if (norm - 1.0).abs() > UNIT_TOLERANCE {
                return Err(IndexError::corrupt(format!(
                    "row {position} has norm {norm}, expected unit length"
                )));
            }
        }
        Ok(Self { dim, ids, data })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    /// The dense row-major vector block.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Vector at `position`, if any.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        if position >= self.len() {
            return None;
        }
        let start = position * self.dim;
        Some(&self.data[start..start + self.dim])
    }

    /// Rows in store order.
    pub fn rows(&self) -> impl Iterator<Item = (ItemId, &[f32])> {
        self.ids
            .iter()
            .copied()
            .zip(self.data.chunks_exact(self.dim.max(1)))
    }

    /// Split into the two aligned sequences.
    pub fn into_parts(self) -> (Vec<ItemId>, Vec<Vec<f32>>) {
        let vectors = self
            .data
            .chunks_exact(self.dim.max(1))
            .map(<[f32]>::to_vec)
            .collect();
        (self.ids, vectors)
    }
}

fn validate_row(position: usize, dim: usize, vector: &[f32]) -> Result<(), IndexError> {
    if vector.len() != dim {
        return Err(IndexError::DimensionMismatch {
            expected: dim,
            actual: vector.len(),
        });
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(IndexError::NonFinite { position });
    }
    let norm = l2_norm(vector);
    if (norm - 1.0).abs() > UNIT_TOLERANCE {
        return Err(IndexError::NotNormalized { position, norm });
    }
    Ok(())
}

/// Directory-backed persistence for [`EmbeddingStore`].
#[derive(Debug, Clone)]
pub struct StoreDir {
    root: PathBuf,
    retain_generations: usize,
}

impl StoreDir {
    /// Default number of generations kept on disk, including the live one.
    pub const DEFAULT_RETAIN: usize = 2;

    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            retain_generations: Self::DEFAULT_RETAIN,
        }
    }

    /// Keep this many generations after a save (minimum 1).
    pub fn with_retain_generations(mut self, retain: usize) -> Self {
        self.retain_generations = retain.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist aligned `ids` / `vectors` as a new generation and make it live.
    /// Returns the generation name.
    pub fn save(&self, ids: &[ItemId], vectors: &[Vec<f32>]) -> Result<String, IndexError> {
        let store = EmbeddingStore::from_vectors(ids.to_vec(), vectors)?;
        self.save_store(&store)
    }

    /// Persist an already validated store as a new generation and make it live.
    pub fn save_store(&self, store: &EmbeddingStore) -> Result<String, IndexError> {
        fs::create_dir_all(&self.root)?;
        let generation = generation_name(self.latest_generation_number()? + 1);
        let gen_dir = self.root.join(&generation);
        fs::create_dir(&gen_dir)?;

        if let Err(err) = write_generation(&gen_dir, store) {
            // a partial generation must not count toward retention
            if let Err(cleanup) = fs::remove_dir_all(&gen_dir) {
                tracing::warn!(
                    generation = %generation,
                    error = %cleanup,
                    "failed to remove partial generation"
                );
            }
            return Err(err);
        }

        self.swap_current(&generation)?;
        tracing::info!(
            root = %self.root.display(),
            generation = %generation,
            items = store.len(),
            dim = store.dim,
            "embedding store saved"
        );
        self.prune();
        Ok(generation)
    }

    /// Load the live generation.
    pub fn load(&self) -> Result<EmbeddingStore, IndexError> {
        self.load_current().map(|(_, store)| store)
    }

    /// Load the live generation along with its name.
    pub fn load_current(&self) -> Result<(String, EmbeddingStore), IndexError> {
        let generation = self.current_generation()?;
        let gen_dir = self.root.join(&generation);

        let vector_bytes = read_artifact(&gen_dir.join(VECTORS_FILE))?;
        let id_bytes = read_artifact(&gen_dir.join(IDS_FILE))?;

        let (header, data) = decode_vectors(&vector_bytes)?;
        let ids: Vec<ItemId> = serde_json::from_slice(&id_bytes).map_err(IndexError::corrupt)?;
        let store = EmbeddingStore::from_artifacts(header.dim, ids, data)?;
        tracing::info!(
            root = %self.root.display(),
            generation = %generation,
            items = store.len(),
            dim = store.dim,
            "embedding store loaded"
        );
        Ok((generation, store))
    }

    /// Name of the live generation as recorded in `CURRENT`.
    pub fn current_generation(&self) -> Result<String, IndexError> {
        let raw = read_artifact(&self.root.join(CURRENT_FILE))?;
        let name = String::from_utf8(raw).map_err(IndexError::corrupt)?;
        let name = name.trim();
        if parse_generation(name).is_none() {
            return Err(IndexError::corrupt(format!(
                "CURRENT names an invalid generation {name:?}"
            )));
        }
        Ok(name.to_string())
    }

    /// Generation names present on disk, oldest first.
    pub fn generations(&self) -> Result<Vec<String>, IndexError> {
        let mut found: Vec<u64> = Vec::new();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(number) = entry.file_name().to_str().and_then(parse_generation) {
                found.push(number);
            }
        }
        found.sort_unstable();
        Ok(found.into_iter().map(generation_name).collect())
    }

    fn latest_generation_number(&self) -> Result<u64, IndexError> {
        Ok(self
            .generations()?
            .last()
            .and_then(|name| parse_generation(name))
            .unwrap_or(0))
    }

    fn swap_current(&self, generation: &str) -> Result<(), IndexError> {
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(generation.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.root.join(CURRENT_FILE))
            .map_err(|e| IndexError::Io(e.error.to_string()))?;
        sync_dir(&self.root)
    }

    /// Remove generations beyond the retention window. Never touches the live
    /// generation; failures are logged, not returned.
    fn prune(&self) {
        let live = match self.current_generation() {
            Ok(live) => live,
            Err(err) => {
                tracing::warn!(error = %err, "skipping prune, CURRENT unreadable");
                return;
            }
        };
        let generations = match self.generations() {
            Ok(generations) => generations,
            Err(err) => {
                tracing::warn!(error = %err, "skipping prune, cannot list generations");
                return;
            }
        };
        let excess = generations.len().saturating_sub(self.retain_generations);
        for stale in generations.into_iter().take(excess) {
            if stale == live {
                continue;
            }
            match fs::remove_dir_all(self.root.join(&stale)) {
                Ok(()) => tracing::debug!(generation = %stale, "pruned store generation"),
                Err(err) => {
                    tracing::warn!(generation = %stale, error = %err, "failed to prune generation")
                }
            }
        }
    }
}

fn generation_name(number: u64) -> String {
    format!("{GENERATION_PREFIX}{number:06}")
}

fn parse_generation(name: &str) -> Option<u64> {
    let digits = name.strip_prefix(GENERATION_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, IndexError> {
    fs::read(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => IndexError::NotFound {
            path: path.display().to_string(),
        },
        _ => IndexError::Io(format!("{}: {err}", path.display())),
    })
}

fn write_generation(gen_dir: &Path, store: &EmbeddingStore) -> Result<(), IndexError> {
    write_synced(
        &gen_dir.join(VECTORS_FILE),
        &encode_vectors(store.dim, &store.data)?,
    )?;
    let ids_json = serde_json::to_vec(&store.ids).map_err(|e| IndexError::Io(e.to_string()))?;
    write_synced(&gen_dir.join(IDS_FILE), &ids_json)?;
    sync_dir(gen_dir)
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), IndexError> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), IndexError> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), IndexError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::l2_normalized;
    use tempfile::TempDir;

    fn unit(values: &[f32]) -> Vec<f32> {
        l2_normalized(values).unwrap()
    }

    fn sample() -> (Vec<ItemId>, Vec<Vec<f32>>) {
        (
            vec![10, 20, 30],
            vec![
                unit(&[1.0, 0.0, 0.0]),
                unit(&[0.3, 0.4, 0.5]),
                unit(&[-1.0, 2.0, 0.5]),
            ],
        )
    }

    #[test]
    fn save_then_load_roundtrips_exactly() {
        let dir = TempDir::new().unwrap();
        let store_dir = StoreDir::new(dir.path());
        let (ids, vectors) = sample();

        store_dir.save(&ids, &vectors).unwrap();
        let (loaded_ids, loaded_vectors) = store_dir.load().unwrap().into_parts();

        assert_eq!(loaded_ids, ids);
        assert_eq!(loaded_vectors.len(), loaded_ids.len());
        for (a, b) in loaded_vectors.iter().zip(&vectors) {
            let a_bits: Vec<u32> = a.iter().map(|v| v.to_bits()).collect();
            let b_bits: Vec<u32> = b.iter().map(|v| v.to_bits()).collect();
            assert_eq!(a_bits, b_bits);
        }
    }

    #[test]
    fn save_rejects_shape_mismatch() {
        let dir = TempDir::new().unwrap();
        let (_, vectors) = sample();
        let err = StoreDir::new(dir.path()).save(&[1, 2], &vectors).unwrap_err();
        assert_eq!(err, IndexError::ShapeMismatch { ids: 2, vectors: 3 });
    }

    #[test]
    fn save_rejects_inconsistent_dimensions() {
        let dir = TempDir::new().unwrap();
        let vectors = vec![unit(&[1.0, 0.0, 0.0]), unit(&[1.0, 0.0])];
        let err = StoreDir::new(dir.path()).save(&[1, 2], &vectors).unwrap_err();
        assert_eq!(
            err,
            IndexError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn save_rejects_unnormalized_and_non_finite_rows() {
        let dir = TempDir::new().unwrap();
        let store_dir = StoreDir::new(dir.path());
        assert!(matches!(
            store_dir.save(&[1], &[vec![3.0, 4.0]]),
            Err(IndexError::NotNormalized { position: 0, .. })
        ));
        assert!(matches!(
            store_dir.save(&[1], &[vec![f32::NAN, 1.0]]),
            Err(IndexError::NonFinite { position: 0 })
        ));
        // nothing was made live
        assert!(matches!(store_dir.load(), Err(IndexError::NotFound { .. })));
    }

    #[test]
    fn load_without_current_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = StoreDir::new(dir.path().join("missing")).load().unwrap_err();
        assert!(matches!(err, IndexError::NotFound { .. }));
    }

    #[test]
    fn load_with_missing_half_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store_dir = StoreDir::new(dir.path());
        let (ids, vectors) = sample();
        let generation = store_dir.save(&ids, &vectors).unwrap();
        fs::remove_file(dir.path().join(&generation).join(IDS_FILE)).unwrap();
        assert!(matches!(store_dir.load(), Err(IndexError::NotFound { .. })));
    }

    #[test]
    fn id_count_mismatch_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store_dir = StoreDir::new(dir.path());
        let (ids, vectors) = sample();
        let generation = store_dir.save(&ids, &vectors).unwrap();
        fs::write(dir.path().join(&generation).join(IDS_FILE), b"[10, 20]").unwrap();
        assert!(matches!(store_dir.load(), Err(IndexError::Corrupt(_))));
    }

    #[test]
    fn truncated_vectors_are_corrupt() {
        let dir = TempDir::new().unwrap();
        let store_dir = StoreDir::new(dir.path());
        let (ids, vectors) = sample();
        let generation = store_dir.save(&ids, &vectors).unwrap();
        let path = dir.path().join(&generation).join(VECTORS_FILE);
        let mut bytes = fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 4);
        fs::write(&path, bytes).unwrap();
        assert!(matches!(store_dir.load(), Err(IndexError::Corrupt(_))));
    }

    #[test]
    fn garbage_current_is_corrupt() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CURRENT_FILE), "../../etc").unwrap();
        let err = StoreDir::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)));
    }

    #[test]
    fn second_save_swaps_generation_and_prunes() {
        let dir = TempDir::new().unwrap();
        let store_dir = StoreDir::new(dir.path()).with_retain_generations(2);
        let (ids, vectors) = sample();

        let first = store_dir.save(&ids, &vectors).unwrap();
        let second = store_dir.save(&ids[..1], &vectors[..1]).unwrap();
        let third = store_dir.save(&ids[..2], &vectors[..2]).unwrap();

        assert_eq!(first, "gen-000001");
        assert_eq!(second, "gen-000002");
        assert_eq!(third, "gen-000003");
        assert_eq!(store_dir.current_generation().unwrap(), third);
        assert_eq!(store_dir.generations().unwrap(), vec![second, third]);
        assert_eq!(store_dir.load().unwrap().len(), 2);
    }

    #[test]
    fn empty_store_roundtrips() {
        let dir = TempDir::new().unwrap();
        let store_dir = StoreDir::new(dir.path());
        store_dir.save_store(&EmbeddingStore::empty(512)).unwrap();
        let loaded = store_dir.load().unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.dim(), 512);
    }

    #[test]
    fn generations_of_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let store_dir = StoreDir::new(dir.path().join("never-created"));
        assert!(store_dir.generations().unwrap().is_empty());
    }

    #[test]
    fn generations_ignore_foreign_entries_and_sort_numerically() {
        let dir = TempDir::new().unwrap();
        for name in ["gen-000010", "gen-000002", "gen-", "gen-abc", "scratch"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("gen-000005"), b"not a directory").unwrap();
        let store_dir = StoreDir::new(dir.path());
        assert_eq!(
            store_dir.generations().unwrap(),
            vec!["gen-000002".to_string(), "gen-000010".to_string()]
        );
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn failed_write_leaves_no_partial_generation() {
        let dir = TempDir::new().unwrap();
        let store_dir = StoreDir::new(dir.path());
        let (ids, vectors) = sample();
        store_dir.save(&ids, &vectors).unwrap();

        // the header stores dim as u32, so encoding fails inside the new generation
        let oversized = EmbeddingStore::empty(u32::MAX as usize + 1);
        assert!(matches!(
            store_dir.save_store(&oversized),
            Err(IndexError::Corrupt(_))
        ));

        assert_eq!(store_dir.generations().unwrap(), vec!["gen-000001".to_string()]);
        assert_eq!(store_dir.current_generation().unwrap(), "gen-000001");
        assert_eq!(store_dir.save(&ids, &vectors).unwrap(), "gen-000002");
    }

    #[test]
    fn zero_length_rows_are_degenerate() {
        assert_eq!(
            EmbeddingStore::from_vectors(vec![1], &[Vec::new()]),
            Err(IndexError::DegenerateVector)
        );
        assert_eq!(
            EmbeddingStore::new(0, vec![1], &[vec![1.0]]),
            Err(IndexError::DimensionMismatch {
                expected: 0,
                actual: 1
            })
        );
    }

    #[test]
    fn rows_and_vector_accessors_agree() {
        let (ids, vectors) = sample();
        let store = EmbeddingStore::from_vectors(ids.clone(), &vectors).unwrap();
        assert_eq!(store.dim(), 3);
        assert_eq!(store.vector(1).unwrap(), vectors[1].as_slice());
        assert!(store.vector(3).is_none());
        let row_ids: Vec<_> = store.rows().map(|(id, _)| id).collect();
        assert_eq!(row_ids, ids);
    }
}
