//! # prodmatch index
//!
//! Persistence and exact nearest-neighbour search over L2-normalized product
//! embeddings.
//!
//! ## Core pieces
//!
//! - [`EmbeddingStore`]: `N` unit vectors of one dimensionality aligned 1:1
//!   with `N` item ids. Position `i` of the vectors describes `ids[i]`; that
//!   alignment is the only link between a vector and its product.
//! - [`StoreDir`]: the on-disk form. Each save lands in a new generation
//!   directory and becomes live through one atomic rename of `CURRENT`.
//! - [`search`] / [`EmbeddingStore::search_with`]: brute-force cosine ranking.
//!   Vectors are unit length, so cosine is a dot product. Large stores are
//!   scored in parallel with rayon.
//! - [`StoreHandle`]: the shared store behind a query service, reloadable
//!   without interrupting readers.
//!
//! ## Ordering
//!
//! Hits come back by descending score. Equal scores keep the order of the
//! rows in the store, so results are deterministic for a given store.
//!
//! ## Example
//!
//! ```
//! use index::{l2_normalized, StoreDir, StoreHandle, SearchOptions};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store_dir = StoreDir::new(dir.path());
//! let vectors = vec![
//!     l2_normalized(&[1.0, 0.0, 0.0]).unwrap(),
//!     l2_normalized(&[0.5, 0.5, 0.0]).unwrap(),
//! ];
//! store_dir.save(&[101, 102], &vectors).unwrap();
//!
//! let handle = StoreHandle::open(store_dir).unwrap();
//! let hits = handle.search(&[2.0, 0.0, 0.0], SearchOptions::top(1)).unwrap();
//! assert_eq!(hits[0].id, 101);
//! ```

mod error;
mod format;
mod handle;
mod normalize;
mod query;
mod store;

pub use error::IndexError;
pub use format::{decode_vectors, encode_vectors, VectorHeader, FORMAT_VERSION};
pub use handle::{Snapshot, StoreHandle};
pub use normalize::{dot, is_unit, l2_norm, l2_normalize_in_place, l2_normalized, UNIT_TOLERANCE};
pub use query::{search, SearchHit, SearchOptions, PARALLEL_SCAN_THRESHOLD};
pub use store::{EmbeddingStore, StoreDir, CURRENT_FILE, IDS_FILE, VECTORS_FILE};

/// Product identifier as stored alongside each vector.
pub type ItemId = u64;
