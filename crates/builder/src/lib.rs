//! prodmatch index builder
//!
//! Turns a product catalog into an embedding store. For each item, in catalog
//! order, the builder reads the image, embeds it, and normalizes the vector.
//! Items that fail at any step are skipped and listed in the [`BuildReport`];
//! one bad image never aborts the build. The surviving `(id, vector)` pairs are
//! saved once, as a single new store generation.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use builder::IndexBuilder;
//! use catalog::Catalog;
//! use embed::{build_embedder, EmbedConfig};
//! use index::StoreDir;
//!
//! let catalog = Catalog::load("data/products.json").unwrap();
//! let embedder = build_embedder(&EmbedConfig::default()).unwrap();
//! let report = IndexBuilder::new(embedder)
//!     .with_workers(4)
//!     .build(&catalog, Path::new("data"), &StoreDir::new("data/store"))
//!     .unwrap();
//! println!("indexed {} of {}", report.indexed, report.total);
//! ```

pub mod config;
mod error;
mod pipeline;
mod report;

pub use crate::config::BuilderConfig;
pub use crate::error::BuildError;
pub use crate::pipeline::{embed_item, IndexBuilder};
pub use crate::report::{BuildReport, SkipReason, SkippedItem};
