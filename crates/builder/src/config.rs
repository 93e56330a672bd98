use std::path::{Path, PathBuf};

use embed::EmbedConfig;
use serde::{Deserialize, Serialize};

/// Index builder configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuilderConfig {
    /// Catalog JSON file
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Directory catalog image references are resolved against
    #[serde(default = "default_image_root")]
    pub image_root: PathBuf,

    /// Embedding store directory
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    /// Embedding workers; 0 means available parallelism
    #[serde(default)]
    pub workers: usize,

    /// Store generations kept on disk after a save
    #[serde(default = "default_retain_generations")]
    pub retain_generations: usize,

    #[serde(default)]
    pub embedder: EmbedConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            image_root: default_image_root(),
            store_dir: default_store_dir(),
            workers: 0,
            retain_generations: default_retain_generations(),
            embedder: EmbedConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl BuilderConfig {
    /// Load from an optional config file, then `PRODMATCH_BUILD__*` environment
    /// variables.
    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("builder").required(false),
        };
        let builder = config::Config::builder()
            .add_source(file_source)
            .add_source(config::Environment::with_prefix("PRODMATCH_BUILD").separator("__"));

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Worker count with the `0 = auto` default resolved.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism().map_or(1, |n| n.get())
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/products.json")
}

fn default_image_root() -> PathBuf {
    PathBuf::from("data")
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("data/store")
}

fn default_retain_generations() -> usize {
    index::StoreDir::DEFAULT_RETAIN
}

fn default_log_level() -> String {
    "info".to_string()
}
