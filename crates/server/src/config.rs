use embed::EmbedConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Enable permissive CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines instead of plain text
    #[serde(default = "default_true")]
    pub log_json: bool,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Catalog JSON file
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Embedding store directory written by `prodmatch-build`
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    /// Must match the embedder the store was built with
    #[serde(default)]
    pub embedder: EmbedConfig,

    /// Results returned when the request does not ask for a count
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Upper bound on results per request
    #[serde(default = "default_max_k")]
    pub max_k: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            log_json: default_true(),
            metrics_enabled: default_true(),
            catalog_path: default_catalog_path(),
            store_dir: default_store_dir(),
            embedder: EmbedConfig::default(),
            default_k: default_k(),
            max_k: default_max_k(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and config files
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("server").required(false))
            // Override with environment variables
            .add_source(config::Environment::with_prefix("PRODMATCH_SERVER").separator("__"));

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_k == 0 {
            anyhow::bail!("max_k must be at least 1");
        }
        if self.default_k == 0 || self.default_k > self.max_k {
            anyhow::bail!(
                "default_k must be within 1..={}, got {}",
                self.max_k,
                self.default_k
            );
        }
        Ok(())
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_mb() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/products.json")
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("data/store")
}

fn default_k() -> usize {
    5
}

fn default_max_k() -> usize {
    50
}
