//! prodmatch server - HTTP query service for visual product matching
//!
//! Accepts an uploaded image, embeds it with the same embedder the store was
//! built with, ranks the store by cosine similarity, and returns the matching
//! catalog records. The server owns no similarity logic; it wires the
//! `catalog`, `embed`, and `index` crates to HTTP.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness check
//! - `GET /ready` - Readiness check with store details
//! - `GET /metrics` - Prometheus metrics
//! - `POST /api/search?k=5&min_score=0.2` - multipart upload, field `image`
//! - `POST /api/v1/store/reload` - swap in the latest store generation

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
