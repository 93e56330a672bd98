//! Logging and metrics setup.

use crate::config::ServerConfig;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::EnvFilter;

pub const SEARCH_REQUESTS: &str = "prodmatch_search_requests_total";
pub const SEARCH_ERRORS: &str = "prodmatch_search_errors_total";
pub const SEARCH_LATENCY: &str = "prodmatch_search_latency_seconds";
pub const STORE_ITEMS: &str = "prodmatch_store_items";
pub const STORE_RELOADS: &str = "prodmatch_store_reloads_total";

/// Install the global tracing subscriber. `RUST_LOG` wins over `log_level`.
pub fn init_tracing(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true);
    if config.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Install the global Prometheus recorder and register metric descriptions.
pub fn install_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    metrics::describe_counter!(SEARCH_REQUESTS, "Search requests received");
    metrics::describe_counter!(SEARCH_ERRORS, "Search requests that failed, by error code");
    metrics::describe_histogram!(
        SEARCH_LATENCY,
        metrics::Unit::Seconds,
        "Search latency including embedding"
    );
    metrics::describe_gauge!(STORE_ITEMS, "Items in the live embedding store");
    metrics::describe_counter!(STORE_RELOADS, "Successful embedding store reloads");
    Ok(handle)
}
