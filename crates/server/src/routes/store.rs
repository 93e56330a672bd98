use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use crate::telemetry::{STORE_ITEMS, STORE_RELOADS};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use prodmatch::MatchError;
use serde_json::json;
use std::sync::Arc;

/// Reload the embedding store from disk.
///
/// The new generation replaces the old one atomically; searches already in
/// flight finish against the snapshot they started with. A failed reload
/// leaves the current store serving.
pub async fn reload_store(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<impl IntoResponse> {
    let matcher = Arc::clone(&state.matcher);
    let snapshot = tokio::task::spawn_blocking(move || matcher.reload())
        .await?
        .map_err(|err| match err {
            MatchError::Index(e) => ServerError::StoreUnavailable(e),
            other => ServerError::Config(other.to_string()),
        })?;

    metrics::counter!(STORE_RELOADS).increment(1);
    metrics::gauge!(STORE_ITEMS).set(snapshot.store.len() as f64);

    Ok(Json(json!({
        "status": "reloaded",
        "version": snapshot.version,
        "generation": snapshot.generation,
        "items": snapshot.store.len(),
    })))
}
