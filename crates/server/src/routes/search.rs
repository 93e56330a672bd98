use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use crate::telemetry::{SEARCH_ERRORS, SEARCH_LATENCY, SEARCH_REQUESTS};
use axum::extract::{Multipart, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use index::SearchOptions;
use prodmatch::ProductMatch;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

/// Multipart field carrying the query image.
pub const IMAGE_FIELD: &str = "image";

/// Search query parameters
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    /// Number of results (default `default_k`, capped at `max_k`)
    pub k: Option<usize>,

    /// Drop results scoring below this
    pub min_score: Option<f32>,
}

/// Match an uploaded image against the catalog.
///
/// Expects a multipart body with an `image` field. Responds with
/// `[{"product": {...}, "score": 0.93}, ...]`, best match first.
pub async fn search(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<SearchParams>,
    multipart: Multipart,
) -> ServerResult<impl IntoResponse> {
    let start = Instant::now();
    metrics::counter!(SEARCH_REQUESTS).increment(1);

    let result = run_search(&state, params, multipart).await;
    metrics::histogram!(SEARCH_LATENCY).record(start.elapsed().as_secs_f64());
    if let Err(err) = &result {
        metrics::counter!(SEARCH_ERRORS, "code" => err.error_code()).increment(1);
    }
    result.map(Json)
}

async fn run_search(
    state: &ServerState,
    params: SearchParams,
    mut multipart: Multipart,
) -> ServerResult<Vec<ProductMatch>> {
    let options = search_options(state, &params)?;
    let image = read_image_field(&mut multipart).await?;

    // embedding and scanning are CPU bound
    let matcher = Arc::clone(&state.matcher);
    let matches = tokio::task::spawn_blocking(move || matcher.match_image(&image, options))
        .await??;
    Ok(matches)
}

fn search_options(state: &ServerState, params: &SearchParams) -> ServerResult<SearchOptions> {
    let k = params.k.unwrap_or(state.config.default_k);
    if k > state.config.max_k {
        return Err(ServerError::BadRequest(format!(
            "k must be at most {}, got {k}",
            state.config.max_k
        )));
    }
    let mut options = SearchOptions::top(k);
    if let Some(min_score) = params.min_score {
        if !min_score.is_finite() {
            return Err(ServerError::BadRequest("min_score must be finite".into()));
        }
        options = options.with_min_score(min_score);
    }
    Ok(options)
}

async fn read_image_field(multipart: &mut Multipart) -> ServerResult<Vec<u8>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field.bytes().await?;
            if bytes.is_empty() {
                return Err(ServerError::BadRequest("image field is empty".into()));
            }
            return Ok(bytes.to_vec());
        }
    }
    Err(ServerError::BadRequest(format!(
        "multipart field '{IMAGE_FIELD}' is required"
    )))
}
