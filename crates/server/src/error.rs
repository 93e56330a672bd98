use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use embed::EmbedError;
use index::IndexError;
use prodmatch::MatchError;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid image: {0}")]
    InvalidImage(EmbedError),

    #[error("Search rejected: {0}")]
    Search(IndexError),

    #[error("Embedding store unavailable: {0}")]
    StoreUnavailable(IndexError),

    #[error("Embedding error: {0}")]
    Embedding(EmbedError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),

    #[error("Metrics disabled")]
    MetricsDisabled,

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::InvalidImage(_) | ServerError::Search(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServerError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::NotFound | ServerError::MetricsDisabled => StatusCode::NOT_FOUND,
            ServerError::Embedding(_)
            | ServerError::Catalog(_)
            | ServerError::Internal(_)
            | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::InvalidImage(_) => "INVALID_IMAGE",
            ServerError::Search(IndexError::DimensionMismatch { .. }) => "DIMENSION_MISMATCH",
            ServerError::Search(IndexError::DegenerateVector) => "DEGENERATE_VECTOR",
            ServerError::Search(_) => "SEARCH_ERROR",
            ServerError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            ServerError::Embedding(_) => "EMBEDDING_ERROR",
            ServerError::Catalog(_) => "CATALOG_ERROR",
            ServerError::MetricsDisabled => "METRICS_DISABLED",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
        }

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<IndexError> for ServerError {
    fn from(err: IndexError) -> Self {
        if err.is_caller_error() {
            ServerError::Search(err)
        } else {
            ServerError::StoreUnavailable(err)
        }
    }
}

impl From<MatchError> for ServerError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::Embed(e) => e.into(),
            MatchError::Index(e) => e.into(),
            mismatch @ MatchError::StoreMismatch { .. } => {
                ServerError::Config(mismatch.to_string())
            }
        }
    }
}

impl From<EmbedError> for ServerError {
    fn from(err: EmbedError) -> Self {
        match err {
            EmbedError::EmptyInput | EmbedError::Decode(_) => ServerError::InvalidImage(err),
            other => ServerError::Embedding(other),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for ServerError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        ServerError::BadRequest(format!("Malformed multipart body: {err}"))
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("Worker task failed: {err}"))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}
