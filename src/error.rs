//! Error types for the collection pipeline, the snapshot store, and the
//! HTTP query surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Remote root-server fetch failures. Any of these aborts the whole
/// collection run; nothing is persisted.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("root server request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("root server returned status {0}")]
    Status(u16),
    #[error("root server response was not a valid record array: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Persistence-layer failures. Not retried here; the caller (scheduler
/// or HTTP layer) owns retry policy.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store read failed: {0}")]
    Read(anyhow::Error),
    #[error("store write failed: {0}")]
    Write(anyhow::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Client-facing query errors. Serialized as `{"error_response": ...}`,
/// the body shape browser clients already consume.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad path")]
    BadPath,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadPath => StatusCode::FORBIDDEN,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error_response": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_path_maps_to_403() {
        let resp = ApiError::BadPath.into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn store_error_maps_to_500() {
        let err = ApiError::Store(StoreError::Read(anyhow::anyhow!("disk gone")));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
