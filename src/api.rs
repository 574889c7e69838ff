//! HTTP query surface: the `/metrics` date-range route, health, and the
//! catch-all rejection for unrecognized paths.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, Method},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use crate::error::ApiError;
use crate::model::AggregateSnapshot;
use crate::store::SnapshotStore;

/// First date the collector ever ran; the default lower bound for
/// unbounded range queries.
pub const LAUNCH_DATE: &str = "2021-06-27";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SnapshotStore>,
    /// Source of "today" for the default upper bound; injectable so
    /// tests can pin the date.
    pub today: fn() -> chrono::NaiveDate,
}

impl AppState {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            store,
            today: || chrono::Utc::now().date_naive(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    // The permissive header set cross-origin browser clients rely on.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::OPTIONS, Method::POST, Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/metrics", get(query_metrics))
        .fallback(bad_path)
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeParams {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Resolve the effective inclusive range: missing or empty `start_date`
/// falls back to the launch date, missing or empty `end_date` to `today`.
pub fn resolve_range(params: &RangeParams, today: &str) -> (String, String) {
    let pick = |v: &Option<String>, default: &str| match v.as_deref() {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => default.to_string(),
    };
    (
        pick(&params.start_date, LAUNCH_DATE),
        pick(&params.end_date, today),
    )
}

async fn query_metrics(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<AggregateSnapshot>>, ApiError> {
    let today = crate::model::date_label((state.today)());
    let (start, end) = resolve_range(&params, &today);

    let mut snapshots = state.store.scan_aggregates(&start, &end)?;
    // The store's scan order is unspecified; chronological order is part
    // of the response contract.
    snapshots.sort_by(|a, b| a.date.cmp(&b.date));

    tracing::debug!(
        target: "api",
        %start,
        %end,
        matched = snapshots.len(),
        "range query"
    );
    Ok(Json(snapshots))
}

async fn bad_path() -> ApiError {
    ApiError::BadPath
}
