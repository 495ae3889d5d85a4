//! The axum application: routes and request handlers.

use axum::{
    extract::State,
    http::header,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

use crate::app_state::SharedAppState;
use crate::engine;
use crate::error::SurfaceQueryError;
use crate::metrics;
use crate::models::{AggregateRequest, SamplePointsRequest, SamplePointsResponse};
use crate::validated_json::ValidatedJson;

/// Build the application router.
pub fn router(state: SharedAppState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/sample_in_points", post(sample_in_points))
        .route("/aggregate", post(aggregate))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(middleware::from_fn(metrics::track_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe.
async fn liveness() -> &'static str {
    "surface-query is alive\n"
}

/// Handler for `POST /sample_in_points`.
async fn sample_in_points(
    State(state): State<SharedAppState>,
    ValidatedJson(request): ValidatedJson<SamplePointsRequest>,
) -> Result<Json<SamplePointsResponse>, SurfaceQueryError> {
    engine::sample_in_points(&state, &request).await.map(Json)
}

/// Handler for `POST /aggregate`.
///
/// The response body is an uncompressed ZIP archive with one encoded surface
/// per operator.
async fn aggregate(
    State(state): State<SharedAppState>,
    ValidatedJson(request): ValidatedJson<AggregateRequest>,
) -> Result<impl IntoResponse, SurfaceQueryError> {
    let archive = engine::aggregate(&state, &request).await?;
    Ok(([(header::CONTENT_TYPE, "application/zip")], archive))
}
