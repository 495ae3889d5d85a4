//! Prometheus metrics
//!
//! The two endpoints serve very different request shapes: sampling returns a
//! small JSON vector per realization, while aggregation streams back an
//! archive of whole surfaces. Request metrics are therefore cut per
//! endpoint, and the fan-out accounts for dropped realizations by failure
//! cause, so a flaky blob store is distinguishable from a batch of corrupt
//! blobs.

use std::time::Instant;

use axum::{http::Request, middleware::Next, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::core::Collector;
use prometheus::{self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts};

use crate::error::SurfaceQueryError;

lazy_static! {
    /// Completed requests by endpoint and status code.
    pub static ref RESPONSES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "surface_query_responses",
            "The number of responses sent per endpoint"
        ),
        &["endpoint", "status_code"]
    ).expect("response counter options are static");
    /// Wall-clock seconds from request arrival to the last response byte.
    /// Aggregations routinely run orders of magnitude longer than samples,
    /// so the buckets stretch well past the defaults.
    pub static ref REQUEST_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "surface_query_request_seconds",
            "The time taken to respond to each request"
        )
        .buckets(vec![0.005, 0.025, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["endpoint"]
    ).expect("request histogram options are static");
    /// Realization blobs entering a fan-out.
    pub static ref REALIZATIONS_REQUESTED: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "surface_query_realizations_requested",
            "The number of realization blobs requested across fan-outs"
        ),
        &["endpoint"]
    ).expect("realization counter options are static");
    /// Realizations dropped from a response, by failure cause.
    pub static ref REALIZATIONS_DISCARDED: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "surface_query_realizations_discarded",
            "The number of realizations dropped from a response because \
             their blob could not be fetched, admitted or decoded"
        ),
        &["endpoint", "cause"]
    ).expect("discard counter options are static");
}

/// Register every collector with the global registry.
pub fn register_metrics() {
    let collectors: [Box<dyn Collector>; 4] = [
        Box::new(RESPONSES.clone()),
        Box::new(REQUEST_SECONDS.clone()),
        Box::new(REALIZATIONS_REQUESTED.clone()),
        Box::new(REALIZATIONS_DISCARDED.clone()),
    ];
    let registry = prometheus::default_registry();
    for collector in collectors {
        registry
            .register(collector)
            .expect("collectors are registered once, at startup");
    }
}

/// Returns currently gathered prometheus metrics
pub async fn metrics_handler() -> String {
    let mut buffer = Vec::new();
    prometheus::TextEncoder::new()
        .encode(&prometheus::gather(), &mut buffer)
        .expect("gathered metrics encode as text");
    String::from_utf8(buffer).expect("prometheus text output is utf-8")
}

/// Middleware recording per-endpoint response counts and latency. The timer
/// covers every inner layer, so the sampling or aggregation work itself is
/// included.
pub async fn track_requests<B>(request: Request<B>, next: Next<B>) -> impl IntoResponse {
    let endpoint = endpoint_label(request.uri().path());
    let timer = Instant::now();

    let response = next.run(request).await;

    REQUEST_SECONDS
        .with_label_values(&[endpoint])
        .observe(timer.elapsed().as_secs_f64());
    RESPONSES
        .with_label_values(&[endpoint, response.status().as_str()])
        .inc();
    response
}

/// Record the size of a fan-out.
pub fn observe_fan_out(endpoint: &str, realizations: usize) {
    REALIZATIONS_REQUESTED
        .with_label_values(&[endpoint])
        .inc_by(realizations as u64);
}

/// Record one realization dropped from a response.
pub fn observe_discard(endpoint: &str, error: &SurfaceQueryError) {
    REALIZATIONS_DISCARDED
        .with_label_values(&[endpoint, discard_cause(error)])
        .inc();
}

/// Collapse request paths onto a fixed label set; the label cardinality must
/// not grow with probed paths.
fn endpoint_label(path: &str) -> &'static str {
    match path {
        "/" => "liveness",
        "/sample_in_points" => "sample_in_points",
        "/aggregate" => "aggregate",
        "/metrics" => "metrics",
        _ => "unknown",
    }
}

/// The failure cause a dropped realization is accounted under.
fn discard_cause(error: &SurfaceQueryError) -> &'static str {
    match error {
        SurfaceQueryError::FetchFailed { .. } => "fetch",
        SurfaceQueryError::MalformedBlob { .. } => "decode",
        SurfaceQueryError::InsufficientMemory { .. } => "budget",
        _ => "other",
    }
}
