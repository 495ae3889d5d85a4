//! Surface-query is a web service that samples and aggregates gridded
//! geological surfaces stored as Irap Binary blobs in a remote object store.
//! Each surface is one realization of a stochastic geological model; by
//! evaluating and reducing the realizations next to the data, only the final
//! Z vectors or result surfaces travel to the client instead of the whole
//! ensemble.
//!
//! ## Features
//!
//! The service provides the following features:
//!
//! * HTTP(S) API with JSON request data
//! * Sampling of rotated-grid surfaces at arbitrary XY points, with bilinear
//!   or nearest-neighbour interpolation
//! * Cell-wise statistical aggregation across realizations (mean, min, max,
//!   standard deviation, percentiles)
//! * A strict reader and writer for the record-framed big-endian Irap Binary
//!   surface format
//! * Bounded fan-out over the blob store with per-realization failure
//!   isolation
//! * Server resource (connections, memory, CPU task) management
//! * [Prometheus](https://prometheus.io/) metrics
//! * Tracing with an option to send data to [Jaeger](https://www.jaegertracing.io/)
//!
//! The service is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team on top of various
//!   popular components, including the [hyper] HTTP library.
//! * [Serde](serde) performs (de)serialisation of JSON request and response
//!   data.
//! * [Reqwest](reqwest) fetches surface blobs over HTTP with a shared
//!   connection pool.
//! * [Rayon](rayon) runs the partitioned aggregation on a CPU-sized worker
//!   pool.

pub mod aggregate;
pub mod app;
pub mod app_state;
pub mod archive;
pub mod cli;
pub mod codec;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod geometry;
pub mod interpolation;
pub mod metrics;
pub mod models;
pub mod sampler;
pub mod server;
pub mod surface;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod validated_json;
