//! Error handling.

use axum::extract::rejection::JsonRejection;
use axum::{
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Surface query service error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum SurfaceQueryError {
    /// Request body could not be parsed as JSON
    #[error(transparent)]
    JsonRejection(#[from] JsonRejection),

    /// Request body failed validation
    #[error("request data is not valid: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Coordinate arrays disagree on length
    #[error("mismatched coordinate arrays: {x_len} x values, {y_len} y values")]
    MismatchedCoordinates { x_len: usize, y_len: usize },

    /// Blob fetch failed with a network error or a non-200 status
    #[error("fetching blob {object_uuid}: {reason}")]
    FetchFailed { object_uuid: String, reason: String },

    /// Blob bytes do not form a well-formed Irap Binary surface
    #[error("malformed surface blob: {reason}")]
    MalformedBlob { reason: &'static str },

    /// Aggregation requested over zero decodable surfaces
    #[error("surface error: no surface input")]
    NoInput,

    /// Aggregation inputs disagree on grid size
    #[error("surface error: {reason}")]
    MisalignedSurfaces { reason: &'static str },

    /// Aggregation operator string is not recognised
    #[error("not a valid operation: {name}")]
    UnknownOperator { name: String },

    /// A single request asked for more memory than the configured pool
    #[error("requested memory {requested} exceeds the pool of {total} bytes")]
    InsufficientMemory { requested: usize, total: usize },

    /// Error joining a spawned task
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),

    /// Error acquiring a resource semaphore
    #[error(transparent)]
    Acquire(#[from] tokio::sync::AcquireError),

    /// Error converting between integer types
    #[error(transparent)]
    TryFromInt(#[from] std::num::TryFromIntError),

    /// Error building the aggregate response archive
    #[error("building response archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Error writing archive bytes
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// Tell axum how to convert `SurfaceQueryError` into a response.
impl IntoResponse for SurfaceQueryError {
    fn into_response(self) -> Response {
        let headers = [(&header::CONTENT_TYPE, mime::TEXT_PLAIN.to_string())];
        let message = self.to_string();
        match self {
            // Bad request
            SurfaceQueryError::JsonRejection(_)
            | SurfaceQueryError::Validation(_)
            | SurfaceQueryError::MismatchedCoordinates { .. }
            | SurfaceQueryError::NoInput
            | SurfaceQueryError::MisalignedSurfaces { .. }
            | SurfaceQueryError::UnknownOperator { .. } => {
                (StatusCode::BAD_REQUEST, headers, message).into_response()
            }

            // Internal server error. Per-blob fetch and decode failures are
            // normally swallowed by the query engine and reported only by
            // absence from the result list; reaching here means one escaped
            // outside the fan-out.
            SurfaceQueryError::FetchFailed { .. }
            | SurfaceQueryError::MalformedBlob { .. }
            | SurfaceQueryError::InsufficientMemory { .. }
            | SurfaceQueryError::Join(_)
            | SurfaceQueryError::Acquire(_)
            | SurfaceQueryError::TryFromInt(_)
            | SurfaceQueryError::Archive(_)
            | SurfaceQueryError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, headers, message).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use hyper::HeaderMap;

    // Jump through the hoops to get the body as a string.
    async fn body_string(response: Response) -> String {
        String::from_utf8(
            hyper::body::to_bytes(response.into_body())
                .await
                .unwrap()
                .to_vec(),
        )
        .unwrap()
    }

    async fn test_surface_query_error(error: SurfaceQueryError, status: StatusCode, body: &str) {
        let response = error.into_response();
        assert_eq!(status, response.status());
        let mut headers = HeaderMap::new();
        headers.insert(&header::CONTENT_TYPE, "text/plain".parse().unwrap());
        assert_eq!(headers, *response.headers());
        assert_eq!(body.to_string(), body_string(response).await);
    }

    #[tokio::test]
    async fn no_input_error() {
        let error = SurfaceQueryError::NoInput;
        let body = "surface error: no surface input";
        test_surface_query_error(error, StatusCode::BAD_REQUEST, body).await;
    }

    #[tokio::test]
    async fn misaligned_surfaces_error() {
        let error = SurfaceQueryError::MisalignedSurfaces {
            reason: "surfaces differ in size",
        };
        let body = "surface error: surfaces differ in size";
        test_surface_query_error(error, StatusCode::BAD_REQUEST, body).await;
    }

    #[tokio::test]
    async fn unknown_operator_error() {
        let error = SurfaceQueryError::UnknownOperator {
            name: "median".to_string(),
        };
        let body = "not a valid operation: median";
        test_surface_query_error(error, StatusCode::BAD_REQUEST, body).await;
    }

    #[tokio::test]
    async fn mismatched_coordinates_error() {
        let error = SurfaceQueryError::MismatchedCoordinates { x_len: 3, y_len: 2 };
        let body = "mismatched coordinate arrays: 3 x values, 2 y values";
        test_surface_query_error(error, StatusCode::BAD_REQUEST, body).await;
    }

    #[tokio::test]
    async fn fetch_failed_error() {
        let error = SurfaceQueryError::FetchFailed {
            object_uuid: "abc".to_string(),
            reason: "status code 404 not 200".to_string(),
        };
        let body = "fetching blob abc: status code 404 not 200";
        test_surface_query_error(error, StatusCode::INTERNAL_SERVER_ERROR, body).await;
    }

    #[tokio::test]
    async fn malformed_blob_error() {
        let error = SurfaceQueryError::MalformedBlob {
            reason: "record start marker mismatch",
        };
        let body = "malformed surface blob: record start marker mismatch";
        test_surface_query_error(error, StatusCode::INTERNAL_SERVER_ERROR, body).await;
    }

    #[tokio::test]
    async fn insufficient_memory_error() {
        let error = SurfaceQueryError::InsufficientMemory {
            requested: 2,
            total: 1,
        };
        let body = "requested memory 2 exceeds the pool of 1 bytes";
        test_surface_query_error(error, StatusCode::INTERNAL_SERVER_ERROR, body).await;
    }
}
