use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;

use crate::app_state::{AppState, SharedAppState};
use crate::cli::CommandLineArgs;
use crate::models::{AggregateRequest, RealizationObjectId, SamplePointsRequest};
use crate::surface::Surface;

/// Create a surface with the given dimensions, a unit grid at the origin and
/// no rotation.
pub(crate) fn test_surface(nx: i32, ny: i32, values: Vec<f32>) -> Surface {
    Surface {
        id_flag: -996,
        nx,
        ny,
        xori: 0.0,
        yori: 0.0,
        xmax: (nx - 1) as f32,
        ymax: (ny - 1) as f32,
        xinc: 1.0,
        yinc: 1.0,
        rot: 0.0,
        x0ori: 0.0,
        y0ori: 0.0,
        values,
    }
}

/// A 3x3 unit-grid surface.
pub(crate) fn surface_3x3(values: Vec<f32>) -> Surface {
    test_surface(3, 3, values)
}

/// A 2x2 unit-grid surface.
pub(crate) fn surface_2x2(values: [f32; 4]) -> Surface {
    test_surface(2, 2, values.to_vec())
}

/// Command line arguments as if the binary was started with no flags.
pub(crate) fn get_test_args() -> CommandLineArgs {
    CommandLineArgs {
        host: "127.0.0.1".to_string(),
        port: 0,
        https: false,
        cert_file: String::new(),
        key_file: String::new(),
        graceful_shutdown_timeout: 1,
        enable_jaeger: false,
        fetch_connection_limit: None,
        memory_limit: None,
        thread_limit: None,
    }
}

/// Shared application state for handler and engine tests.
pub(crate) fn get_test_app_state() -> SharedAppState {
    Arc::new(AppState::new(&get_test_args()))
}

/// A sample request with one realization and two points.
pub(crate) fn get_test_sample_request() -> SamplePointsRequest {
    SamplePointsRequest {
        sas_token: "sig=foo".to_string(),
        blob_store_base_uri: "http://example.com/surfaces".to_string(),
        object_ids: vec![RealizationObjectId {
            realization: 7,
            object_uuid: "blob-7".to_string(),
        }],
        x_coords: vec![0.0, 1.0],
        y_coords: vec![0.0, 1.0],
    }
}

/// An aggregate request with two operators and two blobs.
pub(crate) fn get_test_aggregate_request() -> AggregateRequest {
    AggregateRequest {
        operation: vec!["mean".to_string(), "p10".to_string()],
        object_ids: vec!["blob-1".to_string(), "blob-2".to_string()],
        base_uri: "http://example.com/surfaces".to_string(),
        auth_token: "sig=foo".to_string(),
        nan_as_zero: false,
        output_zero_as_nan: false,
    }
}

async fn blob_handler(
    State(store): State<Arc<HashMap<String, Bytes>>>,
    Path(uuid): Path<String>,
) -> Response {
    match store.get(&uuid) {
        Some(bytes) => bytes.clone().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serve canned blobs from an ephemeral local HTTP server, as the blob store
/// would. Returns the base URI to fetch them from.
pub(crate) async fn serve_blobs(blobs: Vec<(String, Bytes)>) -> String {
    let store: Arc<HashMap<String, Bytes>> = Arc::new(blobs.into_iter().collect());
    let app = Router::new()
        .route("/:uuid", get(blob_handler))
        .with_state(store);
    let server =
        axum::Server::bind(&"127.0.0.1:0".parse().unwrap()).serve(app.into_make_service());
    let addr = server.local_addr();
    tokio::spawn(server);
    format!("http://{addr}")
}
