//! Blob fetching.
//!
//! A single HTTP GET per blob against
//! `{base_uri}/{object_uuid}?{sas_token}`. The shared-access signature is an
//! opaque query string appended verbatim; the fetcher never inspects it. The
//! underlying reqwest client keeps a process-wide connection pool and is safe
//! to share across concurrent requests.

use bytes::Bytes;
use tokio::sync::Semaphore;

use crate::error::SurfaceQueryError;

/// HTTP blob fetcher.
///
/// When constructed with a connection limit, at most that many GETs are in
/// flight at once; further fan-out units queue on the fetch rather than on
/// the blob store.
#[derive(Debug)]
pub struct BlobFetcher {
    client: reqwest::Client,
    connections: Option<Semaphore>,
}

impl BlobFetcher {
    /// Create a new blob fetcher, optionally bounding concurrent GETs.
    pub fn new(connection_limit: Option<usize>) -> Self {
        Self {
            client: reqwest::Client::new(),
            connections: connection_limit.map(Semaphore::new),
        }
    }

    /// Fetch one blob.
    ///
    /// Network errors and non-200 statuses both map to
    /// [SurfaceQueryError::FetchFailed] carrying the object id; the query
    /// engine records such failures per id without failing the request.
    ///
    /// # Arguments
    ///
    /// * `base_uri`: Blob store base URI
    /// * `object_uuid`: Blob id within the store
    /// * `sas_token`: Opaque shared-access signature
    #[tracing::instrument(level = "DEBUG", skip(self, sas_token))]
    pub async fn fetch(
        &self,
        base_uri: &str,
        object_uuid: &str,
        sas_token: &str,
    ) -> Result<Bytes, SurfaceQueryError> {
        // Held until the body has been read in full.
        let _connection = match &self.connections {
            Some(semaphore) => Some(semaphore.acquire().await?),
            None => None,
        };

        let fetch_failed = |reason: String| SurfaceQueryError::FetchFailed {
            object_uuid: object_uuid.to_string(),
            reason,
        };

        let url = format!("{base_uri}/{object_uuid}?{sas_token}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| fetch_failed(err.to_string()))?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(fetch_failed(format!(
                "status code {} not 200",
                response.status().as_u16()
            )));
        }
        response
            .bytes()
            .await
            .map_err(|err| fetch_failed(err.to_string()))
    }
}
