//! The parallel query engine.
//!
//! Both entry points share one fan-out skeleton: each object id gets its own
//! unit of work that fetches the blob, decodes it, and either samples it or
//! stores it for aggregation. Units write into pre-indexed slots (the future
//! list preserves the request ordering), so no synchronisation is needed and
//! results come back in input order regardless of completion order.
//!
//! A failing unit is isolated: its error is logged and counted, its slot
//! stays empty, and the other units are unaffected. The engine only fails as
//! a whole on conditions that prevent producing any result, such as an
//! unknown operator or misaligned aggregation inputs.

use std::sync::Arc;

use futures::future;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::task;

use crate::aggregate;
use crate::app_state::AppState;
use crate::archive;
use crate::codec;
use crate::error::SurfaceQueryError;
use crate::metrics;
use crate::models::{
    AggregateRequest, RealizationObjectId, RealizationSampleResult, SamplePointsRequest,
    SamplePointsResponse,
};
use crate::sampler::{self, Algorithm};
use crate::surface::Surface;

/// Gates shared by every unit of fan-out work.
///
/// CPU slots bound how many decode, sample and reduction units run at once;
/// the blob budget bounds how many bytes of fetched surface data are
/// admitted across all in-flight units. A blob larger than the whole budget
/// is discarded like any other per-realization failure rather than wedging
/// the fan-out.
pub struct WorkerLimits {
    cpu_slots: Semaphore,
    blob_budget: Option<BlobBudget>,
}

struct BlobBudget {
    bytes: Semaphore,
    total: usize,
}

impl WorkerLimits {
    /// Create worker limits with `cpu_slots` concurrent CPU-bound units and
    /// an optional blob byte budget.
    pub fn new(blob_budget: Option<usize>, cpu_slots: usize) -> WorkerLimits {
        WorkerLimits {
            cpu_slots: Semaphore::new(cpu_slots),
            blob_budget: blob_budget.map(|total| BlobBudget {
                bytes: Semaphore::new(total),
                total,
            }),
        }
    }

    /// A slot on the CPU-bound worker pool, held for the duration of one
    /// decode, sample or reduction.
    async fn cpu_slot(&self) -> Result<SemaphorePermit<'_>, SurfaceQueryError> {
        Ok(self.cpu_slots.acquire().await?)
    }

    /// Admit `bytes` of fetched blob data, waiting for budget to free up if
    /// other units currently hold it.
    async fn admit_blob(
        &self,
        bytes: usize,
    ) -> Result<Option<SemaphorePermit<'_>>, SurfaceQueryError> {
        let Some(budget) = &self.blob_budget else {
            return Ok(None);
        };
        if bytes > budget.total {
            return Err(SurfaceQueryError::InsufficientMemory {
                requested: bytes,
                total: budget.total,
            });
        }
        Ok(Some(budget.bytes.acquire_many(bytes.try_into()?).await?))
    }
}

/// Sample every requested realization surface at the request's points.
///
/// Realizations whose blob cannot be fetched or decoded are absent from the
/// response; the survivors appear in request order.
pub async fn sample_in_points(
    state: &AppState,
    request: &SamplePointsRequest,
) -> Result<SamplePointsResponse, SurfaceQueryError> {
    let xs: Arc<[f64]> = request.x_coords.clone().into();
    let ys: Arc<[f64]> = request.y_coords.clone().into();
    metrics::observe_fan_out("sample_in_points", request.object_ids.len());

    let units = request.object_ids.iter().map(|object_id| {
        let xs = Arc::clone(&xs);
        let ys = Arc::clone(&ys);
        async move {
            match sample_one(state, request, object_id, xs, ys).await {
                Ok(sampled_values) => Some(RealizationSampleResult {
                    realization: object_id.realization,
                    sampled_values,
                }),
                Err(error) => {
                    metrics::observe_discard("sample_in_points", &error);
                    tracing::warn!(
                        realization = object_id.realization,
                        object_uuid = %object_id.object_uuid,
                        %error,
                        "discarding realization"
                    );
                    None
                }
            }
        }
    });
    let results = future::join_all(units).await;

    Ok(SamplePointsResponse::new(
        results.into_iter().flatten().collect(),
    ))
}

/// One sampling unit: fetch, decode, evaluate Z over the shared XY arrays.
async fn sample_one(
    state: &AppState,
    request: &SamplePointsRequest,
    object_id: &RealizationObjectId,
    xs: Arc<[f64]>,
    ys: Arc<[f64]>,
) -> Result<Vec<f32>, SurfaceQueryError> {
    let blob = state
        .fetcher
        .fetch(
            &request.blob_store_base_uri,
            &object_id.object_uuid,
            &request.sas_token,
        )
        .await?;
    let _blob_permit = state.limits.admit_blob(blob.len()).await?;
    let _cpu_slot = state.limits.cpu_slot().await?;
    task::spawn_blocking(move || {
        let surface = codec::decode(&blob)?;
        sampler::sample_many(&surface, &xs, &ys, Algorithm::Bilinear)
    })
    .await?
}

/// Aggregate every requested realization surface under the request's
/// operators and package the results as an uncompressed ZIP archive.
///
/// Failed fetches and decodes leave a null slot behind; the aggregator skips
/// their contribution cell by cell. Unknown operators are rejected before any
/// fetch is dispatched.
pub async fn aggregate(
    state: &AppState,
    request: &AggregateRequest,
) -> Result<Vec<u8>, SurfaceQueryError> {
    let operators = aggregate::parse_operators(&request.operation)?;
    metrics::observe_fan_out("aggregate", request.object_ids.len());

    let units = request.object_ids.iter().map(|object_uuid| async move {
        match fetch_surface(state, request, object_uuid).await {
            Ok(surface) => Some(surface),
            Err(error) => {
                metrics::observe_discard("aggregate", &error);
                tracing::warn!(%object_uuid, %error, "discarding realization");
                None
            }
        }
    });
    let surfaces: Vec<Option<Surface>> = future::join_all(units).await;

    let _cpu_slot = state.limits.cpu_slot().await?;
    let output_zero_as_nan = request.output_zero_as_nan;
    task::spawn_blocking(move || {
        let results = aggregate::aggregate(&surfaces, &operators, output_zero_as_nan)?;
        // The result surfaces inherit their header from the first decodable
        // input; aggregate() has already failed if there is none.
        let template = surfaces
            .iter()
            .flatten()
            .next()
            .ok_or(SurfaceQueryError::NoInput)?;
        let mut entries = Vec::with_capacity(results.len());
        for (operator, values) in results {
            let encoded = codec::encode(&template.with_values(values))?;
            entries.push((operator.to_string(), encoded));
        }
        archive::build_archive(&entries)
    })
    .await?
}

/// One aggregation unit: fetch and decode, with the optional undef-to-zero
/// replacement applied while the surface is still private to this unit.
async fn fetch_surface(
    state: &AppState,
    request: &AggregateRequest,
    object_uuid: &str,
) -> Result<Surface, SurfaceQueryError> {
    let blob = state
        .fetcher
        .fetch(&request.base_uri, object_uuid, &request.auth_token)
        .await?;
    let _blob_permit = state.limits.admit_blob(blob.len()).await?;
    let _cpu_slot = state.limits.cpu_slot().await?;
    let nan_as_zero = request.nan_as_zero;
    task::spawn_blocking(move || {
        let mut surface = codec::decode(&blob)?;
        if nan_as_zero {
            surface.replace_undef_with(0.0);
        }
        Ok(surface)
    })
    .await?
}
