//! Shared application state.

use crate::cli::CommandLineArgs;
use crate::engine::WorkerLimits;
use crate::fetcher::BlobFetcher;

use std::sync::Arc;

/// Shared application state passed to each request handler.
pub struct AppState {
    /// Command line arguments.
    pub args: CommandLineArgs,

    /// Blob fetcher with a process-wide connection pool.
    pub fetcher: BlobFetcher,

    /// Gates on the fan-out's CPU and blob-memory use.
    pub limits: WorkerLimits,
}

impl AppState {
    /// Create and return an [AppState].
    pub fn new(args: &CommandLineArgs) -> Self {
        Self {
            args: args.clone(),
            fetcher: BlobFetcher::new(args.fetch_connection_limit),
            limits: WorkerLimits::new(args.memory_limit, task_limit(args)),
        }
    }
}

/// The number of concurrent CPU-bound tasks the service will run: the
/// configured thread limit, or one less than the visible CPUs.
pub fn task_limit(args: &CommandLineArgs) -> usize {
    args.thread_limit
        .unwrap_or_else(|| num_cpus::get().saturating_sub(1).max(1))
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple
/// references.
pub type SharedAppState = Arc<AppState>;
