use std::sync::Arc;

use surface_query::app;
use surface_query::app_state::{task_limit, AppState};
use surface_query::cli;
use surface_query::metrics::register_metrics;
use surface_query::server;
use surface_query::tracing::{init_tracing, shutdown_tracing};

#[tokio::main]
async fn main() {
    let args = cli::parse();

    init_tracing(&args);
    register_metrics();

    tracing::info!(
        visible_cpus = num_cpus::get(),
        parallelism_limit = task_limit(&args),
        "starting surface-query"
    );

    let state = Arc::new(AppState::new(&args));
    let app = app::router(state);
    server::serve(&args, app).await;

    shutdown_tracing();
}
