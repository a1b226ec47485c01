use crate::cli::ServeArgs;
use crate::infra::{load_awards, open_store, AppState};
use crate::routes::with_tracker_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use deadline_tracker::awards::{
    shared_awards, AwardQuery, DeadlineRefresher, HttpPageFetcher, RefreshScheduler,
};
use deadline_tracker::config::AppConfig;
use deadline_tracker::error::AppError;
use deadline_tracker::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(snapshot) = args.snapshot.take() {
        config.tracker.snapshot_path = snapshot;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = open_store(&config.tracker.snapshot_path);
    let awards = shared_awards(load_awards(&store));
    let fetcher = Arc::new(HttpPageFetcher::from_config(&config.tracker)?);
    let refresher = Arc::new(
        DeadlineRefresher::new(fetcher, store, awards.clone())
            .with_staleness(config.tracker.staleness),
    );

    let app = with_tracker_routes(AwardQuery::new(awards))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let scheduler = RefreshScheduler::spawn(refresher, config.tracker.refresh_interval);
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        snapshot = %config.tracker.snapshot_path.display(),
        "award deadline tracker ready"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    readiness_flag.store(false, Ordering::Release);
    scheduler.shutdown().await;
    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
