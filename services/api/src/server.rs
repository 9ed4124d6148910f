use crate::cli::ServeArgs;
use crate::infra::{build_runner, AppState};
use crate::routes::scrape_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use job_scout::config::AppConfig;
use job_scout::error::AppError;
use job_scout::telemetry;
use job_scout::workflows::scrape::start_scheduler;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let runner = build_runner(&config)?;
    let _scheduler = if args.no_schedule {
        info!("scheduler disabled, runs are manual only");
        None
    } else {
        Some(
            start_scheduler(
                runner.clone(),
                &config.schedule.expression,
                config.schedule.timezone,
            )
            .await?,
        )
    };

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        runner,
        schedule: (!args.no_schedule).then(|| config.schedule.expression.clone()),
        started_at: Instant::now(),
    };

    let app = scrape_routes()
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "job scout ready");

    axum::serve(listener, app).await?;
    Ok(())
}
