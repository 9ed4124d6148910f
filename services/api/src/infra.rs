use job_scout::config::AppConfig;
use job_scout::error::AppError;
use job_scout::workflows::scrape::browser::ChromiumEngine;
use job_scout::workflows::scrape::{ScrapeRunner, SmtpNotifier, SourceRegistry};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) runner: Arc<ScrapeRunner>,
    /// Active cron expression; `None` when the scheduler is disabled.
    pub(crate) schedule: Option<String>,
    pub(crate) started_at: Instant,
}

/// Registry, browser engine and SMTP notifier wired from configuration.
pub(crate) fn build_runner(config: &AppConfig) -> Result<Arc<ScrapeRunner>, AppError> {
    let registry = SourceRegistry::load(&config.scrape.data_dir)?;
    let notifier = SmtpNotifier::from_config(&config.mail)?;

    Ok(Arc::new(ScrapeRunner::from_config(
        &config.scrape,
        registry,
        Arc::new(ChromiumEngine),
        Arc::new(notifier),
    )))
}
