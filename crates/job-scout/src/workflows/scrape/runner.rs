use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, warn};

use super::adapters::AdapterTable;
use super::browser::{BrowserError, BrowserSession, FetchOptions, LaunchOptions, RenderingEngine};
use super::dedupe::{dedupe, filter_relevant};
use super::export::{ExportError, ExportWriter};
use super::notify::{JobReport, Notifier};
use super::orchestrator::ScrapeOrchestrator;
use super::pacing::PacingPolicy;
use super::registry::SourceRegistry;
use crate::config::ScrapeConfig;

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunTrigger {
    Manual,
    Scheduled,
}

impl fmt::Display for RunTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub trigger: RunTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Records extracted before deduplication.
    pub scraped_count: usize,
    pub unique_count: usize,
    pub relevant_count: usize,
    pub export_path: Option<PathBuf>,
    pub by_company: BTreeMap<String, usize>,
    /// Message id of the delivered report; `None` when delivery failed.
    pub report_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed(RunSummary),
    /// Another run held the lock; nothing was fetched.
    Skipped,
    Failed { message: String },
}

/// Run-level failures. Per-pair failures never reach this type.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("browser could not be started: {0}")]
    Browser(#[from] BrowserError),
    #[error("export could not be written: {0}")]
    Export(#[from] ExportError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStatusView {
    pub running: bool,
    pub runs_started: u64,
    pub last_started_at: Option<DateTime<Utc>>,
    pub last_finished_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<RunOutcome>,
}

/// Serializes runs process-wide and carries each through
/// scrape, dedupe, export and notification.
///
/// Each run executes on its own task. A caller that stops waiting detaches
/// from the run; the run still finishes, closes its browser and records its
/// outcome.
pub struct ScrapeRunner {
    registry: SourceRegistry,
    engine: Arc<dyn RenderingEngine>,
    notifier: Arc<dyn Notifier>,
    orchestrator: ScrapeOrchestrator,
    exporter: ExportWriter,
    launch: LaunchOptions,
    lock: Arc<tokio::sync::Mutex<()>>,
    status: Mutex<RunStatusView>,
}

impl ScrapeRunner {
    pub fn new(
        registry: SourceRegistry,
        engine: Arc<dyn RenderingEngine>,
        notifier: Arc<dyn Notifier>,
        exporter: ExportWriter,
    ) -> Self {
        Self {
            registry,
            engine,
            notifier,
            orchestrator: ScrapeOrchestrator::new(
                AdapterTable::standard(),
                PacingPolicy::default(),
                FetchOptions::default(),
            ),
            exporter,
            launch: LaunchOptions::default(),
            lock: Arc::new(tokio::sync::Mutex::new(())),
            status: Mutex::new(RunStatusView::default()),
        }
    }

    pub fn from_config(
        config: &ScrapeConfig,
        registry: SourceRegistry,
        engine: Arc<dyn RenderingEngine>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let fetch = FetchOptions {
            wait_until_idle: true,
            timeout: config.navigation_timeout,
        };
        Self::new(
            registry,
            engine,
            notifier,
            ExportWriter::new(&config.output_dir, config.export_prefix.clone()),
        )
        .with_orchestrator(ScrapeOrchestrator::new(
            AdapterTable::standard(),
            PacingPolicy::new(config.delay_override),
            fetch,
        ))
        .with_launch_options(LaunchOptions::from_config(config))
    }

    pub fn with_orchestrator(mut self, orchestrator: ScrapeOrchestrator) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    pub fn with_launch_options(mut self, launch: LaunchOptions) -> Self {
        self.launch = launch;
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn status(&self) -> RunStatusView {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn run_once(self: &Arc<Self>) -> RunOutcome {
        self.trigger(RunTrigger::Manual).await
    }

    pub async fn run_scheduled(self: &Arc<Self>) -> RunOutcome {
        self.trigger(RunTrigger::Scheduled).await
    }

    async fn trigger(self: &Arc<Self>, trigger: RunTrigger) -> RunOutcome {
        let Ok(lock) = Arc::clone(&self.lock).try_lock_owned() else {
            info!(%trigger, "run already in progress, skipping");
            return RunOutcome::Skipped;
        };

        let runner = Arc::clone(self);
        let task = tokio::spawn(async move {
            let _lock = lock;
            runner.run_to_completion(trigger).await
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, "run task did not complete");
                RunOutcome::Failed {
                    message: format!("run task did not complete: {err}"),
                }
            }
        }
    }

    async fn run_to_completion(&self, trigger: RunTrigger) -> RunOutcome {
        let started_at = Utc::now();
        let in_flight = InFlight::begin(&self.status, started_at);
        info!(%trigger, sources = self.registry.sources.len(), "run started");

        let outcome = match self.execute(trigger, started_at).await {
            Ok(summary) => {
                info!(
                    scraped = summary.scraped_count,
                    unique = summary.unique_count,
                    relevant = summary.relevant_count,
                    "run completed"
                );
                RunOutcome::Completed(summary)
            }
            Err(err) => {
                error!(error = %err, "run failed");
                if let Err(notify_err) = self
                    .notifier
                    .send_error_report(&err.to_string(), &error_trace(&err))
                    .await
                {
                    warn!(error = %notify_err, "error report could not be delivered");
                }
                RunOutcome::Failed {
                    message: err.to_string(),
                }
            }
        };

        in_flight.finish(outcome.clone());
        outcome
    }

    /// The session is closed on every path once launched.
    async fn execute(
        &self,
        trigger: RunTrigger,
        started_at: DateTime<Utc>,
    ) -> Result<RunSummary, RunError> {
        let mut lease = BrowserLease::new(self.engine.launch(&self.launch).await?);
        let result = self
            .scrape_and_report(lease.session()?, trigger, started_at)
            .await;

        lease.release().await;
        result
    }

    async fn scrape_and_report(
        &self,
        session: &mut dyn BrowserSession,
        trigger: RunTrigger,
        started_at: DateTime<Utc>,
    ) -> Result<RunSummary, RunError> {
        let scraped = self
            .orchestrator
            .run_all(session, &self.registry.sources, &self.registry.keywords)
            .await;
        let scraped_count = scraped.len();

        let unique = dedupe(scraped);
        let unique_count = unique.len();
        let relevant = filter_relevant(unique);
        info!(
            scraped = scraped_count,
            unique = unique_count,
            relevant = relevant.len(),
            "records collected"
        );

        let report = if relevant.is_empty() {
            info!("no relevant jobs in this run");
            JobReport::empty(unique_count)
        } else {
            let artifact = self.exporter.write(&relevant)?;
            JobReport::for_records(&relevant, unique_count, Some(artifact.path))
        };

        let report_id = match self.notifier.send_report(&report).await {
            Ok(receipt) => Some(receipt.message_id),
            Err(err) => {
                warn!(error = %err, "job report could not be delivered");
                None
            }
        };

        Ok(RunSummary {
            trigger,
            started_at,
            finished_at: Utc::now(),
            scraped_count,
            unique_count,
            relevant_count: report.relevant_count,
            export_path: report.export_path,
            by_company: report.by_company,
            report_id,
        })
    }
}

/// Marks a run as in progress. Dropping it without `finish` still clears the
/// flag and records the run as failed.
struct InFlight<'a> {
    status: &'a Mutex<RunStatusView>,
    outcome: Option<RunOutcome>,
}

impl<'a> InFlight<'a> {
    fn begin(status: &'a Mutex<RunStatusView>, started_at: DateTime<Utc>) -> Self {
        {
            let mut view = status.lock().unwrap_or_else(PoisonError::into_inner);
            view.running = true;
            view.runs_started += 1;
            view.last_started_at = Some(started_at);
        }
        Self {
            status,
            outcome: None,
        }
    }

    fn finish(mut self, outcome: RunOutcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or_else(|| {
            warn!("run ended before recording an outcome");
            RunOutcome::Failed {
                message: "run ended before completion".to_string(),
            }
        });
        let mut view = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        view.running = false;
        view.last_finished_at = Some(Utc::now());
        view.last_outcome = Some(outcome);
    }
}

/// The run's browser session. A lease dropped without `release` closes its
/// session on a background task.
struct BrowserLease {
    session: Option<Box<dyn BrowserSession>>,
}

impl BrowserLease {
    fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    fn session(&mut self) -> Result<&mut (dyn BrowserSession + 'static), BrowserError> {
        self.session.as_deref_mut().ok_or(BrowserError::Released)
    }

    async fn release(mut self) {
        if let Some(session) = self.session.take() {
            close_session(session).await;
        }
    }
}

impl Drop for BrowserLease {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(close_session(session));
            }
            Err(_) => warn!("browser session dropped outside a runtime, not closed"),
        }
    }
}

async fn close_session(session: Box<dyn BrowserSession>) {
    if let Err(err) = session.close().await {
        warn!(error = %err, "browser did not close cleanly");
    }
}

/// Error message followed by its source chain, one cause per line.
pub fn error_trace(err: &(dyn std::error::Error + 'static)) -> String {
    std::iter::successors(Some(err), |current| current.source())
        .enumerate()
        .map(|(depth, cause)| {
            if depth == 0 {
                cause.to_string()
            } else {
                format!("caused by: {cause}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
