use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use job_scout::error::AppError;
use job_scout::workflows::scrape::{RunOutcome, RunStatusView, RunSummary};
use serde::Serialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Serialize)]
pub(crate) struct TriggerResponse {
    pub(crate) status: &'static str,
    pub(crate) message: &'static str,
    pub(crate) timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) summary: Option<RunSummary>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatusResponse {
    pub(crate) status: &'static str,
    pub(crate) cron_schedule: Option<String>,
    pub(crate) run: RunStatusView,
    pub(crate) timestamp: DateTime<Utc>,
}

pub(crate) fn scrape_routes() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/trigger-scrape", post(trigger_scrape_endpoint))
        .route("/status", get(status_endpoint))
}

pub(crate) async fn index(Extension(state): Extension<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "Job Scraper is running!",
        "timestamp": Utc::now(),
        "schedule": state.schedule,
        "endpoints": {
            "health": "/health",
            "ready": "/ready",
            "metrics": "/metrics",
            "trigger": "/trigger-scrape",
            "status": "/status"
        }
    }))
}

pub(crate) async fn healthcheck(Extension(state): Extension<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "uptime_seconds": state.started_at.elapsed().as_secs_f64()
    }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Runs to completion before answering. A run already in progress yields 409.
pub(crate) async fn trigger_scrape_endpoint(
    Extension(state): Extension<AppState>,
) -> Result<(StatusCode, Json<TriggerResponse>), AppError> {
    info!("manual scrape triggered via api");

    match state.runner.run_once().await {
        RunOutcome::Completed(summary) => Ok((
            StatusCode::OK,
            Json(TriggerResponse {
                status: "success",
                message: "Scraping job completed",
                timestamp: Utc::now(),
                summary: Some(summary),
            }),
        )),
        RunOutcome::Skipped => Ok((
            StatusCode::CONFLICT,
            Json(TriggerResponse {
                status: "skipped",
                message: "A scraping run is already in progress",
                timestamp: Utc::now(),
                summary: None,
            }),
        )),
        RunOutcome::Failed { message } => Err(AppError::RunFailed(message)),
    }
}

pub(crate) async fn status_endpoint(Extension(state): Extension<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "running",
        cron_schedule: state.schedule.clone(),
        run: state.runner.status(),
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use job_scout::workflows::scrape::browser::{
        BrowserError, BrowserSession, LaunchOptions, NavigationError, RenderingEngine,
    };
    use job_scout::workflows::scrape::{
        DeliveryReceipt, ExportWriter, JobReport, KeywordList, NotificationError, Notifier,
        SelectorBindings, SourceDescriptor, SourceRegistry, Strategy,
    };
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Instant;
    use tower::ServiceExt;
    use url::Url;

    struct StaticEngine {
        fail: bool,
    }

    #[async_trait]
    impl RenderingEngine for StaticEngine {
        async fn launch(
            &self,
            _options: &LaunchOptions,
        ) -> Result<Box<dyn BrowserSession>, BrowserError> {
            if self.fail {
                return Err(BrowserError::Launch("no chrome on this host".to_string()));
            }
            Ok(Box::new(StaticSession { current: None }))
        }
    }

    struct StaticSession {
        current: Option<Url>,
    }

    #[async_trait]
    impl BrowserSession for StaticSession {
        async fn navigate(&mut self, url: &Url, _idle: bool) -> Result<(), NavigationError> {
            self.current = Some(url.clone());
            Ok(())
        }

        async fn scroll_to_bottom(&mut self) -> Result<(), NavigationError> {
            Ok(())
        }

        async fn content(&mut self) -> Result<String, NavigationError> {
            Ok(r#"<a class="job" href="/jobs/7">Frontend Engineer</a>"#.to_string())
        }

        async fn current_url(&mut self) -> Option<String> {
            self.current.as_ref().map(Url::to_string)
        }

        async fn close(self: Box<Self>) -> Result<(), BrowserError> {
            Ok(())
        }
    }

    struct SilentNotifier;

    #[async_trait]
    impl Notifier for SilentNotifier {
        async fn send_report(
            &self,
            report: &JobReport,
        ) -> Result<DeliveryReceipt, NotificationError> {
            Ok(DeliveryReceipt {
                message_id: "<route@test>".to_string(),
                relevant_count: report.relevant_count,
            })
        }

        async fn send_error_report(
            &self,
            _message: &str,
            _trace: &str,
        ) -> Result<(), NotificationError> {
            Ok(())
        }
    }

    fn state(output: &std::path::Path, fail_launch: bool) -> AppState {
        let registry = SourceRegistry {
            sources: vec![SourceDescriptor {
                name: "Board".to_string(),
                search_url: "https://board.test/search?q={keywords}".to_string(),
                strategy: Strategy::Generic,
                selectors: Some(SelectorBindings {
                    list_item: "a.job".to_string(),
                    title: None,
                    company: None,
                }),
            }],
            keywords: KeywordList::new(vec!["react".to_string()]),
        };
        let runner = job_scout::workflows::scrape::ScrapeRunner::new(
            registry,
            Arc::new(StaticEngine { fail: fail_launch }),
            Arc::new(SilentNotifier),
            ExportWriter::new(output, "frontend-jobs"),
        );

        AppState {
            readiness: Arc::new(AtomicBool::new(true)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            runner: Arc::new(runner),
            schedule: Some("0 */4 * * *".to_string()),
            started_at: Instant::now(),
        }
    }

    fn app(state: AppState) -> Router {
        scrape_routes().layer(Extension(state))
    }

    async fn read_json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_runs_and_reports_summary() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = app(state(dir.path(), false))
            .oneshot(
                Request::post("/trigger-scrape")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload["status"], "success");
        assert_eq!(payload["summary"]["relevant_count"], 1);
        assert_eq!(payload["summary"]["report_id"], "<route@test>");
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_failure_returns_server_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = app(state(dir.path(), true))
            .oneshot(
                Request::post("/trigger-scrape")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let payload = read_json_body(response).await;
        assert!(payload["error"]
            .as_str()
            .is_some_and(|message| message.contains("no chrome on this host")));
    }

    #[tokio::test(start_paused = true)]
    async fn status_reports_schedule_and_last_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = state(dir.path(), false);
        state.runner.run_once().await;

        let response = app(state)
            .oneshot(
                Request::get("/status")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload["cron_schedule"], "0 */4 * * *");
        assert_eq!(payload["run"]["running"], false);
        assert_eq!(payload["run"]["runs_started"], 1);
        assert_eq!(payload["run"]["last_outcome"]["status"], "completed");
    }

    #[tokio::test(start_paused = true)]
    async fn health_and_readiness_respond() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = state(dir.path(), false);
        state
            .readiness
            .store(false, std::sync::atomic::Ordering::Relaxed);
        let router = app(state);

        let health = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request builds"))
            .await
            .expect("route executes");
        assert_eq!(health.status(), StatusCode::OK);
        let payload = read_json_body(health).await;
        assert_eq!(payload["status"], "healthy");
        assert!(payload["uptime_seconds"].is_number());

        let ready = router
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request builds"))
            .await
            .expect("route executes");
        assert_eq!(ready.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
