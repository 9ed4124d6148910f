use crate::cli::SourcesArgs;
use crate::infra::build_runner;
use job_scout::config::AppConfig;
use job_scout::error::AppError;
use job_scout::telemetry;
use job_scout::workflows::scrape::{start_scheduler, RunOutcome, SchedulerError, SourceRegistry};
use std::path::PathBuf;
use tracing::info;

/// Scheduled runs only, until Ctrl-C.
pub(crate) async fn run_scheduler() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let runner = build_runner(&config)?;
    let mut scheduler = start_scheduler(
        runner,
        &config.schedule.expression,
        config.schedule.timezone,
    )
    .await?;
    info!(
        schedule = %config.schedule.expression,
        timezone = %config.schedule.timezone,
        "waiting for scheduled runs"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down scheduler");
    scheduler.shutdown().await.map_err(SchedulerError::from)?;
    Ok(())
}

pub(crate) async fn run_single() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let runner = build_runner(&config)?;
    match runner.run_once().await {
        RunOutcome::Completed(summary) => {
            println!(
                "Run completed: {} scraped, {} unique, {} relevant",
                summary.scraped_count, summary.unique_count, summary.relevant_count
            );
            if let Some(path) = &summary.export_path {
                println!("Export: {}", path.display());
            }
            for (company, count) in &summary.by_company {
                println!("  {company}: {count}");
            }
            Ok(())
        }
        RunOutcome::Skipped => {
            println!("Run skipped: another run is in progress");
            Ok(())
        }
        RunOutcome::Failed { message } => Err(AppError::RunFailed(message)),
    }
}

/// Reads only the registry files, so no mail settings are needed.
pub(crate) fn list_sources(args: SourcesArgs) -> Result<(), AppError> {
    let data_dir = args
        .data_dir
        .or_else(|| std::env::var_os("DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("data"));
    let registry = SourceRegistry::load(&data_dir)?;

    if args.json {
        let payload = serde_json::json!({
            "sources": registry.sources,
            "keywords": registry.keywords,
        });
        let rendered = serde_json::to_string_pretty(&payload)
            .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
        println!("{rendered}");
        return Ok(());
    }

    println!("{:<24} {:<10} {:>8}  SEARCH URL", "SOURCE", "STRATEGY", "KEYWORDS");
    for source in &registry.sources {
        let budget = registry
            .keywords
            .first(source.strategy.keyword_limit())
            .len();
        println!(
            "{:<24} {:<10} {:>8}  {}",
            source.name, source.strategy, budget, source.search_url
        );
    }
    println!();
    println!("Primary keywords: {}", registry.keywords.primary.join(", "));
    Ok(())
}
