//! Process-wide tracing setup for the scraper, the scheduler and the HTTP surface.

use crate::config::TelemetryConfig;
use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::EnvFilter;

/// Dependencies that log every CDP frame or SMTP exchange at debug level.
const NOISY_TARGETS: [(&str, &str); 3] = [
    ("chromiumoxide", "warn"),
    ("tokio_cron_scheduler", "warn"),
    ("lettre", "info"),
];

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log level/filter '{value}': unable to build EnvFilter")]
    EnvFilter {
        value: String,
        #[source]
        source: ParseError,
    },
    #[error("telemetry error: {0}")]
    Subscriber(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// `RUST_LOG` wins outright. Otherwise the configured level applies, with
/// browser, scheduler and mail internals capped unless the level names them.
pub fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let invalid = |source| TelemetryError::EnvFilter {
        value: config.log_level.clone(),
        source,
    };
    let mut filter = EnvFilter::try_new(&config.log_level).map_err(invalid)?;
    for (target, level) in NOISY_TARGETS {
        if config.log_level.contains(target) {
            continue;
        }
        let directive: Directive = format!("{target}={level}").parse().map_err(invalid)?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}

pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(config)?)
        .with_target(false)
        .compact()
        .with_ansi(config.ansi)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(log_level: &str) -> TelemetryConfig {
        TelemetryConfig {
            log_level: log_level.to_string(),
            ansi: false,
        }
    }

    #[test]
    fn invalid_filter_is_reported_with_value() {
        std::env::remove_var("RUST_LOG");
        let error = build_filter(&config("scraper=[")).expect_err("filter should not parse");
        assert!(error.to_string().contains("scraper=["));
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn noisy_dependencies_are_capped_unless_named() {
        std::env::remove_var("RUST_LOG");
        let rendered = build_filter(&config("debug")).expect("filter builds").to_string();
        assert!(rendered.contains("chromiumoxide=warn"));
        assert!(rendered.contains("tokio_cron_scheduler=warn"));

        let rendered = build_filter(&config("info,chromiumoxide=trace"))
            .expect("filter builds")
            .to_string();
        assert!(rendered.contains("chromiumoxide=trace"));
        assert!(!rendered.contains("chromiumoxide=warn"));
    }
}
