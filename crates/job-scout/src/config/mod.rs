use chrono_tz::Tz;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CRON_SCHEDULE: &str = "0 */4 * * *";
pub const DEFAULT_SCHEDULE_TIMEZONE: Tz = chrono_tz::America::New_York;
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub mail: MailConfig,
    pub scrape: ScrapeConfig,
    pub schedule: ScheduleConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .or_else(|_| env::var("PORT"))
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let timezone = match optional_var("SCHEDULE_TIMEZONE") {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| ConfigError::InvalidTimezone(name))?,
            None => DEFAULT_SCHEDULE_TIMEZONE,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
            },
            mail: MailConfig::from_env()?,
            scrape: ScrapeConfig::from_env()?,
            schedule: ScheduleConfig {
                expression: optional_var("CRON_SCHEDULE")
                    .unwrap_or_else(|| DEFAULT_CRON_SCHEDULE.to_string()),
                timezone,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    /// Colored output; only enabled for local development.
    pub ansi: bool,
}

/// SMTP relay and mailbox identities for run reports.
#[derive(Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender address; `EMAIL_FROM`, else the SMTP username.
    pub from_address: String,
    pub recipient: String,
    pub sender_name: String,
}

impl MailConfig {
    const REQUIRED: [&'static str; 4] = ["EMAIL_HOST", "EMAIL_USER", "EMAIL_PASS", "EMAIL_TO"];

    fn from_env() -> Result<Self, ConfigError> {
        let missing: Vec<&'static str> = Self::REQUIRED
            .into_iter()
            .filter(|name| optional_var(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingVars(missing));
        }

        let port = match optional_var("EMAIL_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidNumber { name: "EMAIL_PORT" })?,
            None => 587,
        };

        let username = required_var("EMAIL_USER")?;
        Ok(Self {
            host: required_var("EMAIL_HOST")?,
            port,
            from_address: optional_var("EMAIL_FROM").unwrap_or_else(|| username.clone()),
            username,
            password: required_var("EMAIL_PASS")?,
            recipient: required_var("EMAIL_TO")?,
            sender_name: optional_var("EMAIL_FROM_NAME")
                .unwrap_or_else(|| "Job Scraper Bot".to_string()),
        })
    }
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("from_address", &self.from_address)
            .field("recipient", &self.recipient)
            .field("sender_name", &self.sender_name)
            .finish_non_exhaustive()
    }
}

/// Browser, pacing, and file locations used by a scrape run.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub export_prefix: String,
    pub user_agent: String,
    pub chrome_path: Option<PathBuf>,
    pub navigation_timeout: Duration,
    /// Replaces every per-strategy pacing delay when set.
    pub delay_override: Option<Duration>,
}

impl ScrapeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let navigation_timeout = match optional_var("NAVIGATION_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(raw.parse::<u64>().map_err(|_| {
                ConfigError::InvalidNumber {
                    name: "NAVIGATION_TIMEOUT_MS",
                }
            })?),
            None => Duration::from_secs(30),
        };

        let delay_override = optional_var("SCRAPING_DELAY")
            .map(|raw| {
                raw.parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|_| ConfigError::InvalidNumber {
                        name: "SCRAPING_DELAY",
                    })
            })
            .transpose()?;

        Ok(Self {
            data_dir: optional_var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            output_dir: optional_var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output")),
            export_prefix: optional_var("EXPORT_PREFIX")
                .unwrap_or_else(|| "frontend-jobs".to_string()),
            user_agent: optional_var("USER_AGENT")
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            chrome_path: optional_var("CHROME_PATH").map(PathBuf::from),
            navigation_timeout,
            delay_override,
        })
    }
}

/// Recurring trigger for scheduled runs, evaluated in `timezone`.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub expression: String,
    pub timezone: Tz,
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
    optional_var(name).ok_or(ConfigError::MissingVars(vec![name]))
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { name: &'static str },
    InvalidTimezone(String),
    MissingVars(Vec<&'static str>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { name } => {
                write!(f, "{name} must be a non-negative integer")
            }
            ConfigError::InvalidTimezone(name) => {
                write!(f, "SCHEDULE_TIMEZONE '{name}' is not an IANA time zone")
            }
            ConfigError::MissingVars(names) => write!(
                f,
                "missing required environment variables: {}",
                names.join(", ")
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidTimezone(_)
            | ConfigError::MissingVars(_) => None,
        }
    }
}
