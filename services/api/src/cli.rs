use crate::commands::{list_sources, run_scheduler, run_single};
use crate::server;
use clap::{Args, Parser, Subcommand};
use job_scout::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Job Scout",
    about = "Scrape career portals on a schedule, export the listings and mail a report",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service and the scheduler (default command)
    Serve(ServeArgs),
    /// Run the scheduler without the HTTP service until interrupted
    Schedule,
    /// Perform a single scrape run and exit
    Run,
    /// Print the configured career portals and keyword budget
    Sources(SourcesArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Serve HTTP only; runs happen through POST /trigger-scrape
    #[arg(long)]
    pub(crate) no_schedule: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct SourcesArgs {
    /// Directory holding career-portals.json and job-keywords.json (defaults to DATA_DIR or ./data)
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
    /// Emit the registry as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Schedule => run_scheduler().await,
        Command::Run => run_single().await,
        Command::Sources(args) => list_sources(args),
    }
}
