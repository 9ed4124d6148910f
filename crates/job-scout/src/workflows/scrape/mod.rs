pub mod adapters;
pub mod browser;
mod dedupe;
pub mod domain;
mod export;
pub mod notify;
mod orchestrator;
mod pacing;
pub mod registry;
mod runner;
mod schedule;

pub use dedupe::{dedupe, filter_relevant};
pub use domain::{JobRecord, KeywordList, SelectorBindings, SourceDescriptor, Strategy};
pub use export::{ExportArtifact, ExportError, ExportWriter, EXPORT_HEADER};
pub use notify::{DeliveryReceipt, JobReport, NotificationError, Notifier, SmtpNotifier};
pub use orchestrator::{ScrapeError, ScrapeOrchestrator};
pub use pacing::PacingPolicy;
pub use registry::{RegistryError, SourceRegistry};
pub use runner::{
    error_trace, RunError, RunOutcome, RunStatusView, RunSummary, RunTrigger, ScrapeRunner,
};
pub use schedule::{normalize_expression, start_scheduler, SchedulerError};
