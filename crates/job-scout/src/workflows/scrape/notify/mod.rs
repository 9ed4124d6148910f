//! Operator notification: run reports and error reports.

mod mail;
pub mod report;

pub use mail::SmtpNotifier;
pub use report::JobReport;

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("'{0}' is not a valid mailbox")]
    Address(String),
    #[error("unable to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp delivery failed: {0}")]
    Transport(#[source] lettre::transport::smtp::Error),
    #[error("delivery task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Identifier of a delivered report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    pub message_id: String,
    pub relevant_count: usize,
}

/// Outbound channel for run results. Callers log failures and carry on; a
/// failed notification never fails a run.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_report(&self, report: &JobReport) -> Result<DeliveryReceipt, NotificationError>;

    async fn send_error_report(&self, message: &str, trace: &str) -> Result<(), NotificationError>;
}
