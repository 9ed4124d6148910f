use async_trait::async_trait;
use chrono::Utc;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MessageBuilder, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

use super::report::{error_subject, render_error_html, render_report_html, report_subject};
use super::{DeliveryReceipt, JobReport, NotificationError, Notifier};
use crate::config::MailConfig;

/// Delivers reports through an SMTP relay using STARTTLS.
pub struct SmtpNotifier {
    transport: SmtpTransport,
    from: Mailbox,
    recipients: Vec<Mailbox>,
    sequence: AtomicU64,
}

impl SmtpNotifier {
    pub fn from_config(config: &MailConfig) -> Result<Self, NotificationError> {
        let transport = SmtpTransport::starttls_relay(&config.host)
            .map_err(NotificationError::Transport)?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        let from = Mailbox::new(
            Some(config.sender_name.clone()),
            config
                .from_address
                .parse()
                .map_err(|_| NotificationError::Address(config.from_address.clone()))?,
        );
        let recipients = parse_recipients(&config.recipient)?;

        Ok(Self {
            transport,
            from,
            recipients,
            sequence: AtomicU64::new(0),
        })
    }

    fn envelope(&self, subject: String) -> (MessageBuilder, String) {
        let message_id = format!(
            "<{}.{}@{}>",
            Utc::now().timestamp_millis(),
            self.sequence.fetch_add(1, Ordering::Relaxed),
            self.from.email.domain()
        );
        let builder = self.recipients.iter().cloned().fold(
            Message::builder()
                .from(self.from.clone())
                .subject(subject)
                .message_id(Some(message_id.clone())),
            MessageBuilder::to,
        );
        (builder, message_id)
    }

    async fn deliver(&self, message: Message) -> Result<(), NotificationError> {
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await?
            .map_err(NotificationError::Transport)?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_report(&self, report: &JobReport) -> Result<DeliveryReceipt, NotificationError> {
        let now = Utc::now();
        let subject = report_subject(now.date_naive(), report.relevant_count);
        let (builder, message_id) = self.envelope(subject);

        let mut body = MultiPart::mixed().singlepart(SinglePart::html(render_report_html(report, now)));
        match report.export_path.as_deref().filter(|_| report.has_attachment()) {
            Some(path) => match csv_attachment(path).await {
                Ok(attachment) => {
                    info!(path = %path.display(), "attaching export");
                    body = body.singlepart(attachment);
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "could not attach export, sending without it");
                }
            },
            None => info!("no export to attach"),
        }

        let message = builder.multipart(body)?;
        self.deliver(message).await?;

        info!(%message_id, relevant = report.relevant_count, "job report sent");
        Ok(DeliveryReceipt {
            message_id,
            relevant_count: report.relevant_count,
        })
    }

    async fn send_error_report(&self, message: &str, trace: &str) -> Result<(), NotificationError> {
        let now = Utc::now();
        let (builder, message_id) = self.envelope(error_subject(now.date_naive()));
        let mail = builder
            .header(ContentType::TEXT_HTML)
            .body(render_error_html(message, trace, now))?;

        self.deliver(mail).await?;
        info!(%message_id, "error report sent");
        Ok(())
    }
}

async fn csv_attachment(path: &Path) -> Result<SinglePart, std::io::Error> {
    let content = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export.csv".to_string());
    let content_type = ContentType::parse("text/csv")
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;
    Ok(Attachment::new(file_name).body(content, content_type))
}

/// `EMAIL_TO` may list several comma-separated addresses.
fn parse_recipients(raw: &str) -> Result<Vec<Mailbox>, NotificationError> {
    let recipients = raw
        .split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(|address| {
            address
                .parse::<Mailbox>()
                .map_err(|_| NotificationError::Address(address.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if recipients.is_empty() {
        return Err(NotificationError::Address(raw.to_string()));
    }
    Ok(recipients)
}
