//! Paycheck mail - capability layer
//!
//! Builds the notification for one retrieved document and delivers it over
//! SMTP. Recipient, subject and attachment name are derived from the
//! provider identity and the period only.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::config::MailSettings;
use crate::error::DispatchError;
use crate::models::{Period, ProviderConfig};

/// Everything needed to deliver one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaycheckMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment_path: PathBuf,
    pub attachment_name: String,
}

impl PaycheckMail {
    /// Compose the notification for `provider`'s document of `period`
    pub fn compose(
        mail: &MailSettings,
        provider: &ProviderConfig,
        period: Period,
        attachment_path: &Path,
    ) -> Self {
        let company = provider.company_name.as_str();
        let worker = provider.worker();

        Self {
            from: format!("{}@{}", mail.username, mail.domain),
            to: recipient_address(&mail.username, &mail.domain, company, worker),
            subject: subject(company, worker, period),
            body: body(company, worker, period),
            attachment_path: attachment_path.to_path_buf(),
            attachment_name: format!("{}.pdf", attachment_stem(company, period)),
        }
    }
}

/// Plus-addressed mailbox, e.g. `me+dana+paychecks-acme@gmail.com`
pub fn recipient_address(username: &str, domain: &str, company: &str, worker: Option<&str>) -> String {
    let worker_part = worker.map(|w| format!("{}+", w)).unwrap_or_default();
    format!("{}+{}paychecks-{}@{}", username, worker_part, company, domain)
}

fn for_worker(worker: Option<&str>) -> String {
    worker.map(|w| format!("for {} ", w)).unwrap_or_default()
}

pub fn subject(company: &str, worker: Option<&str>, period: Period) -> String {
    format!("Paycheck {}from {} at {}", for_worker(worker), company, period)
}

pub fn body(company: &str, worker: Option<&str>, period: Period) -> String {
    format!("New paycheck {}from {} attached for {}", for_worker(worker), company, period)
}

/// `paycheck.{company}.{year}-{month}`, without extension
pub fn attachment_stem(company: &str, period: Period) -> String {
    format!("paycheck.{}.{}-{}", company, period.year(), period.month_number())
}

/// Delivers a composed paycheck mail
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(&self, mail: &PaycheckMail) -> Result<(), DispatchError>;
}

/// SMTP delivery through an authenticated relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(settings: &MailSettings) -> Result<Self, DispatchError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)
            .map_err(|e| DispatchError::Transport(e.to_string()))?
            .credentials(Credentials::new(
                format!("{}@{}", settings.username, settings.domain),
                settings.password.clone(),
            ))
            .build();

        Ok(Self { transport })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DispatchError> {
    address.parse().map_err(|e: lettre::address::AddressError| DispatchError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Turn a composed mail plus the attachment bytes into a MIME message
pub fn build_message(mail: &PaycheckMail, attachment: Vec<u8>) -> Result<Message, DispatchError> {
    let pdf = ContentType::parse("application/pdf")
        .map_err(|e| DispatchError::Message(e.to_string()))?;

    Message::builder()
        .from(parse_mailbox(&mail.from)?)
        .to(parse_mailbox(&mail.to)?)
        .subject(mail.subject.clone())
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(mail.body.clone()))
                .singlepart(Attachment::new(mail.attachment_name.clone()).body(attachment, pdf)),
        )
        .map_err(|e| DispatchError::Message(e.to_string()))
}

#[async_trait]
impl NotificationDispatcher for SmtpMailer {
    async fn send(&self, mail: &PaycheckMail) -> Result<(), DispatchError> {
        let attachment = tokio::fs::read(&mail.attachment_path)
            .await
            .map_err(|source| DispatchError::Attachment {
                path: mail.attachment_path.clone(),
                source,
            })?;

        let message = build_message(mail, attachment)?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        debug!("smtp response: {:?}", response.code());
        info!("Mail sent from {} to {}", mail.from, mail.to);
        Ok(())
    }
}
