//! # Registry Notify
//!
//! Best-effort outbound notifications.
//!
//! A [`Notifier`] is chosen once at start-up by [`notifier_from_config`]: the SMTP variant when
//! mail configuration is complete, the no-op variant otherwise. Callers never see delivery
//! failures; they are logged inside the notifier.
//!
//! [`NotificationDispatcher`] detaches each send onto its own Tokio task so that no request ever
//! waits on a mail server.

mod dispatcher;
mod smtp;

pub use dispatcher::NotificationDispatcher;
pub use smtp::{SmtpConfig, SmtpNotifier, SMTP_SSL_PORT, SMTP_TIMEOUT};

use async_trait::async_trait;
use std::sync::Arc;

/// Subject used when a message does not carry one.
pub const DEFAULT_SUBJECT: &str = "Notification";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build email: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// A single outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub recipient: String,
    pub recipient_name: Option<String>,
    pub subject: Option<String>,
    pub body: String,
}

impl NotificationMessage {
    pub fn subject_or_default(&self) -> &str {
        self.subject.as_deref().unwrap_or(DEFAULT_SUBJECT)
    }
}

/// Capability to deliver a [`NotificationMessage`].
///
/// Implementations must absorb their own failures: `notify` has nothing to return.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: NotificationMessage);

    /// Short label used in logs ("smtp", "noop").
    fn kind(&self) -> &'static str;
}

/// Notifier used when mail configuration is absent. Performs no network I/O.
#[derive(Debug, Default, Clone)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, message: NotificationMessage) {
        tracing::info!(
            recipient = %message.recipient,
            subject = message.subject_or_default(),
            body_len = message.body.len(),
            "noop notifier - skipping send"
        );
    }

    fn kind(&self) -> &'static str {
        "noop"
    }
}

/// Selects the notifier for this process.
///
/// Returns the SMTP notifier when `config` is present and the transport can be built; falls back
/// to [`NoopNotifier`] otherwise (logging why).
pub fn notifier_from_config(config: Option<&SmtpConfig>) -> Arc<dyn Notifier> {
    let Some(config) = config else {
        tracing::info!("mail configuration incomplete; notifications disabled");
        return Arc::new(NoopNotifier);
    };

    match SmtpNotifier::new(config) {
        Ok(notifier) => {
            tracing::info!(host = %config.host, port = config.port, "SMTP notifications enabled");
            Arc::new(notifier)
        }
        Err(e) => {
            tracing::error!("failed to build SMTP notifier, notifications disabled: {}", e);
            Arc::new(NoopNotifier)
        }
    }
}
