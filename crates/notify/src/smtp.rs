//! SMTP-backed notifier.

use crate::{NotificationMessage, Notifier, NotifyError};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

/// Port on which the server expects implicit TLS; every other port negotiates STARTTLS.
pub const SMTP_SSL_PORT: u16 = 465;

pub const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Complete mail configuration. Only constructed when every field is present.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .finish()
    }
}

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Builds the transport and sender mailbox. No connection is opened until the first send.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` if the relay host or the sender address is invalid.
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let from = Mailbox::new(Some(config.from_name.clone()), config.from_email.parse()?);

        let builder = if config.port == SMTP_SSL_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        };

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self { transport, from })
    }

    fn build_message(&self, message: &NotificationMessage) -> Result<Message, NotifyError> {
        let to = Mailbox::new(message.recipient_name.clone(), message.recipient.parse()?);

        Ok(Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject_or_default())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())?)
    }

    async fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        let email = self.build_message(message)?;
        self.transport.send(email).await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, message: NotificationMessage) {
        match self.send(&message).await {
            Ok(()) => tracing::info!(recipient = %message.recipient, "notification sent"),
            Err(e) => tracing::error!(
                recipient = %message.recipient,
                "failed to send SMTP notification: {}",
                e
            ),
        }
    }

    fn kind(&self) -> &'static str {
        "smtp"
    }
}
