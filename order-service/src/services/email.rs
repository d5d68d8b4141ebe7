//! Email transport for order documents.

use crate::config::SmtpConfig;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email transport not enabled")]
    NotEnabled,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Send error: {0}")]
    SendFailed(String),
}

/// One message with a single attachment.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachment: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Returns the transport's message id when it reports one.
    async fn send(&self, email: &OutgoingEmail) -> Result<Option<String>, EmailError>;

    fn is_enabled(&self) -> bool;
}

fn parse_mailbox(address: &str) -> Result<Mailbox, EmailError> {
    address
        .parse()
        .map_err(|e| EmailError::InvalidAddress(format!("{}: {}", address, e)))
}

pub struct SmtpEmailTransport {
    config: SmtpConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpEmailTransport {
    pub fn new(config: SmtpConfig) -> Result<Self, EmailError> {
        if !config.enabled {
            return Ok(Self {
                config,
                transport: None,
            });
        }

        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let relay = if config.implicit_tls() {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        };
        let builder = relay.map_err(|e| {
            EmailError::Configuration(format!("Failed to create SMTP relay: {}", e))
        })?;

        let transport = builder.port(config.port).credentials(creds).build();

        Ok(Self {
            config,
            transport: Some(transport),
        })
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message, EmailError> {
        let from_mailbox = parse_mailbox(&format!(
            "{} <{}>",
            self.config.from_name, self.config.from_email
        ))?;

        let mut builder = Message::builder()
            .from(from_mailbox)
            .to(parse_mailbox(&email.to)?)
            .subject(&email.subject);

        for address in &email.cc {
            builder = builder.cc(parse_mailbox(address)?);
        }
        for address in &email.bcc {
            builder = builder.bcc(parse_mailbox(address)?);
        }

        let content_type = ContentType::parse(&email.mime_type).map_err(|e| {
            EmailError::SendFailed(format!("Invalid MIME type {}: {}", email.mime_type, e))
        })?;

        builder
            .multipart(
                MultiPart::mixed()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.body.clone()),
                    )
                    .singlepart(
                        Attachment::new(email.filename.clone())
                            .body(email.attachment.clone(), content_type),
                    ),
            )
            .map_err(|e| EmailError::SendFailed(format!("Failed to build message: {}", e)))
    }
}

#[async_trait]
impl EmailTransport for SmtpEmailTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<Option<String>, EmailError> {
        if !self.config.enabled {
            return Err(EmailError::NotEnabled);
        }

        let transport = self.transport.as_ref().ok_or_else(|| {
            EmailError::Configuration("SMTP transport not initialized".to_string())
        })?;

        let message = self.build_message(email)?;

        let response = transport
            .send(message)
            .await
            .map_err(|e| EmailError::SendFailed(format!("Failed to send email: {}", e)))?;

        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            filename = %email.filename,
            "Email sent successfully"
        );

        let message_id = response.message().next().map(str::to_string);
        Ok(message_id)
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

/// Mock transport for testing. Keeps every message it accepts.
pub struct MockEmailTransport {
    fail: AtomicBool,
    send_count: AtomicU64,
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl Default for MockEmailTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmailTransport {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            send_count: AtomicU64::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EmailTransport for MockEmailTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<Option<String>, EmailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmailError::SendFailed("mock transport failure".to_string()));
        }

        let count = self.send_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }

        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "[MOCK] Email would be sent"
        );

        Ok(Some(format!("mock-email-{}", count)))
    }

    fn is_enabled(&self) -> bool {
        true
    }
}
