//! Email delivery for registration confirmations and admin warnings.
//!
//! Supports multiple email providers:
//! - `console`: Logs emails to console (development)
//! - `smtp`: Sends via SMTP server
//! - `sendgrid`: Uses SendGrid API

use std::sync::Arc;

use async_trait::async_trait;
use domain::services::{Notifier, NotifyError, OutboundEmail};
use lettre::message::{Mailbox as SmtpMailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use shared::validation::Mailbox;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::EmailConfig;

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// Errors that can occur during email operations.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Email service disabled")]
    Disabled,

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

impl From<EmailError> for NotifyError {
    fn from(err: EmailError) -> Self {
        NotifyError::Delivery(err.to_string())
    }
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
    smtp: Option<AsyncSmtpTransport<Tokio1Executor>>,
    http: reqwest::Client,
}

impl EmailService {
    /// Creates a new EmailService. The SMTP transport is built up front when selected.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let smtp = if config.enabled && config.provider == "smtp" {
            Some(build_smtp_transport(&config)?)
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config),
            smtp,
            http: reqwest::Client::new(),
        })
    }

    /// Check if email service is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Send an email message.
    pub async fn deliver(&self, message: &OutboundEmail) -> Result<(), EmailError> {
        if !self.config.enabled {
            debug!(subject = %message.subject, "Email service disabled, skipping send");
            return Err(EmailError::Disabled);
        }

        match self.config.provider.as_str() {
            "console" => self.send_console(message),
            "smtp" => self.send_smtp(message).await,
            "sendgrid" => self.send_sendgrid(message).await,
            provider => {
                error!(provider = %provider, "Unknown email provider");
                Err(EmailError::NotConfigured)
            }
        }
    }

    fn sender(&self) -> Mailbox {
        Mailbox {
            name: Some(self.config.sender_name.clone()).filter(|n| !n.is_empty()),
            address: self.config.sender_email.clone(),
        }
    }

    /// Console provider - logs email to console (for development).
    fn send_console(&self, message: &OutboundEmail) -> Result<(), EmailError> {
        info!(
            to = %join_mailboxes(&message.to),
            reply_to = ?message.reply_to.as_ref().map(ToString::to_string),
            subject = %message.subject,
            from = %self.sender(),
            "Email (console provider)"
        );
        info!(body_text = %message.text, "Email body (plain text)");
        debug!(body_html_length = message.html.len(), "Email body (HTML)");
        Ok(())
    }

    /// SMTP provider - sends via SMTP server.
    async fn send_smtp(&self, message: &OutboundEmail) -> Result<(), EmailError> {
        let transport = self.smtp.as_ref().ok_or(EmailError::NotConfigured)?;
        let email = build_smtp_message(&self.sender(), message)?;

        transport
            .send(email)
            .await
            .map_err(|e| EmailError::SendFailed(format!("SMTP delivery failed: {}", e)))?;

        info!(
            recipients = message.to.len(),
            subject = %message.subject,
            "Email sent via SMTP"
        );
        Ok(())
    }

    /// SendGrid provider - sends via SendGrid API.
    async fn send_sendgrid(&self, message: &OutboundEmail) -> Result<(), EmailError> {
        if self.config.sendgrid_api_key.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let body = sendgrid_body(&self.sender(), message);

        let response = self
            .http
            .post(SENDGRID_ENDPOINT)
            .bearer_auth(&self.config.sendgrid_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SendGrid request failed: {}", e)))?;

        if response.status().is_success() {
            info!(
                recipients = message.to.len(),
                subject = %message.subject,
                "Email sent via SendGrid"
            );
            Ok(())
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_body, "SendGrid API error");
            Err(EmailError::ProviderError(format!(
                "SendGrid returned {}: {}",
                status, error_body
            )))
        }
    }
}

#[async_trait]
impl Notifier for EmailService {
    async fn send(&self, email: OutboundEmail) -> Result<(), NotifyError> {
        if email.to.is_empty() {
            return Err(NotifyError::NoRecipients);
        }
        self.deliver(&email).await.map_err(Into::into)
    }
}

fn build_smtp_transport(
    config: &EmailConfig,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
    if config.smtp_host.is_empty() {
        return Err(EmailError::NotConfigured);
    }

    let builder = if config.smtp_use_tls {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| EmailError::ProviderError(format!("SMTP relay: {}", e)))?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
    };

    let mut builder = builder.port(config.smtp_port);
    if !config.smtp_username.is_empty() {
        builder = builder.credentials(Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.clone(),
        ));
    }
    Ok(builder.build())
}

fn to_smtp_mailbox(mailbox: &Mailbox) -> Result<SmtpMailbox, EmailError> {
    let address: Address = mailbox
        .address
        .parse()
        .map_err(|_| EmailError::InvalidAddress(mailbox.address.clone()))?;
    Ok(SmtpMailbox::new(mailbox.name.clone(), address))
}

fn build_smtp_message(sender: &Mailbox, message: &OutboundEmail) -> Result<Message, EmailError> {
    let mut builder = Message::builder()
        .from(to_smtp_mailbox(sender)?)
        .subject(message.subject.clone());

    for recipient in &message.to {
        builder = builder.to(to_smtp_mailbox(recipient)?);
    }
    if let Some(reply_to) = &message.reply_to {
        builder = builder.reply_to(to_smtp_mailbox(reply_to)?);
    }

    builder
        .multipart(MultiPart::alternative_plain_html(
            message.text.clone(),
            message.html.clone(),
        ))
        .map_err(|e| EmailError::SendFailed(format!("Failed to build message: {}", e)))
}

fn sendgrid_address(mailbox: &Mailbox) -> serde_json::Value {
    match &mailbox.name {
        Some(name) => serde_json::json!({ "email": mailbox.address, "name": name }),
        None => serde_json::json!({ "email": mailbox.address }),
    }
}

fn sendgrid_body(sender: &Mailbox, message: &OutboundEmail) -> serde_json::Value {
    let to: Vec<_> = message.to.iter().map(sendgrid_address).collect();

    let mut body = serde_json::json!({
        "personalizations": [{ "to": to }],
        "from": sendgrid_address(sender),
        "subject": message.subject,
        "content": [
            { "type": "text/plain", "value": message.text },
            { "type": "text/html", "value": message.html }
        ]
    });

    if let Some(reply_to) = &message.reply_to {
        body["reply_to"] = sendgrid_address(reply_to);
    }
    body
}

fn join_mailboxes(mailboxes: &[Mailbox]) -> String {
    mailboxes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
