//! Outbound email notification abstraction.

use std::sync::Mutex;

use shared::validation::Mailbox;
use thiserror::Error;

/// A rendered email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: Vec<Mailbox>,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub reply_to: Option<Mailbox>,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("No recipients")]
    NoRecipients,

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Delivers outbound emails.
///
/// Callers treat every failure as non-fatal.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<(), NotifyError>;
}

/// Notifier that records messages instead of sending them.
#[derive(Debug, Default)]
pub struct MockNotifier {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
    sent: Mutex<Vec<OutboundEmail>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a notifier that fails every delivery.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Messages accepted so far.
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, email: OutboundEmail) -> Result<(), NotifyError> {
        if email.to.is_empty() {
            return Err(NotifyError::NoRecipients);
        }

        if self.simulate_failure {
            tracing::warn!(subject = %email.subject, "Mock notifier simulating failure");
            return Err(NotifyError::Delivery("Simulated failure".to_string()));
        }

        tracing::info!(
            recipients = email.to.len(),
            subject = %email.subject,
            "Mock: Would send email"
        );

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: Vec<Mailbox>) -> OutboundEmail {
        OutboundEmail {
            to,
            subject: "Hello".to_string(),
            text: "Hi".to_string(),
            html: "<p>Hi</p>".to_string(),
            reply_to: None,
        }
    }

    fn mailbox() -> Mailbox {
        Mailbox {
            name: None,
            address: "a@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mock_notifier_records_sent_messages() {
        let notifier = MockNotifier::new();
        notifier.send(email(vec![mailbox()])).await.unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Hello");
    }

    #[tokio::test]
    async fn test_mock_notifier_failure() {
        let notifier = MockNotifier::failing();
        let result = notifier.send(email(vec![mailbox()])).await;

        assert!(matches!(result, Err(NotifyError::Delivery(_))));
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_mock_notifier_requires_recipients() {
        let notifier = MockNotifier::new();
        let result = notifier.send(email(vec![])).await;
        assert!(matches!(result, Err(NotifyError::NoRecipients)));
    }
}
