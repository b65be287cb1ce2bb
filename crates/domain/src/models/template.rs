//! Email template model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored email template. `body` is markdown, optionally prefixed with `md:`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: Uuid,
    pub slug: Option<String>,
    pub name: String,
    pub subject: String,
    pub body: String,
    pub reply_to: Option<String>,
    pub to: Option<String>,
}

impl Template {
    /// A template with a blank subject or body is not sendable.
    pub fn is_blank(&self) -> bool {
        self.subject.trim().is_empty() || self.body.trim().is_empty()
    }
}
