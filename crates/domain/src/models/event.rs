//! Event and event registration domain models.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An event people can sign up for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Event {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub event_date: Option<DateTime<Utc>>,
    pub active: bool,
    pub reply_template: Option<Uuid>,
}

impl Event {
    /// Whether registrations are open at `now`.
    ///
    /// The event must be active and fall on a calendar day strictly after the
    /// day of `now`, both taken in `now`'s timezone.
    pub fn is_open_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        match self.event_date {
            Some(date) => {
                let event_day = date.with_timezone(&now.timezone()).date_naive();
                self.active && event_day > now.date_naive()
            }
            None => false,
        }
    }
}

/// A sign-up for an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EventRegistration {
    pub id: Uuid,
    pub event: Uuid,
    pub email: String,
    pub data: serde_json::Value,
    pub accept_token: String,
    pub accept_expires_at: Option<DateTime<Utc>>,
    pub accepted: bool,
    pub created_at: DateTime<Utc>,
}

impl EventRegistration {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.accept_expires_at.is_some_and(|expires| now > expires)
    }
}

/// Fields of a registration about to be inserted.
#[derive(Debug, Clone)]
pub struct NewEventRegistration {
    pub event: Uuid,
    pub email: String,
    pub data: serde_json::Value,
    pub accept_token: String,
    pub accept_expires_at: DateTime<Utc>,
}

/// Request body for registering to an event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Response for a successful registration.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
    pub email_sent: bool,
}

/// Query parameters for token acceptance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcceptQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Result of accepting a registration token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptOutcome {
    Accepted,
    AlreadyAccepted,
}

/// Response body for token acceptance.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptResponse {
    pub status: AcceptOutcome,
}
