//! Event and event registration entities (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Event, EventRegistration};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the events table.
#[derive(Debug, Clone, FromRow)]
pub struct EventEntity {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub event_date: Option<DateTime<Utc>>,
    pub active: bool,
    pub reply_template_id: Option<Uuid>,
}

impl From<EventEntity> for Event {
    fn from(entity: EventEntity) -> Self {
        Self {
            id: entity.id,
            slug: entity.slug,
            title: entity.title,
            event_date: entity.event_date,
            active: entity.active,
            reply_template: entity.reply_template_id,
        }
    }
}

/// Database row mapping for the event_registrations table.
#[derive(Debug, Clone, FromRow)]
pub struct EventRegistrationEntity {
    pub id: Uuid,
    pub event_id: Uuid,
    pub email: String,
    pub data: serde_json::Value,
    pub accept_token: String,
    pub accept_expires_at: Option<DateTime<Utc>>,
    pub accepted: bool,
    pub created_at: DateTime<Utc>,
}

impl From<EventRegistrationEntity> for EventRegistration {
    fn from(entity: EventRegistrationEntity) -> Self {
        Self {
            id: entity.id,
            event: entity.event_id,
            email: entity.email,
            data: entity.data,
            accept_token: entity.accept_token,
            accept_expires_at: entity.accept_expires_at,
            accepted: entity.accepted,
            created_at: entity.created_at,
        }
    }
}
