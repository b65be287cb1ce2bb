//! Event and event registration repository.

use async_trait::async_trait;
use domain::models::{Event, EventRegistration, NewEventRegistration};
use domain::store::{EventStore, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{EventEntity, EventRegistrationEntity};
use crate::metrics::QueryTimer;

const REGISTRATION_COLUMNS: &str =
    "id, event_id, email, data, accept_token, accept_expires_at, accepted, created_at";

/// Repository for events and their registrations.
#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for EventRepository {
    async fn find_event_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError> {
        let timer = QueryTimer::new("find_event_by_slug");
        let result = sqlx::query_as::<_, EventEntity>(
            r#"
            SELECT id, slug, title, event_date, active, reply_template_id
            FROM events
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await;
        timer.record(&result);
        Ok(result?.map(Into::into))
    }

    async fn find_registration(
        &self,
        event: Uuid,
        email: &str,
    ) -> Result<Option<EventRegistration>, StoreError> {
        let timer = QueryTimer::new("find_registration_by_event_email");
        let result = sqlx::query_as::<_, EventRegistrationEntity>(&format!(
            "SELECT {} FROM event_registrations WHERE event_id = $1 AND email = $2",
            REGISTRATION_COLUMNS
        ))
        .bind(event)
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record(&result);
        Ok(result?.map(Into::into))
    }

    async fn find_registration_by_token(
        &self,
        token: &str,
    ) -> Result<Option<EventRegistration>, StoreError> {
        let timer = QueryTimer::new("find_registration_by_token");
        let result = sqlx::query_as::<_, EventRegistrationEntity>(&format!(
            "SELECT {} FROM event_registrations WHERE accept_token = $1",
            REGISTRATION_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await;
        timer.record(&result);
        Ok(result?.map(Into::into))
    }

    async fn accept_token_exists(&self, token: &str) -> Result<bool, StoreError> {
        let timer = QueryTimer::new("accept_token_exists");
        let result: Result<bool, sqlx::Error> = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM event_registrations WHERE accept_token = $1)",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await;
        timer.record(&result);
        Ok(result?)
    }

    async fn insert_registration(
        &self,
        registration: NewEventRegistration,
    ) -> Result<EventRegistration, StoreError> {
        let timer = QueryTimer::new("insert_registration");
        let result = sqlx::query_as::<_, EventRegistrationEntity>(&format!(
            r#"
            INSERT INTO event_registrations (event_id, email, data, accept_token, accept_expires_at, accepted)
            VALUES ($1, $2, $3, $4, $5, false)
            RETURNING {}
            "#,
            REGISTRATION_COLUMNS
        ))
        .bind(registration.event)
        .bind(&registration.email)
        .bind(&registration.data)
        .bind(&registration.accept_token)
        .bind(registration.accept_expires_at)
        .fetch_one(&self.pool)
        .await;
        timer.record(&result);
        Ok(result?.into())
    }

    async fn mark_registration_accepted(&self, id: Uuid) -> Result<EventRegistration, StoreError> {
        let timer = QueryTimer::new("mark_registration_accepted");
        let result = sqlx::query_as::<_, EventRegistrationEntity>(&format!(
            "UPDATE event_registrations SET accepted = true WHERE id = $1 RETURNING {}",
            REGISTRATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record(&result);
        result?.map(Into::into).ok_or(StoreError::NotFound)
    }
}
