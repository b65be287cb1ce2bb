//! Event registration gate.
//!
//! Validates the registration window, prevents duplicate sign-ups, issues
//! single-use acceptance tokens and sends best-effort notification emails.

use std::sync::Arc;

use chrono::{Duration, Local, Utc};
use metrics::counter;
use serde_json::{Map, Value};
use shared::crypto::generate_token_hex;
use shared::validation::{normalize_email, parse_mailbox, Mailbox};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::event::{RegisterRequest, RegisterResponse};
use crate::models::{AcceptOutcome, Event, NewEventRegistration, Template};
use crate::services::notification::{Notifier, OutboundEmail};
use crate::services::templating::{
    accept_url, render_bodies, render_body, render_placeholders_html, render_placeholders_text,
    PlaceholderValues,
};
use crate::store::{EventStore, StoreError, TemplateStore, UserStore};

/// Attempts at drawing a token that is not already in use.
pub const TOKEN_ATTEMPTS: usize = 5;

pub const DEFAULT_ADMIN_TEMPLATE_SLUG: &str = "admin-email-event";

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("invalid_event")]
    InvalidEvent,

    #[error("invalid_email")]
    InvalidEmail,

    #[error("event_closed")]
    EventClosed,

    #[error("already_submitted")]
    AlreadySubmitted,

    #[error("missing_token")]
    MissingToken,

    #[error("token_not_found")]
    TokenNotFound,

    #[error("token_expired")]
    TokenExpired,

    /// Any other failure. The detail is for logs only.
    #[error("error_generic")]
    Generic(String),
}

impl RegistrationError {
    /// Stable error code returned to clients.
    pub fn code(&self) -> &'static str {
        match self {
            RegistrationError::InvalidEvent => "invalid_event",
            RegistrationError::InvalidEmail => "invalid_email",
            RegistrationError::EventClosed => "event_closed",
            RegistrationError::AlreadySubmitted => "already_submitted",
            RegistrationError::MissingToken => "missing_token",
            RegistrationError::TokenNotFound => "not_found",
            RegistrationError::TokenExpired => "token_expired",
            RegistrationError::Generic(_) => "error_generic",
        }
    }

    fn generic(context: &str, err: impl std::fmt::Display) -> Self {
        RegistrationError::Generic(format!("{}: {}", context, err))
    }
}

/// Tunables for the registration gate.
#[derive(Debug, Clone)]
pub struct RegistrationSettings {
    pub token_ttl_days: i64,
    pub max_data_bytes: usize,
    /// Public base URL of the web app, used in accept links.
    pub app_url: String,
    pub admin_template_slug: String,
    /// Extra operational addresses for the missing-template warning.
    pub fallback_recipients: Vec<String>,
}

impl Default for RegistrationSettings {
    fn default() -> Self {
        Self {
            token_ttl_days: 7,
            max_data_bytes: 4000,
            app_url: String::new(),
            admin_template_slug: DEFAULT_ADMIN_TEMPLATE_SLUG.to_string(),
            fallback_recipients: Vec::new(),
        }
    }
}

pub struct RegistrationService {
    events: Arc<dyn EventStore>,
    templates: Arc<dyn TemplateStore>,
    users: Arc<dyn UserStore>,
    notifier: Arc<dyn Notifier>,
    settings: RegistrationSettings,
}

fn record_outcome(outcome: &'static str) {
    counter!("event_registrations_total", "outcome" => outcome).increment(1);
}

impl RegistrationService {
    pub fn new(
        events: Arc<dyn EventStore>,
        templates: Arc<dyn TemplateStore>,
        users: Arc<dyn UserStore>,
        notifier: Arc<dyn Notifier>,
        settings: RegistrationSettings,
    ) -> Self {
        Self {
            events,
            templates,
            users,
            notifier,
            settings,
        }
    }

    pub fn settings(&self) -> &RegistrationSettings {
        &self.settings
    }

    /// Registers `request.email` for the event identified by `slug`.
    pub async fn register(
        &self,
        slug: &str,
        request: RegisterRequest,
    ) -> Result<RegisterResponse, RegistrationError> {
        let result = self.register_inner(slug, request).await;
        match &result {
            Ok(_) => record_outcome("registered"),
            Err(e) => record_outcome(e.code()),
        }
        result
    }

    async fn register_inner(
        &self,
        slug: &str,
        request: RegisterRequest,
    ) -> Result<RegisterResponse, RegistrationError> {
        let slug = slug.trim();
        if slug.is_empty() {
            return Err(RegistrationError::InvalidEvent);
        }

        let event = match self.events.find_event_by_slug(slug).await {
            Ok(Some(event)) => event,
            Ok(None) => return Err(RegistrationError::InvalidEvent),
            Err(e) => {
                warn!(slug = %slug, error = %e, "Failed to load event");
                return Err(RegistrationError::InvalidEvent);
            }
        };

        if !event.active {
            return Err(RegistrationError::EventClosed);
        }
        if event.event_date.is_none() {
            return Err(RegistrationError::InvalidEvent);
        }
        if !event.is_open_at(&Local::now()) {
            return Err(RegistrationError::EventClosed);
        }

        let data = self.check_data(request.data)?;
        let email = normalize_email(&request.email).ok_or(RegistrationError::InvalidEmail)?;

        match self.events.find_registration(event.id, &email).await {
            Ok(Some(_)) => return Err(RegistrationError::AlreadySubmitted),
            Ok(None) => {}
            Err(e) => warn!(event_id = %event.id, error = %e, "Duplicate lookup failed"),
        }

        let token = self.generate_unique_token().await?;
        let new_registration = NewEventRegistration {
            event: event.id,
            email: email.clone(),
            data: Value::Object(data.clone()),
            accept_token: token.clone(),
            accept_expires_at: Utc::now() + Duration::days(self.settings.token_ttl_days),
        };

        let registration = match self.events.insert_registration(new_registration).await {
            Ok(registration) => registration,
            Err(StoreError::Conflict(constraint)) => {
                debug!(
                    event_id = %event.id,
                    constraint = %constraint,
                    "Registration conflict on insert"
                );
                return Err(RegistrationError::AlreadySubmitted);
            }
            Err(e) => return Err(RegistrationError::generic("insert registration", e)),
        };

        info!(
            registration_id = %registration.id,
            event_id = %event.id,
            "Event registration created"
        );

        let email_sent = self.send_registrant_email(&event, &email).await;
        self.send_admin_notification(&event, &email, &token, &data)
            .await;

        Ok(RegisterResponse {
            id: registration.id,
            email_sent,
        })
    }

    fn check_data(&self, data: Option<Value>) -> Result<Map<String, Value>, RegistrationError> {
        let data = match data {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(RegistrationError::Generic(
                    "data must be a JSON object".to_string(),
                ))
            }
        };

        let size = serde_json::to_vec(&data)
            .map_err(|e| RegistrationError::generic("serialize data", e))?
            .len();
        if size > self.settings.max_data_bytes {
            return Err(RegistrationError::Generic(format!(
                "data is {} bytes, limit is {}",
                size, self.settings.max_data_bytes
            )));
        }
        Ok(data)
    }

    async fn generate_unique_token(&self) -> Result<String, RegistrationError> {
        for _ in 0..TOKEN_ATTEMPTS {
            let token = generate_token_hex();
            let taken = self
                .events
                .accept_token_exists(&token)
                .await
                .map_err(|e| RegistrationError::generic("token lookup", e))?;
            if !taken {
                return Ok(token);
            }
        }
        Err(RegistrationError::Generic(
            "unable to generate unique accept token".to_string(),
        ))
    }

    /// Sends the event's reply template to the registrant. Returns whether it was delivered.
    async fn send_registrant_email(&self, event: &Event, email: &str) -> bool {
        let Some(template_id) = event.reply_template else {
            return false;
        };

        let template = match self.templates.find_template(template_id).await {
            Ok(Some(template)) => template,
            Ok(None) => {
                warn!(template_id = %template_id, "Reply template not found");
                return false;
            }
            Err(e) => {
                warn!(template_id = %template_id, error = %e, "Failed to load reply template");
                return false;
            }
        };

        if template.is_blank() {
            return false;
        }

        let body = render_body(&template.body);
        let message = OutboundEmail {
            to: vec![Mailbox {
                name: None,
                address: email.to_string(),
            }],
            subject: template.subject.clone(),
            text: body.text,
            html: body.html,
            reply_to: template.reply_to.as_deref().and_then(parse_mailbox),
        };

        match self.notifier.send(message).await {
            Ok(()) => true,
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "Failed to send registration email");
                false
            }
        }
    }

    async fn load_admin_template(&self) -> Option<(Template, Mailbox)> {
        let slug = &self.settings.admin_template_slug;
        let template = match self.templates.find_template_by_slug(slug).await {
            Ok(Some(template)) => template,
            Ok(None) => return None,
            Err(e) => {
                warn!(slug = %slug, error = %e, "Failed to load admin template");
                return None;
            }
        };

        if template.is_blank() {
            return None;
        }
        let recipient = template.to.as_deref().and_then(parse_mailbox)?;
        Some((template, recipient))
    }

    async fn send_admin_notification(
        &self,
        event: &Event,
        email: &str,
        token: &str,
        data: &Map<String, Value>,
    ) {
        let Some((template, recipient)) = self.load_admin_template().await else {
            self.send_admin_template_missing(event, email).await;
            return;
        };

        let name = data
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        let url = accept_url(&self.settings.app_url, token);
        let values = PlaceholderValues {
            event: event.title.trim(),
            name,
            email,
            data: Some(data),
            accept_url: url.as_deref(),
        };

        let body = render_bodies(
            &render_placeholders_text(&template.body, &values),
            &render_placeholders_html(&template.body, &values),
        );
        let message = OutboundEmail {
            to: vec![recipient],
            subject: render_placeholders_text(&template.subject, &values),
            text: body.text,
            html: body.html,
            reply_to: None,
        };

        if let Err(e) = self.notifier.send(message).await {
            warn!(event_id = %event.id, error = %e, "Failed to send admin notification");
        }
    }

    async fn fallback_recipients(&self) -> Vec<Mailbox> {
        let mut addresses: Vec<String> = self.settings.fallback_recipients.clone();
        match self.users.list_admin_emails().await {
            Ok(emails) => addresses.extend(emails),
            Err(e) => warn!(error = %e, "Failed to load admin emails"),
        }

        let mut recipients: Vec<Mailbox> = Vec::new();
        for mailbox in addresses.iter().filter_map(|raw| parse_mailbox(raw)) {
            if !recipients.iter().any(|m| m.address == mailbox.address) {
                recipients.push(mailbox);
            }
        }
        recipients
    }

    async fn send_admin_template_missing(&self, event: &Event, email: &str) {
        let recipients = self.fallback_recipients().await;
        if recipients.is_empty() {
            warn!(event_id = %event.id, "Admin template missing and no fallback recipients");
            return;
        }

        let slug = &self.settings.admin_template_slug;
        let body = format!(
            "Missing admin email template: {slug}\n\
             Create a template with slug \"{slug}\" and a \"to\" address.\n\
             It is used by event registrations to notify admins.\n\n\
             Suggested content:\n\
             Subject: New registration for [event]\n\
             Body: New registration for [event]. Email: [email].\n\n\
             Placeholders: [event] [name] [email] [data] [accept_button]\n\n\
             Event: {event}\n\
             Registrant: {email}",
            slug = slug,
            event = event.title.trim(),
            email = email.trim(),
        );
        let rendered = render_body(&body);

        let message = OutboundEmail {
            to: recipients,
            subject: format!("Missing {} template", slug),
            text: rendered.text,
            html: rendered.html,
            reply_to: None,
        };

        if let Err(e) = self.notifier.send(message).await {
            warn!(event_id = %event.id, error = %e, "Failed to send admin template warning");
        }
    }

    /// Marks the registration holding `token` as accepted.
    pub async fn accept_by_token(
        &self,
        token: Option<&str>,
    ) -> Result<AcceptOutcome, RegistrationError> {
        let token = token.map(str::trim).unwrap_or_default();
        if token.is_empty() {
            return Err(RegistrationError::MissingToken);
        }

        let registration = self
            .events
            .find_registration_by_token(token)
            .await
            .map_err(|e| RegistrationError::generic("token lookup", e))?
            .ok_or(RegistrationError::TokenNotFound)?;

        if registration.is_expired_at(Utc::now()) {
            counter!("event_acceptances_total", "outcome" => "expired").increment(1);
            return Err(RegistrationError::TokenExpired);
        }

        if registration.accepted {
            counter!("event_acceptances_total", "outcome" => "already_accepted").increment(1);
            return Ok(AcceptOutcome::AlreadyAccepted);
        }

        self.events
            .mark_registration_accepted(registration.id)
            .await
            .map_err(|e| RegistrationError::generic("accept registration", e))?;

        counter!("event_acceptances_total", "outcome" => "accepted").increment(1);
        info!(registration_id = %registration.id, "Event registration accepted");
        Ok(AcceptOutcome::Accepted)
    }
}
