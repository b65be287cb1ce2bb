//! Common test utilities for integration tests.
//!
//! Builds the full router on top of the in-memory store with a recording
//! notifier, and seeds a small directory: an admin, a group leader, a plain
//! member, one region with an open group led by the leader, and an open event.

// Helpers are shared across test binaries; not every binary uses every one.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use domain::models::{Event, Group, Region, Template, User};
use domain::services::MockNotifier;
use domain::store::Stores;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use membership_api::{app::create_app, config::Config};
use persistence::memory::MemoryStore;
use shared::jwt::JwtConfig;
use tower::ServiceExt;
use uuid::Uuid;

pub const EVENT_SLUG: &str = "spring-camp";
pub const OFFICE_ADDRESS: &str = "office@example.com";

/// Test configuration. Rate limiting is off unless overridden.
pub fn test_config() -> Config {
    test_config_with(&[])
}

pub fn test_config_with(overrides: &[(&str, &str)]) -> Config {
    Config::load_for_test(overrides).expect("Failed to build test config")
}

pub fn unique_test_email() -> String {
    let email: String = SafeEmail().fake();
    format!("{}+{}", Uuid::new_v4().simple(), email).to_lowercase()
}

pub fn test_user(admin: bool) -> User {
    User {
        id: Uuid::new_v4(),
        email: unique_test_email(),
        name: Some(Name().fake()),
        admin,
    }
}

/// A running application and handles on everything behind it.
pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<MockNotifier>,
    pub jwt: JwtConfig,
    pub admin: User,
    pub leader: User,
    pub member: User,
    pub region: Region,
    pub group: Group,
    pub event: Event,
    pub reply_template: Template,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        Self::build(config, Arc::new(MockNotifier::new()), true).await
    }

    /// Same directory, but no admin notification template is stored.
    pub async fn without_admin_template() -> Self {
        Self::build(test_config(), Arc::new(MockNotifier::new()), false).await
    }

    pub async fn with_failing_notifier() -> Self {
        Self::build(test_config(), Arc::new(MockNotifier::failing()), true).await
    }

    async fn build(config: Config, notifier: Arc<MockNotifier>, admin_template: bool) -> Self {
        let store = Arc::new(MemoryStore::new());

        let admin = test_user(true);
        let leader = test_user(false);
        let member = test_user(false);
        for user in [&admin, &leader, &member] {
            store.add_user(user.clone()).await;
        }

        let region = Region {
            id: Uuid::new_v4(),
            name: "North".to_string(),
        };
        store.add_region(region.clone()).await;

        let group = Group {
            id: Uuid::new_v4(),
            name: "North Circle".to_string(),
            regions: vec![region.id],
            is_open: true,
            leader: Some(leader.id),
        };
        store.add_group(group.clone()).await;

        let reply_template = Template {
            id: Uuid::new_v4(),
            slug: None,
            name: "Spring camp reply".to_string(),
            subject: "Thanks for registering".to_string(),
            body: "md:See you at **spring camp**.".to_string(),
            reply_to: Some(format!("Camp Office <{}>", OFFICE_ADDRESS)),
            to: None,
        };
        store.add_template(reply_template.clone()).await;

        if admin_template {
            store
                .add_template(Template {
                    id: Uuid::new_v4(),
                    slug: Some("admin-email-event".to_string()),
                    name: "Admin event notification".to_string(),
                    subject: "New registration for [event]".to_string(),
                    body: "[name] <[email]> registered.\n\n[data]\n\n[accept_button]".to_string(),
                    reply_to: None,
                    to: Some(format!("Office <{}>", OFFICE_ADDRESS)),
                })
                .await;
        }

        let event = Event {
            id: Uuid::new_v4(),
            slug: EVENT_SLUG.to_string(),
            title: "Spring Camp".to_string(),
            event_date: Some(Utc::now() + Duration::days(30)),
            active: true,
            reply_template: Some(reply_template.id),
        };
        store.add_event(event.clone()).await;

        let jwt = JwtConfig::with_leeway(
            &config.jwt.secret,
            config.jwt.access_token_expiry_secs,
            config.jwt.leeway_secs,
        )
        .expect("Failed to build JWT config");

        let app = create_app(config, Stores::from_shared(store.clone()), notifier.clone())
            .expect("Failed to create app");

        Self {
            app,
            store,
            notifier,
            jwt,
            admin,
            leader,
            member,
            region,
            group,
            event,
            reply_template,
        }
    }

    pub fn token_for(&self, user: &User) -> String {
        self.jwt
            .generate_access_token(user.id)
            .expect("Failed to issue token")
            .0
    }

    pub fn admin_token(&self) -> String {
        self.token_for(&self.admin)
    }

    pub fn leader_token(&self) -> String {
        self.token_for(&self.leader)
    }

    pub fn member_token(&self) -> String {
        self.token_for(&self.member)
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Adds another group. Not led by the seeded leader.
    pub async fn add_group(&self, is_open: bool, regions: Vec<Uuid>) -> Group {
        let group = Group {
            id: Uuid::new_v4(),
            name: format!("Group {}", Uuid::new_v4().simple()),
            regions,
            is_open,
            leader: None,
        };
        self.store.add_group(group.clone()).await;
        group
    }

    pub async fn add_event(&self, slug: &str, days_ahead: Option<i64>, active: bool) -> Event {
        let event = Event {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            title: format!("Event {}", slug),
            event_date: days_ahead.map(|days| Utc::now() + Duration::days(days)),
            active,
            reply_template: None,
        };
        self.store.add_event(event.clone()).await;
        event
    }

    /// Submits a membership request in the seeded region and returns its JSON.
    pub async fn create_membership_request(&self) -> serde_json::Value {
        let response = self
            .send(json_request(
                Method::POST,
                "/api/v1/requests",
                new_request_body(self.region.id),
                None,
            ))
            .await;
        assert_eq!(response.status(), 201);
        parse_response_body(response).await
    }

    /// Creates a request and moves it to `accepted`, which assigns a group.
    pub async fn create_assigned_request(&self) -> serde_json::Value {
        let created = self.create_membership_request().await;
        let id = created["id"].as_str().unwrap().to_string();

        let response = self
            .send(json_request(
                Method::PATCH,
                &format!("/api/v1/requests/{}/status", id),
                serde_json::json!({ "status": "1-accepted" }),
                Some(&self.admin_token()),
            ))
            .await;
        assert_eq!(response.status(), 200);
        parse_response_body(response).await
    }
}

pub fn new_request_body(region: Uuid) -> serde_json::Value {
    serde_json::json!({
        "name": Name().fake::<String>(),
        "email": unique_test_email(),
        "motivation": "I would like to help with the summer camps.",
        "birth_year": "1990",
        "civil_status": "single",
        "region": region,
    })
}

/// Build a request with a JSON body and optional bearer token.
pub fn json_request(
    method: Method,
    uri: &str,
    body: serde_json::Value,
    token: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Build a GET request with optional bearer token.
pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Helper to parse JSON response body.
pub async fn parse_response_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}
