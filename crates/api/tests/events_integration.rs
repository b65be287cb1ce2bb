//! Integration tests for event registration and token acceptance.

mod common;

use axum::http::{header, Method, StatusCode};
use axum::response::Response;
use chrono::{Duration, Utc};
use common::{
    get_request, json_request, parse_response_body, test_config_with, unique_test_email, TestApp,
    EVENT_SLUG, OFFICE_ADDRESS,
};
use domain::models::NewEventRegistration;
use domain::store::EventStore;
use serde_json::json;

async fn register(app: &TestApp, slug: &str, body: serde_json::Value) -> Response {
    app.send(json_request(
        Method::POST,
        &format!("/api/v1/events/{}/register", slug),
        body,
        None,
    ))
    .await
}

async fn accept(app: &TestApp, token: Option<&str>) -> Response {
    let uri = match token {
        Some(token) => format!("/api/v1/events/accept?token={}", token),
        None => "/api/v1/events/accept".to_string(),
    };
    app.send(get_request(&uri, None)).await
}

async fn error_code(response: Response) -> String {
    parse_response_body(response).await["error"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_register_success() {
    let app = TestApp::new().await;
    let email = unique_test_email();

    let response = register(
        &app,
        EVENT_SLUG,
        json!({
            "email": format!("Ann Member <{}>", email.to_uppercase()),
            "data": { "name": "Ann" }
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    assert_eq!(body["email_sent"], true);
    assert!(body["id"].is_string());

    let stored = app
        .store
        .registration_for(app.event.id, &email)
        .await
        .expect("registration stored");
    assert!(!stored.accepted);
    assert_eq!(stored.accept_token.len(), 64);
    assert!(stored.accept_token.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(stored.data["name"], "Ann");

    let ttl = stored.accept_expires_at.unwrap() - Utc::now();
    assert!(ttl > Duration::days(7) - Duration::minutes(1));
    assert!(ttl <= Duration::days(7));
}

#[tokio::test]
async fn test_register_sends_confirmation_and_admin_notification() {
    let app = TestApp::new().await;
    let email = unique_test_email();

    register(&app, EVENT_SLUG, json!({ "email": email, "data": { "name": "Ann" } })).await;

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 2);

    let confirmation = &sent[0];
    assert_eq!(confirmation.to[0].address, email);
    assert_eq!(confirmation.subject, "Thanks for registering");
    assert_eq!(
        confirmation.reply_to.as_ref().map(|m| m.address.as_str()),
        Some(OFFICE_ADDRESS)
    );
    assert!(confirmation.html.contains("<strong>spring camp</strong>"));
    assert!(!confirmation.text.starts_with("md:"));

    let notification = &sent[1];
    assert_eq!(notification.to[0].address, OFFICE_ADDRESS);
    assert_eq!(notification.subject, "New registration for Spring Camp");
    assert!(notification.text.contains(&email));
    assert!(notification.text.contains("name: Ann"));
    assert!(notification
        .text
        .contains("https://app.example.com/#/event-accept?token="));
}

#[tokio::test]
async fn test_register_without_admin_template_warns_admins() {
    let app = TestApp::without_admin_template().await;

    register(&app, EVENT_SLUG, json!({ "email": unique_test_email() })).await;

    let sent = app.notifier.sent();
    let warning = sent
        .iter()
        .find(|m| m.subject == "Missing admin-email-event template")
        .expect("fallback warning sent");
    assert!(warning.to.iter().any(|m| m.address == app.admin.email));
    assert!(!warning.to.iter().any(|m| m.address == app.member.email));
}

#[tokio::test]
async fn test_register_reports_failed_delivery() {
    let app = TestApp::with_failing_notifier().await;

    let response = register(&app, EVENT_SLUG, json!({ "email": unique_test_email() })).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(parse_response_body(response).await["email_sent"], false);
}

#[tokio::test]
async fn test_register_twice_already_submitted() {
    let app = TestApp::new().await;
    let email = unique_test_email();

    let first = register(&app, EVENT_SLUG, json!({ "email": email })).await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = register(&app, EVENT_SLUG, json!({ "email": email.to_uppercase() })).await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(second).await, "already_submitted");
}

#[tokio::test]
async fn test_register_rejects_bad_events() {
    let app = TestApp::new().await;
    app.add_event("undated", None, true).await;
    app.add_event("inactive", Some(30), false).await;
    app.add_event("today", Some(0), true).await;
    app.add_event("past", Some(-3), true).await;

    let cases = [
        ("no-such-event", "invalid_event"),
        ("undated", "invalid_event"),
        ("inactive", "event_closed"),
        ("today", "event_closed"),
        ("past", "event_closed"),
    ];
    for (slug, code) in cases {
        let response = register(&app, slug, json!({ "email": unique_test_email() })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "slug {}", slug);
        assert_eq!(error_code(response).await, code, "slug {}", slug);
    }
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let app = TestApp::new().await;

    let response = register(&app, EVENT_SLUG, json!({ "email": "not-an-email" })).await;
    assert_eq!(error_code(response).await, "invalid_email");

    let response = register(&app, EVENT_SLUG, json!({})).await;
    assert_eq!(error_code(response).await, "invalid_email");

    let oversized = "x".repeat(4001);
    let response = register(
        &app,
        EVENT_SLUG,
        json!({ "email": unique_test_email(), "data": { "notes": oversized } }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "error_generic");
    assert_eq!(body["message"], "Registration failed");
}

#[tokio::test]
async fn test_register_mistyped_body_is_generic_error() {
    let app = TestApp::new().await;

    for body in [json!({ "email": 5 }), json!({ "email": "a@example.com", "data": "x" })] {
        let response = register(&app, EVENT_SLUG, body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = parse_response_body(response).await;
        assert_eq!(body["error"], "error_generic");
        assert_eq!(body["message"], "Registration failed");
    }
    assert!(app.notifier.sent().is_empty());
}

// ============================================================================
// Acceptance
// ============================================================================

#[tokio::test]
async fn test_accept_token_then_already_accepted() {
    let app = TestApp::new().await;
    let email = unique_test_email();
    register(&app, EVENT_SLUG, json!({ "email": email })).await;
    let token = app
        .store
        .registration_for(app.event.id, &email)
        .await
        .unwrap()
        .accept_token;

    let response = accept(&app, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_response_body(response).await["status"], "accepted");

    let response = accept(&app, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_response_body(response).await["status"], "already_accepted");

    let stored = app.store.registration_for(app.event.id, &email).await.unwrap();
    assert!(stored.accepted);
}

#[tokio::test]
async fn test_accept_missing_and_unknown_token() {
    let app = TestApp::new().await;

    let response = accept(&app, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await, "missing_token");

    let response = accept(&app, Some("")).await;
    assert_eq!(error_code(response).await, "missing_token");

    let response = accept(&app, Some(&"ab".repeat(32))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_accept_expired_token() {
    let app = TestApp::new().await;
    let email = unique_test_email();
    let token = "cd".repeat(32);
    app.store
        .insert_registration(NewEventRegistration {
            event: app.event.id,
            email: email.clone(),
            data: json!({}),
            accept_token: token.clone(),
            accept_expires_at: Utc::now() - Duration::hours(1),
        })
        .await
        .unwrap();

    let response = accept(&app, Some(&token)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await, "token_expired");
    let stored = app.store.registration_for(app.event.id, &email).await.unwrap();
    assert!(!stored.accepted);
}

// ============================================================================
// Rate limiting
// ============================================================================

#[tokio::test]
async fn test_rate_limit_ignores_spoofed_forwarded_for() {
    let app = TestApp::with_config(test_config_with(&[(
        "security.rate_limit_per_minute",
        "1",
    )]))
    .await;

    let uri = format!("/api/v1/events/accept?token={}", "ef".repeat(32));
    let mut statuses = Vec::new();
    for n in 0..5 {
        let mut request = get_request(&uri, None);
        request
            .headers_mut()
            .insert("x-forwarded-for", format!("10.0.0.{}", n).parse().unwrap());
        statuses.push(app.send(request).await.status());
    }

    assert_eq!(statuses[0], StatusCode::NOT_FOUND);
    assert!(statuses[1..]
        .iter()
        .all(|status| *status == StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn test_public_event_routes_are_rate_limited() {
    let app = TestApp::with_config(test_config_with(&[(
        "security.rate_limit_per_minute",
        "2",
    )]))
    .await;

    for _ in 0..2 {
        let response = accept(&app, Some(&"ef".repeat(32))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    let limited = accept(&app, Some(&"ef".repeat(32))).await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().contains_key(header::RETRY_AFTER));

    // Other routes are not limited.
    let regions = app.send(get_request("/api/v1/regions", None)).await;
    assert_eq!(regions.status(), StatusCode::OK);
}
