//! Integration tests for guardian confirmations.

mod common;

use axum::http::{Method, StatusCode};
use axum::response::Response;
use common::{get_request, json_request, parse_response_body, TestApp};
use serde_json::json;
use uuid::Uuid;

async fn leader_approve(app: &TestApp, token: Option<&str>, body: serde_json::Value) -> Response {
    app.send(json_request(
        Method::POST,
        "/api/v1/guardians/leader-approve",
        body,
        token,
    ))
    .await
}

async fn admin_confirm(app: &TestApp, token: Option<&str>, request: &str) -> Response {
    app.send(json_request(
        Method::POST,
        "/api/v1/guardians/admin-confirm",
        json!({ "request": request }),
        token,
    ))
    .await
}

#[tokio::test]
async fn test_leader_approve_uses_group_of_request() {
    let app = TestApp::new().await;
    let assigned = app.create_assigned_request().await;

    let response = leader_approve(
        &app,
        Some(&app.leader_token()),
        json!({ "request": assigned["id"] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["request"], assigned["id"]);
    assert_eq!(body["group"], json!(app.group.id));
    assert!(body["leader_approved_at"].is_string());
    assert!(body["admin_confirmed_at"].is_null());
}

#[tokio::test]
async fn test_leader_approve_falls_back_to_supplied_group() {
    let app = TestApp::new().await;
    let pending = app.create_membership_request().await;

    let without_group = leader_approve(
        &app,
        Some(&app.leader_token()),
        json!({ "request": pending["id"] }),
    )
    .await;
    assert_eq!(without_group.status(), StatusCode::NOT_FOUND);

    let with_group = leader_approve(
        &app,
        Some(&app.leader_token()),
        json!({ "request": pending["id"], "group": app.group.id }),
    )
    .await;
    assert_eq!(with_group.status(), StatusCode::OK);
    let body = parse_response_body(with_group).await;
    assert_eq!(body["group"], json!(app.group.id));
}

#[tokio::test]
async fn test_leader_approve_rejects_other_group() {
    let app = TestApp::new().await;
    let assigned = app.create_assigned_request().await;
    let other = app.add_group(true, vec![app.region.id]).await;

    let response = leader_approve(
        &app,
        Some(&app.leader_token()),
        json!({ "request": assigned["id"], "group": other.id }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_leader_approve_authorization() {
    let app = TestApp::new().await;
    let assigned = app.create_assigned_request().await;
    let body = json!({ "request": assigned["id"] });

    let anonymous = leader_approve(&app, None, body.clone()).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let member = leader_approve(&app, Some(&app.member_token()), body).await;
    assert_eq!(member.status(), StatusCode::FORBIDDEN);

    let unknown = leader_approve(
        &app,
        Some(&app.leader_token()),
        json!({ "request": Uuid::new_v4() }),
    )
    .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_confirm_flow() {
    let app = TestApp::new().await;
    let assigned = app.create_assigned_request().await;
    let request_id = assigned["id"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/guardians/{}", request_id);

    let before = admin_confirm(&app, Some(&app.admin_token()), &request_id).await;
    assert_eq!(before.status(), StatusCode::NOT_FOUND);

    leader_approve(
        &app,
        Some(&app.leader_token()),
        json!({ "request": request_id }),
    )
    .await;
    let response = app.send(get_request(&uri, Some(&app.leader_token()))).await;
    assert_eq!(parse_response_body(response).await["stage"], "leader_approved");

    let by_leader = admin_confirm(&app, Some(&app.leader_token()), &request_id).await;
    assert_eq!(by_leader.status(), StatusCode::FORBIDDEN);

    let confirmed = admin_confirm(&app, Some(&app.admin_token()), &request_id).await;
    assert_eq!(confirmed.status(), StatusCode::OK);
    let body = parse_response_body(confirmed).await;
    assert!(body["admin_confirmed_at"].is_string());
    assert!(body["leader_approved_at"].is_string());

    let response = app.send(get_request(&uri, Some(&app.admin_token()))).await;
    assert_eq!(parse_response_body(response).await["stage"], "admin_confirmed");
}

#[tokio::test]
async fn test_admin_confirm_missing_request_field() {
    let app = TestApp::new().await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/guardians/admin-confirm",
            json!({}),
            Some(&app.admin_token()),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["message"], "Missing request");
}
