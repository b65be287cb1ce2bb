//! Membership request routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::request::{
    CheckEmailRequest, CheckEmailResponse, CreateRequestRequest, ListRequestsQuery,
    ListRequestsResponse, MembershipRequest, UpdateRequestStatusRequest,
};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{JsonBody, OptionalUserAuth};

/// Submit a membership application.
///
/// POST /api/v1/requests
pub async fn create_request(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateRequestRequest>,
) -> Result<(StatusCode, Json<MembershipRequest>), ApiError> {
    request.validate()?;

    let created = state.requests.create(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Whether an email address is still free for signup.
///
/// POST /api/v1/requests/check-email
pub async fn check_email(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CheckEmailRequest>,
) -> Result<Json<CheckEmailResponse>, ApiError> {
    let unique = state.requests.check_email(&request.email).await?;
    Ok(Json(CheckEmailResponse { unique }))
}

/// List requests visible to the caller.
///
/// GET /api/v1/requests?status=&page=&per_page=
pub async fn list_requests(
    State(state): State<AppState>,
    auth: OptionalUserAuth,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<ListRequestsResponse>, ApiError> {
    let response = state.requests.list(auth.principal(), &query).await?;
    Ok(Json(response))
}

/// GET /api/v1/requests/:id
pub async fn get_request(
    State(state): State<AppState>,
    auth: OptionalUserAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<MembershipRequest>, ApiError> {
    let request = state.requests.get(auth.principal(), id).await?;
    Ok(Json(request))
}

/// Change a request's status. Moving into a new status may assign a group.
///
/// PATCH /api/v1/requests/:id/status
pub async fn update_request_status(
    State(state): State<AppState>,
    auth: OptionalUserAuth,
    Path(id): Path<Uuid>,
    body: Result<JsonBody<UpdateRequestStatusRequest>, ApiError>,
) -> Result<Json<MembershipRequest>, ApiError> {
    let principal = auth.require()?;
    let JsonBody(request) = body?;

    let updated = state
        .requests
        .update_status(Some(principal), id, request.status)
        .await?;
    Ok(Json(updated))
}
