//! Public event registration routes.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::event::{AcceptQuery, AcceptResponse, RegisterRequest, RegisterResponse};
use domain::services::RegistrationError;

use crate::app::AppState;
use crate::error::ApiError;

/// Register an email address for an event.
///
/// POST /api/v1/events/:slug/register
///
/// An unreadable body is reported like any other failed registration.
pub async fn register(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Json(request) =
        body.map_err(|rejection| RegistrationError::Generic(rejection.body_text()))?;
    let response = state.registration.register(&slug, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Accept a registration through the emailed token.
///
/// GET /api/v1/events/accept?token=
pub async fn accept(
    State(state): State<AppState>,
    Query(query): Query<AcceptQuery>,
) -> Result<Json<AcceptResponse>, ApiError> {
    let status = state
        .registration
        .accept_by_token(query.token.as_deref())
        .await?;
    Ok(Json(AcceptResponse { status }))
}
