//! Two-phase guardian confirmation routes.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::approval::{GuardianAdminConfirmRequest, GuardianLeaderApproveRequest};
use domain::models::{ConfirmationView, Guardian};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{JsonBody, OptionalUserAuth};

/// POST /api/v1/guardians/leader-approve
///
/// `group` may be omitted; the group of the request is used instead.
pub async fn leader_approve(
    State(state): State<AppState>,
    auth: OptionalUserAuth,
    body: Result<JsonBody<GuardianLeaderApproveRequest>, ApiError>,
) -> Result<Json<Guardian>, ApiError> {
    let principal = auth.require()?;
    let JsonBody(request) = body?;

    let guardian = state
        .guardian_approvals
        .leader_approve(
            Some(principal),
            request.request.as_deref(),
            request.group.as_deref(),
        )
        .await?;
    Ok(Json(guardian))
}

/// POST /api/v1/guardians/admin-confirm
pub async fn admin_confirm(
    State(state): State<AppState>,
    auth: OptionalUserAuth,
    body: Result<JsonBody<GuardianAdminConfirmRequest>, ApiError>,
) -> Result<Json<Guardian>, ApiError> {
    let principal = auth.require()?;
    let JsonBody(request) = body?;

    let guardian = state
        .guardian_approvals
        .admin_confirm(Some(principal), request.request.as_deref())
        .await?;
    Ok(Json(guardian))
}

/// GET /api/v1/guardians/:request
pub async fn get_guardian(
    State(state): State<AppState>,
    auth: OptionalUserAuth,
    Path(request): Path<String>,
) -> Result<Json<ConfirmationView<Guardian>>, ApiError> {
    let guardian = state
        .guardian_approvals
        .get(auth.principal(), &request)
        .await?;
    Ok(Json(guardian.into()))
}
