//! Two-phase member approval routes.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::approval::{MemberAdminApproveRequest, MemberLeaderApproveRequest};
use domain::models::{Approval, ConfirmationView};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{JsonBody, OptionalUserAuth};

/// Leader approval of a member. Creates the record when absent.
///
/// POST /api/v1/approvals/leader-approve
pub async fn leader_approve(
    State(state): State<AppState>,
    auth: OptionalUserAuth,
    body: Result<JsonBody<MemberLeaderApproveRequest>, ApiError>,
) -> Result<Json<Approval>, ApiError> {
    let principal = auth.require()?;
    let JsonBody(request) = body?;

    let approval = state
        .member_approvals
        .leader_approve(
            Some(principal),
            request.user.as_deref(),
            request.group.as_deref(),
        )
        .await?;
    Ok(Json(approval))
}

/// Admin confirmation of a leader-approved member.
///
/// POST /api/v1/approvals/admin-approve
pub async fn admin_approve(
    State(state): State<AppState>,
    auth: OptionalUserAuth,
    body: Result<JsonBody<MemberAdminApproveRequest>, ApiError>,
) -> Result<Json<Approval>, ApiError> {
    let principal = auth.require()?;
    let JsonBody(request) = body?;

    let approval = state
        .member_approvals
        .admin_confirm(Some(principal), request.user.as_deref())
        .await?;
    Ok(Json(approval))
}

/// GET /api/v1/approvals/:user
pub async fn get_approval(
    State(state): State<AppState>,
    auth: OptionalUserAuth,
    Path(user): Path<String>,
) -> Result<Json<ConfirmationView<Approval>>, ApiError> {
    let approval = state.member_approvals.get(auth.principal(), &user).await?;
    Ok(Json(approval.into()))
}
