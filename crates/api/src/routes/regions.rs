//! Region listing for the signup form.

use axum::{extract::State, Json};
use domain::models::group::ListRegionsResponse;

use crate::app::AppState;
use crate::error::ApiError;

/// List all regions.
///
/// GET /api/v1/regions
pub async fn list_regions(
    State(state): State<AppState>,
) -> Result<Json<ListRegionsResponse>, ApiError> {
    let data = state.stores.groups.list_regions().await?;
    Ok(Json(ListRegionsResponse { data }))
}
