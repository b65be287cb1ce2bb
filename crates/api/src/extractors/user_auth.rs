//! Optional user JWT authentication extractor.
//!
//! Validates the Bearer token in the Authorization header and resolves the
//! subject to a known user account.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use domain::models::Principal;
use shared::jwt::extract_user_id;

use crate::app::AppState;
use crate::error::ApiError;

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth_header = parts
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header format".to_string()))
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<Principal, ApiError> {
    let token = bearer_token(parts)?;

    let claims = state
        .jwt
        .validate_token(token)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;
    let user_id = extract_user_id(&claims)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

    let user = state
        .stores
        .users
        .find_user(user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))?;

    Ok(Principal::from(&user))
}

/// Optional user JWT authentication.
///
/// Missing or invalid credentials yield `None`; the operation decides whether
/// an anonymous caller is acceptable.
#[derive(Debug, Clone)]
pub struct OptionalUserAuth(pub Option<Principal>);

impl OptionalUserAuth {
    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref()
    }

    /// The caller, or 401. Lets handlers reject anonymous callers before
    /// looking at the request body.
    pub fn require(&self) -> Result<&Principal, ApiError> {
        self.0
            .as_ref()
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for OptionalUserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match authenticate(parts, state).await {
            Ok(principal) => Ok(OptionalUserAuth(Some(principal))),
            Err(ApiError::Unauthorized(reason)) => {
                tracing::debug!(reason = %reason, "Proceeding without authenticated user");
                Ok(OptionalUserAuth(None))
            }
            Err(other) => Err(other),
        }
    }
}
