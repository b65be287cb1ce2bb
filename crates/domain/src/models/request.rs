//! Membership request domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Review status of a membership request.
///
/// Serialized as ordered tags so that lexical ordering matches the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    #[serde(rename = "0-pending")]
    Pending,
    #[serde(rename = "1-accepted")]
    Accepted,
    #[serde(rename = "2-assigned")]
    Assigned,
    #[serde(rename = "3-approved")]
    Approved,
    #[serde(rename = "9-rejected")]
    Rejected,
}

impl RequestStatus {
    /// The persisted tag for this status.
    pub fn as_tag(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "0-pending",
            RequestStatus::Accepted => "1-accepted",
            RequestStatus::Assigned => "2-assigned",
            RequestStatus::Approved => "3-approved",
            RequestStatus::Rejected => "9-rejected",
        }
    }

    /// Parses a persisted tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "0-pending" => Some(RequestStatus::Pending),
            "1-accepted" => Some(RequestStatus::Accepted),
            "2-assigned" => Some(RequestStatus::Assigned),
            "3-approved" => Some(RequestStatus::Approved),
            "9-rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Applicant's civil status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CivilStatus {
    Single,
    Married,
    Other,
}

impl CivilStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CivilStatus::Single => "single",
            CivilStatus::Married => "married",
            CivilStatus::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "single" => Some(CivilStatus::Single),
            "married" => Some(CivilStatus::Married),
            "other" => Some(CivilStatus::Other),
            _ => None,
        }
    }
}

/// A membership application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MembershipRequest {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub motivation: String,
    pub birth_year: String,
    pub civil_status: CivilStatus,
    pub region: Option<Uuid>,
    pub group: Option<Uuid>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a request about to be inserted.
#[derive(Debug, Clone)]
pub struct NewMembershipRequest {
    pub name: String,
    pub email: String,
    pub motivation: String,
    pub birth_year: String,
    pub civil_status: CivilStatus,
    pub region: Uuid,
}

/// Request body for submitting a membership application.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateRequestRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 1, max = 2000, message = "Motivation must be 1-2000 characters"))]
    pub motivation: String,

    #[validate(custom(function = "shared::validation::validate_birth_year"))]
    pub birth_year: String,

    pub civil_status: CivilStatus,

    pub region: Uuid,
}

/// Request body for changing a request's status.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRequestStatusRequest {
    pub status: RequestStatus,
}

/// Request body for the signup email check.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckEmailRequest {
    pub email: String,
}

/// Response for the signup email check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckEmailResponse {
    pub unique: bool,
}

/// Query parameters for listing requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ListRequestsQuery {
    #[serde(default)]
    pub status: Option<RequestStatus>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    50
}

impl ListRequestsQuery {
    /// Clamped `(limit, offset)` for the store.
    pub fn limit_offset(&self) -> (i64, i64) {
        let per_page = self.per_page.clamp(1, 100);
        let page = self.page.max(1);
        (per_page, (page - 1) * per_page)
    }
}

/// Pagination info for list responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

/// Response for listing requests.
#[derive(Debug, Clone, Serialize)]
pub struct ListRequestsResponse {
    pub data: Vec<MembershipRequest>,
    pub pagination: Pagination,
}
