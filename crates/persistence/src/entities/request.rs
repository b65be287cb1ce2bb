//! Membership request entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{CivilStatus, MembershipRequest, RequestStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for request_status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "request_status")]
pub enum RequestStatusDb {
    #[sqlx(rename = "0-pending")]
    Pending,
    #[sqlx(rename = "1-accepted")]
    Accepted,
    #[sqlx(rename = "2-assigned")]
    Assigned,
    #[sqlx(rename = "3-approved")]
    Approved,
    #[sqlx(rename = "9-rejected")]
    Rejected,
}

impl From<RequestStatusDb> for RequestStatus {
    fn from(status: RequestStatusDb) -> Self {
        match status {
            RequestStatusDb::Pending => RequestStatus::Pending,
            RequestStatusDb::Accepted => RequestStatus::Accepted,
            RequestStatusDb::Assigned => RequestStatus::Assigned,
            RequestStatusDb::Approved => RequestStatus::Approved,
            RequestStatusDb::Rejected => RequestStatus::Rejected,
        }
    }
}

impl From<RequestStatus> for RequestStatusDb {
    fn from(status: RequestStatus) -> Self {
        match status {
            RequestStatus::Pending => RequestStatusDb::Pending,
            RequestStatus::Accepted => RequestStatusDb::Accepted,
            RequestStatus::Assigned => RequestStatusDb::Assigned,
            RequestStatus::Approved => RequestStatusDb::Approved,
            RequestStatus::Rejected => RequestStatusDb::Rejected,
        }
    }
}

/// Database enum for civil_status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "civil_status", rename_all = "lowercase")]
pub enum CivilStatusDb {
    Single,
    Married,
    Other,
}

impl From<CivilStatusDb> for CivilStatus {
    fn from(status: CivilStatusDb) -> Self {
        match status {
            CivilStatusDb::Single => CivilStatus::Single,
            CivilStatusDb::Married => CivilStatus::Married,
            CivilStatusDb::Other => CivilStatus::Other,
        }
    }
}

impl From<CivilStatus> for CivilStatusDb {
    fn from(status: CivilStatus) -> Self {
        match status {
            CivilStatus::Single => CivilStatusDb::Single,
            CivilStatus::Married => CivilStatusDb::Married,
            CivilStatus::Other => CivilStatusDb::Other,
        }
    }
}

/// Database row mapping for the requests table.
#[derive(Debug, Clone, FromRow)]
pub struct RequestEntity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub motivation: String,
    pub birth_year: String,
    pub civil_status: CivilStatusDb,
    pub region_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub status: RequestStatusDb,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RequestEntity> for MembershipRequest {
    fn from(entity: RequestEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            email: entity.email,
            motivation: entity.motivation,
            birth_year: entity.birth_year,
            civil_status: entity.civil_status.into(),
            region: entity.region_id,
            group: entity.group_id,
            status: entity.status.into(),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
