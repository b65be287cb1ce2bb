//! Approval and guardian entities (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Approval, ConfirmationStamps, Guardian};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the approvals table.
#[derive(Debug, Clone, FromRow)]
pub struct ApprovalEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub leader_approved_at: Option<DateTime<Utc>>,
    pub admin_confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ApprovalEntity> for Approval {
    fn from(entity: ApprovalEntity) -> Self {
        Self {
            id: entity.id,
            user: entity.user_id,
            group: entity.group_id,
            stamps: ConfirmationStamps {
                leader_approved_at: entity.leader_approved_at,
                admin_confirmed_at: entity.admin_confirmed_at,
            },
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Database row mapping for the guardians table.
#[derive(Debug, Clone, FromRow)]
pub struct GuardianEntity {
    pub id: Uuid,
    pub request_id: Uuid,
    pub guardian_id: Option<Uuid>,
    pub group_id: Uuid,
    pub notes: Option<String>,
    pub leader_approved_at: Option<DateTime<Utc>>,
    pub admin_confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GuardianEntity> for Guardian {
    fn from(entity: GuardianEntity) -> Self {
        Self {
            id: entity.id,
            request: entity.request_id,
            guardian: entity.guardian_id,
            group: entity.group_id,
            notes: entity.notes,
            stamps: ConfirmationStamps {
                leader_approved_at: entity.leader_approved_at,
                admin_confirmed_at: entity.admin_confirmed_at,
            },
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
