//! Two-phase confirmation records for members and guardians.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Confirmation stage derived from the two timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStage {
    Unconfirmed,
    LeaderApproved,
    AdminConfirmed,
}

impl std::fmt::Display for ConfirmationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfirmationStage::Unconfirmed => write!(f, "unconfirmed"),
            ConfirmationStage::LeaderApproved => write!(f, "leader_approved"),
            ConfirmationStage::AdminConfirmed => write!(f, "admin_confirmed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfirmationError {
    #[error("Leader approval required")]
    LeaderApprovalRequired,
}

/// Leader and admin timestamps. Once set, a timestamp is never cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationStamps {
    pub leader_approved_at: Option<DateTime<Utc>>,
    pub admin_confirmed_at: Option<DateTime<Utc>>,
}

impl ConfirmationStamps {
    pub fn stage(&self) -> ConfirmationStage {
        match (self.leader_approved_at, self.admin_confirmed_at) {
            (_, Some(_)) => ConfirmationStage::AdminConfirmed,
            (Some(_), None) => ConfirmationStage::LeaderApproved,
            (None, None) => ConfirmationStage::Unconfirmed,
        }
    }

    /// Records leader approval. Returns `true` when the stamp changed.
    pub fn approve_by_leader(&mut self, now: DateTime<Utc>) -> bool {
        if self.leader_approved_at.is_some() {
            return false;
        }
        self.leader_approved_at = Some(now);
        true
    }

    /// Records admin confirmation. Returns `true` when the stamp changed.
    pub fn confirm_by_admin(&mut self, now: DateTime<Utc>) -> Result<bool, ConfirmationError> {
        if self.leader_approved_at.is_none() {
            return Err(ConfirmationError::LeaderApprovalRequired);
        }
        if self.admin_confirmed_at.is_some() {
            return Ok(false);
        }
        self.admin_confirmed_at = Some(now);
        Ok(true)
    }
}

/// A record driven through leader approval and admin confirmation.
pub trait Confirmable: Clone + Send + Sync {
    fn group(&self) -> Uuid;
    fn stamps(&self) -> &ConfirmationStamps;
    fn stamps_mut(&mut self) -> &mut ConfirmationStamps;
}

/// Membership approval for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Approval {
    pub id: Uuid,
    pub user: Uuid,
    pub group: Uuid,
    #[serde(flatten)]
    pub stamps: ConfirmationStamps,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Approval {
    pub fn new(user: Uuid, group: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user,
            group,
            stamps: ConfirmationStamps::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Confirmable for Approval {
    fn group(&self) -> Uuid {
        self.group
    }

    fn stamps(&self) -> &ConfirmationStamps {
        &self.stamps
    }

    fn stamps_mut(&mut self) -> &mut ConfirmationStamps {
        &mut self.stamps
    }
}

/// Confirmation of a guardian attached to a membership request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Guardian {
    pub id: Uuid,
    pub request: Uuid,
    pub guardian: Option<Uuid>,
    pub group: Uuid,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub stamps: ConfirmationStamps,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Guardian {
    pub fn new(request: Uuid, group: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            request,
            guardian: None,
            group,
            notes: None,
            stamps: ConfirmationStamps::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Confirmable for Guardian {
    fn group(&self) -> Uuid {
        self.group
    }

    fn stamps(&self) -> &ConfirmationStamps {
        &self.stamps
    }

    fn stamps_mut(&mut self) -> &mut ConfirmationStamps {
        &mut self.stamps
    }
}

/// A record together with its derived stage.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmationView<T: Serialize> {
    #[serde(flatten)]
    pub record: T,
    pub stage: ConfirmationStage,
}

impl<T: Serialize + Confirmable> From<T> for ConfirmationView<T> {
    fn from(record: T) -> Self {
        let stage = record.stamps().stage();
        Self { record, stage }
    }
}

/// Request body for leader approval of a member.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberLeaderApproveRequest {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

/// Request body for admin confirmation of a member.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberAdminApproveRequest {
    #[serde(default)]
    pub user: Option<String>,
}

/// Request body for leader approval of a guardian.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuardianLeaderApproveRequest {
    #[serde(default)]
    pub request: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

/// Request body for admin confirmation of a guardian.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuardianAdminConfirmRequest {
    #[serde(default)]
    pub request: Option<String>,
}
