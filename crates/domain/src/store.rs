//! Record repository interfaces.
//!
//! The services in this crate only talk to storage through these traits.
//! Implementations live in the `persistence` crate.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Approval, Event, EventRegistration, Group, Guardian, MembershipRequest, NewEventRegistration,
    NewMembershipRequest, Region, RequestStatus, Template, User,
};

/// Errors surfaced by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Constraint violated: {0}")]
    Validation(String),

    #[error("Storage failure: {0}")]
    Io(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(
                    db_err
                        .constraint()
                        .unwrap_or("unique constraint")
                        .to_string(),
                ),
                Some("23503") | Some("23514") => StoreError::Validation(db_err.message().to_string()),
                _ => StoreError::Io(err.to_string()),
            },
            _ => StoreError::Io(err.to_string()),
        }
    }
}

/// Filter for listing membership requests.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    /// Only requests assigned to groups led by this user.
    pub led_by: Option<Uuid>,
}

#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn find_request(&self, id: Uuid) -> Result<Option<MembershipRequest>, StoreError>;

    async fn insert_request(
        &self,
        request: NewMembershipRequest,
    ) -> Result<MembershipRequest, StoreError>;

    /// Persists `status` and `group` of an existing request.
    async fn update_request(
        &self,
        request: &MembershipRequest,
    ) -> Result<MembershipRequest, StoreError>;

    /// Returns one page of matching requests, newest first, and the total count.
    async fn list_requests(
        &self,
        filter: &RequestFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<MembershipRequest>, i64), StoreError>;

    async fn request_email_exists(&self, email: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn find_group(&self, id: Uuid) -> Result<Option<Group>, StoreError>;

    /// Open groups whose region set contains `region`.
    async fn find_open_groups_for_region(&self, region: Uuid) -> Result<Vec<Group>, StoreError>;

    async fn find_region(&self, id: Uuid) -> Result<Option<Region>, StoreError>;

    async fn list_regions(&self) -> Result<Vec<Region>, StoreError>;
}

#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn find_approval_by_user(&self, user: Uuid) -> Result<Option<Approval>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the user already has a record.
    async fn insert_approval(&self, approval: &Approval) -> Result<Approval, StoreError>;

    async fn update_approval(&self, approval: &Approval) -> Result<Approval, StoreError>;
}

#[async_trait]
pub trait GuardianStore: Send + Sync {
    async fn find_guardian_by_request(&self, request: Uuid)
        -> Result<Option<Guardian>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the request already has a record.
    async fn insert_guardian(&self, guardian: &Guardian) -> Result<Guardian, StoreError>;

    async fn update_guardian(&self, guardian: &Guardian) -> Result<Guardian, StoreError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn find_event_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError>;

    async fn find_registration(
        &self,
        event: Uuid,
        email: &str,
    ) -> Result<Option<EventRegistration>, StoreError>;

    async fn find_registration_by_token(
        &self,
        token: &str,
    ) -> Result<Option<EventRegistration>, StoreError>;

    async fn accept_token_exists(&self, token: &str) -> Result<bool, StoreError>;

    /// Fails with [`StoreError::Conflict`] on a duplicate (event, email) or token.
    async fn insert_registration(
        &self,
        registration: NewEventRegistration,
    ) -> Result<EventRegistration, StoreError>;

    async fn mark_registration_accepted(&self, id: Uuid) -> Result<EventRegistration, StoreError>;
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn find_template(&self, id: Uuid) -> Result<Option<Template>, StoreError>;

    async fn find_template_by_slug(&self, slug: &str) -> Result<Option<Template>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn list_admin_emails(&self) -> Result<Vec<String>, StoreError>;
}

/// Liveness check for the backing store.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;
}

/// The full set of store handles the application runs on.
#[derive(Clone)]
pub struct Stores {
    pub requests: Arc<dyn RequestStore>,
    pub groups: Arc<dyn GroupStore>,
    pub approvals: Arc<dyn ApprovalStore>,
    pub guardians: Arc<dyn GuardianStore>,
    pub events: Arc<dyn EventStore>,
    pub templates: Arc<dyn TemplateStore>,
    pub users: Arc<dyn UserStore>,
    pub health: Arc<dyn StoreHealth>,
}

impl Stores {
    /// Uses one value for every store role.
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: RequestStore
            + GroupStore
            + ApprovalStore
            + GuardianStore
            + EventStore
            + TemplateStore
            + UserStore
            + StoreHealth
            + 'static,
    {
        Self {
            requests: store.clone(),
            groups: store.clone(),
            approvals: store.clone(),
            guardians: store.clone(),
            events: store.clone(),
            templates: store.clone(),
            users: store.clone(),
            health: store,
        }
    }
}
