//! Membership request pipeline: creation, status updates and listing.

use std::sync::Arc;

use shared::validation::normalize_email;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::request::{
    CreateRequestRequest, ListRequestsQuery, ListRequestsResponse, Pagination,
};
use crate::models::{MembershipRequest, NewMembershipRequest, Principal, RequestStatus};
use crate::services::assignment::GroupAssigner;
use crate::store::{GroupStore, RequestFilter, RequestStore, StoreError};

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Unauthorized")]
    Unauthenticated,

    #[error("Forbidden")]
    Forbidden,

    #[error("Request not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("A request with this email already exists")]
    DuplicateEmail,

    #[error("Store failure")]
    Store(#[source] StoreError),
}

impl From<StoreError> for RequestError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => RequestError::NotFound,
            StoreError::Validation(message) => RequestError::Validation(message),
            other => RequestError::Store(other),
        }
    }
}

pub struct RequestService {
    requests: Arc<dyn RequestStore>,
    groups: Arc<dyn GroupStore>,
    assigner: Arc<GroupAssigner>,
}

impl RequestService {
    pub fn new(
        requests: Arc<dyn RequestStore>,
        groups: Arc<dyn GroupStore>,
        assigner: Arc<GroupAssigner>,
    ) -> Self {
        Self {
            requests,
            groups,
            assigner,
        }
    }

    /// Stores a new application. Status is always pending and no group is set.
    pub async fn create(
        &self,
        input: CreateRequestRequest,
    ) -> Result<MembershipRequest, RequestError> {
        let email = normalize_email(&input.email)
            .ok_or_else(|| RequestError::Validation("Invalid email address".to_string()))?;

        if self.groups.find_region(input.region).await?.is_none() {
            return Err(RequestError::Validation("Unknown region".to_string()));
        }

        let new_request = NewMembershipRequest {
            name: input.name.trim().to_string(),
            email,
            motivation: input.motivation.trim().to_string(),
            birth_year: input.birth_year,
            civil_status: input.civil_status,
            region: input.region,
        };

        let request = match self.requests.insert_request(new_request).await {
            Ok(request) => request,
            Err(StoreError::Conflict(_)) => return Err(RequestError::DuplicateEmail),
            Err(e) => return Err(e.into()),
        };

        info!(request_id = %request.id, region_id = %input.region, "Membership request created");
        Ok(request)
    }

    /// Whether no request uses `email` yet.
    pub async fn check_email(&self, email: &str) -> Result<bool, RequestError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(RequestError::Validation("Missing email".to_string()));
        }
        Ok(!self.requests.request_email_exists(&email).await?)
    }

    /// Applies a status change, running group assignment before saving.
    pub async fn update_status(
        &self,
        principal: Option<&Principal>,
        id: Uuid,
        status: RequestStatus,
    ) -> Result<MembershipRequest, RequestError> {
        let principal = principal.ok_or(RequestError::Unauthenticated)?;
        if !principal.is_admin {
            return Err(RequestError::Forbidden);
        }

        let persisted = self
            .requests
            .find_request(id)
            .await?
            .ok_or(RequestError::NotFound)?;

        let previous = persisted.status;
        let mut incoming = persisted;
        incoming.status = status;

        if previous != status {
            info!(
                request_id = %id,
                old = %previous,
                new = %status,
                changed_by = %principal.id,
                "Request status change"
            );
        }

        self.assigner
            .assign(self.groups.as_ref(), previous, &mut incoming)
            .await;

        Ok(self.requests.update_request(&incoming).await?)
    }

    /// Admins see every request; other users see requests of groups they lead.
    pub async fn list(
        &self,
        principal: Option<&Principal>,
        query: &ListRequestsQuery,
    ) -> Result<ListRequestsResponse, RequestError> {
        let principal = principal.ok_or(RequestError::Unauthenticated)?;
        let filter = RequestFilter {
            status: query.status,
            led_by: (!principal.is_admin).then_some(principal.id),
        };
        let (limit, offset) = query.limit_offset();

        let (data, total) = self.requests.list_requests(&filter, limit, offset).await?;

        Ok(ListRequestsResponse {
            data,
            pagination: Pagination {
                page: query.page.max(1),
                per_page: limit,
                total,
            },
        })
    }

    /// Reads one request. Visible to admins and to the leader of its group.
    pub async fn get(
        &self,
        principal: Option<&Principal>,
        id: Uuid,
    ) -> Result<MembershipRequest, RequestError> {
        let principal = principal.ok_or(RequestError::Unauthenticated)?;
        let request = self
            .requests
            .find_request(id)
            .await?
            .ok_or(RequestError::NotFound)?;

        if principal.is_admin {
            return Ok(request);
        }

        let leads = match request.group {
            Some(group_id) => self
                .groups
                .find_group(group_id)
                .await?
                .is_some_and(|group| group.is_led_by(principal.id)),
            None => false,
        };

        if leads {
            Ok(request)
        } else {
            Err(RequestError::Forbidden)
        }
    }
}
