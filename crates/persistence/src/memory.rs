//! In-memory implementation of every store trait.
//!
//! Mirrors the unique indexes and check constraints of the SQL schema so the
//! services behave the same against it as against PostgreSQL.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use domain::models::{
    Approval, Event, EventRegistration, Group, Guardian, MembershipRequest, NewEventRegistration,
    NewMembershipRequest, Region, RequestStatus, Template, User,
};
use domain::store::{
    ApprovalStore, EventStore, GroupStore, GuardianStore, RequestFilter, RequestStore,
    StoreError, StoreHealth, TemplateStore, UserStore,
};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    regions: HashMap<Uuid, Region>,
    groups: HashMap<Uuid, Group>,
    requests: HashMap<Uuid, MembershipRequest>,
    approvals: HashMap<Uuid, Approval>,
    guardians: HashMap<Uuid, Guardian>,
    events: HashMap<Uuid, Event>,
    registrations: HashMap<Uuid, EventRegistration>,
    templates: HashMap<Uuid, Template>,
}

/// Store that keeps all records in process memory.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: User) {
        self.state.write().await.users.insert(user.id, user);
    }

    pub async fn add_region(&self, region: Region) {
        self.state.write().await.regions.insert(region.id, region);
    }

    pub async fn add_group(&self, group: Group) {
        self.state.write().await.groups.insert(group.id, group);
    }

    pub async fn add_event(&self, event: Event) {
        self.state.write().await.events.insert(event.id, event);
    }

    pub async fn add_template(&self, template: Template) {
        self.state
            .write()
            .await
            .templates
            .insert(template.id, template);
    }

    /// Snapshot of a registration, for assertions.
    pub async fn registration_for(&self, event: Uuid, email: &str) -> Option<EventRegistration> {
        self.state
            .read()
            .await
            .registrations
            .values()
            .find(|r| r.event == event && r.email == email)
            .cloned()
    }
}

fn check_request(request: &MembershipRequest) -> Result<(), StoreError> {
    if request.status == RequestStatus::Pending && request.group.is_some() {
        return Err(StoreError::Validation(
            "requests_pending_without_group".to_string(),
        ));
    }
    Ok(())
}

fn check_stamps(
    leader: Option<chrono::DateTime<Utc>>,
    admin: Option<chrono::DateTime<Utc>>,
    constraint: &str,
) -> Result<(), StoreError> {
    if admin.is_some() && leader.is_none() {
        return Err(StoreError::Validation(constraint.to_string()));
    }
    Ok(())
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn find_request(&self, id: Uuid) -> Result<Option<MembershipRequest>, StoreError> {
        Ok(self.state.read().await.requests.get(&id).cloned())
    }

    async fn insert_request(
        &self,
        request: NewMembershipRequest,
    ) -> Result<MembershipRequest, StoreError> {
        let mut state = self.state.write().await;
        if !state.regions.contains_key(&request.region) {
            return Err(StoreError::Validation("requests_region_id_fkey".to_string()));
        }
        if state.requests.values().any(|r| r.email == request.email) {
            return Err(StoreError::Conflict("idx_requests_email".to_string()));
        }

        let now = Utc::now();
        let record = MembershipRequest {
            id: Uuid::new_v4(),
            name: request.name,
            email: request.email,
            motivation: request.motivation,
            birth_year: request.birth_year,
            civil_status: request.civil_status,
            region: Some(request.region),
            group: None,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        state.requests.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_request(
        &self,
        request: &MembershipRequest,
    ) -> Result<MembershipRequest, StoreError> {
        check_request(request)?;
        let mut state = self.state.write().await;
        if let Some(group) = request.group {
            if !state.groups.contains_key(&group) {
                return Err(StoreError::Validation("requests_group_id_fkey".to_string()));
            }
        }
        let stored = state
            .requests
            .get_mut(&request.id)
            .ok_or(StoreError::NotFound)?;
        stored.status = request.status;
        stored.group = request.group;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<MembershipRequest>, i64), StoreError> {
        let state = self.state.read().await;
        let mut matching: Vec<MembershipRequest> = state
            .requests
            .values()
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .filter(|r| match filter.led_by {
                None => true,
                Some(leader) => r
                    .group
                    .and_then(|g| state.groups.get(&g))
                    .map_or(false, |g| g.is_led_by(leader)),
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn request_email_exists(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .requests
            .values()
            .any(|r| r.email == email))
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn find_group(&self, id: Uuid) -> Result<Option<Group>, StoreError> {
        Ok(self.state.read().await.groups.get(&id).cloned())
    }

    async fn find_open_groups_for_region(&self, region: Uuid) -> Result<Vec<Group>, StoreError> {
        let state = self.state.read().await;
        let mut groups: Vec<Group> = state
            .groups
            .values()
            .filter(|g| g.accepts_region(region))
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.id);
        Ok(groups)
    }

    async fn find_region(&self, id: Uuid) -> Result<Option<Region>, StoreError> {
        Ok(self.state.read().await.regions.get(&id).cloned())
    }

    async fn list_regions(&self) -> Result<Vec<Region>, StoreError> {
        let mut regions: Vec<Region> = self.state.read().await.regions.values().cloned().collect();
        regions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(regions)
    }
}

#[async_trait]
impl ApprovalStore for MemoryStore {
    async fn find_approval_by_user(&self, user: Uuid) -> Result<Option<Approval>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .approvals
            .values()
            .find(|a| a.user == user)
            .cloned())
    }

    async fn insert_approval(&self, approval: &Approval) -> Result<Approval, StoreError> {
        check_stamps(
            approval.stamps.leader_approved_at,
            approval.stamps.admin_confirmed_at,
            "approvals_admin_after_leader",
        )?;
        let mut state = self.state.write().await;
        if state.approvals.values().any(|a| a.user == approval.user) {
            return Err(StoreError::Conflict("idx_approvals_user".to_string()));
        }
        let mut record = approval.clone();
        let now = Utc::now();
        record.created_at = now;
        record.updated_at = now;
        state.approvals.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_approval(&self, approval: &Approval) -> Result<Approval, StoreError> {
        let mut state = self.state.write().await;
        let stored = state
            .approvals
            .get_mut(&approval.id)
            .ok_or(StoreError::NotFound)?;
        let leader = stored
            .stamps
            .leader_approved_at
            .or(approval.stamps.leader_approved_at);
        let admin = stored
            .stamps
            .admin_confirmed_at
            .or(approval.stamps.admin_confirmed_at);
        check_stamps(leader, admin, "approvals_admin_after_leader")?;
        stored.stamps.leader_approved_at = leader;
        stored.stamps.admin_confirmed_at = admin;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }
}

#[async_trait]
impl GuardianStore for MemoryStore {
    async fn find_guardian_by_request(
        &self,
        request: Uuid,
    ) -> Result<Option<Guardian>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .guardians
            .values()
            .find(|g| g.request == request)
            .cloned())
    }

    async fn insert_guardian(&self, guardian: &Guardian) -> Result<Guardian, StoreError> {
        check_stamps(
            guardian.stamps.leader_approved_at,
            guardian.stamps.admin_confirmed_at,
            "guardians_admin_after_leader",
        )?;
        let mut state = self.state.write().await;
        if state.guardians.values().any(|g| g.request == guardian.request) {
            return Err(StoreError::Conflict("idx_guardians_request".to_string()));
        }
        let mut record = guardian.clone();
        let now = Utc::now();
        record.created_at = now;
        record.updated_at = now;
        state.guardians.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_guardian(&self, guardian: &Guardian) -> Result<Guardian, StoreError> {
        let mut state = self.state.write().await;
        let stored = state
            .guardians
            .get_mut(&guardian.id)
            .ok_or(StoreError::NotFound)?;
        let leader = stored
            .stamps
            .leader_approved_at
            .or(guardian.stamps.leader_approved_at);
        let admin = stored
            .stamps
            .admin_confirmed_at
            .or(guardian.stamps.admin_confirmed_at);
        check_stamps(leader, admin, "guardians_admin_after_leader")?;
        stored.stamps.leader_approved_at = leader;
        stored.stamps.admin_confirmed_at = admin;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn find_event_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .events
            .values()
            .find(|e| e.slug == slug)
            .cloned())
    }

    async fn find_registration(
        &self,
        event: Uuid,
        email: &str,
    ) -> Result<Option<EventRegistration>, StoreError> {
        Ok(self.registration_for(event, email).await)
    }

    async fn find_registration_by_token(
        &self,
        token: &str,
    ) -> Result<Option<EventRegistration>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .registrations
            .values()
            .find(|r| r.accept_token == token)
            .cloned())
    }

    async fn accept_token_exists(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.find_registration_by_token(token).await?.is_some())
    }

    async fn insert_registration(
        &self,
        registration: NewEventRegistration,
    ) -> Result<EventRegistration, StoreError> {
        let mut state = self.state.write().await;
        if !state.events.contains_key(&registration.event) {
            return Err(StoreError::Validation(
                "event_registrations_event_id_fkey".to_string(),
            ));
        }
        if state
            .registrations
            .values()
            .any(|r| r.event == registration.event && r.email == registration.email)
        {
            return Err(StoreError::Conflict(
                "idx_event_registrations_event_email".to_string(),
            ));
        }
        if state
            .registrations
            .values()
            .any(|r| r.accept_token == registration.accept_token)
        {
            return Err(StoreError::Conflict(
                "idx_event_registrations_token".to_string(),
            ));
        }

        let record = EventRegistration {
            id: Uuid::new_v4(),
            event: registration.event,
            email: registration.email,
            data: registration.data,
            accept_token: registration.accept_token,
            accept_expires_at: Some(registration.accept_expires_at),
            accepted: false,
            created_at: Utc::now(),
        };
        state.registrations.insert(record.id, record.clone());
        Ok(record)
    }

    async fn mark_registration_accepted(&self, id: Uuid) -> Result<EventRegistration, StoreError> {
        let mut state = self.state.write().await;
        let stored = state
            .registrations
            .get_mut(&id)
            .ok_or(StoreError::NotFound)?;
        stored.accepted = true;
        Ok(stored.clone())
    }
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn find_template(&self, id: Uuid) -> Result<Option<Template>, StoreError> {
        Ok(self.state.read().await.templates.get(&id).cloned())
    }

    async fn find_template_by_slug(&self, slug: &str) -> Result<Option<Template>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .templates
            .values()
            .find(|t| t.slug.as_deref() == Some(slug))
            .cloned())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn list_admin_emails(&self) -> Result<Vec<String>, StoreError> {
        let mut emails: Vec<String> = self
            .state
            .read()
            .await
            .users
            .values()
            .filter(|u| u.admin)
            .map(|u| u.email.clone())
            .collect();
        emails.sort();
        Ok(emails)
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
