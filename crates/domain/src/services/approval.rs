//! Two-phase (leader, then admin) confirmation protocol.
//!
//! [`ApprovalMachine`] holds the protocol; an [`ApprovalBinding`] supplies the
//! record type, storage and authorization rules for one kind of subject.
//! Two bindings exist: [`MemberApprovals`] (subject = user) and
//! [`GuardianApprovals`] (subject = membership request of a guardian).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{Approval, Confirmable, ConfirmationError, Guardian, Principal};
use crate::store::{ApprovalStore, GroupStore, GuardianStore, RequestStore, StoreError, UserStore};

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("Unauthorized")]
    Unauthenticated,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// Saving the record failed.
    #[error("Failed to save approval")]
    Persistence(#[source] StoreError),

    /// Reading a record failed.
    #[error("Store lookup failed")]
    Store(#[source] StoreError),
}

impl From<ConfirmationError> for ApprovalError {
    fn from(err: ConfirmationError) -> Self {
        ApprovalError::BadRequest(err.to_string())
    }
}

/// Storage and authorization rules for one kind of confirmation record.
#[async_trait]
pub trait ApprovalBinding: Send + Sync {
    type Record: Confirmable + 'static;

    /// Label for logs and metrics.
    const KIND: &'static str;
    /// Name of the subject field in request payloads.
    const SUBJECT_FIELD: &'static str;
    const NOT_FOUND_MESSAGE: &'static str;

    async fn load_by_subject(&self, subject: Uuid) -> Result<Option<Self::Record>, StoreError>;

    /// Checks that `principal` may leader-approve `subject` and returns the
    /// group the record belongs to.
    async fn authorize_leader(
        &self,
        principal: &Principal,
        subject: Uuid,
        group: Option<Uuid>,
        existing: Option<&Self::Record>,
    ) -> Result<Uuid, ApprovalError>;

    fn authorize_admin(&self, principal: &Principal) -> Result<(), ApprovalError> {
        if principal.is_admin {
            Ok(())
        } else {
            Err(ApprovalError::Forbidden)
        }
    }

    async fn leads_group(&self, principal: &Principal, group: Uuid) -> Result<bool, StoreError>;

    fn new_record(&self, subject: Uuid, group: Uuid) -> Self::Record;

    async fn insert(&self, record: &Self::Record) -> Result<Self::Record, StoreError>;

    async fn update(&self, record: &Self::Record) -> Result<Self::Record, StoreError>;
}

fn parse_reference(raw: Option<&str>, field: &str) -> Result<Uuid, ApprovalError> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(ApprovalError::BadRequest(format!("Missing {}", field)));
    }
    Uuid::parse_str(raw).map_err(|_| ApprovalError::BadRequest(format!("Invalid {}", field)))
}

fn parse_optional_reference(raw: Option<&str>, field: &str) -> Result<Option<Uuid>, ApprovalError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_reference(Some(value), field).map(Some),
    }
}

fn record_transition(kind: &'static str, transition: &'static str) {
    counter!("approval_transitions_total", "kind" => kind, "transition" => transition).increment(1);
}

/// Generic leader-then-admin confirmation protocol.
pub struct ApprovalMachine<B> {
    binding: B,
}

impl<B: ApprovalBinding> ApprovalMachine<B> {
    pub fn new(binding: B) -> Self {
        Self { binding }
    }

    /// Creates the record if needed and stamps leader approval once.
    pub async fn leader_approve(
        &self,
        principal: Option<&Principal>,
        subject: Option<&str>,
        group: Option<&str>,
    ) -> Result<B::Record, ApprovalError> {
        let principal = principal.ok_or(ApprovalError::Unauthenticated)?;
        let subject = parse_reference(subject, B::SUBJECT_FIELD)?;
        let group = parse_optional_reference(group, "group")?;

        let existing = self
            .binding
            .load_by_subject(subject)
            .await
            .map_err(ApprovalError::Store)?;
        let group_id = self
            .binding
            .authorize_leader(principal, subject, group, existing.as_ref())
            .await?;

        let now = Utc::now();
        let record = match existing {
            Some(record) => self.stamp_leader(record, now).await?,
            None => {
                let mut record = self.binding.new_record(subject, group_id);
                record.stamps_mut().approve_by_leader(now);
                match self.binding.insert(&record).await {
                    Ok(saved) => {
                        record_transition(B::KIND, "leader_approved");
                        saved
                    }
                    Err(e) if e.is_conflict() => {
                        warn!(kind = B::KIND, subject = %subject, "Concurrent insert detected, re-reading record");
                        let current = self
                            .binding
                            .load_by_subject(subject)
                            .await
                            .map_err(ApprovalError::Store)?
                            .ok_or(ApprovalError::Persistence(e))?;
                        self.binding
                            .authorize_leader(principal, subject, group, Some(&current))
                            .await?;
                        self.stamp_leader(current, now).await?
                    }
                    Err(e) => return Err(ApprovalError::Persistence(e)),
                }
            }
        };

        info!(
            kind = B::KIND,
            subject = %subject,
            group_id = %record.group(),
            leader_id = %principal.id,
            "Leader approval recorded"
        );
        Ok(record)
    }

    async fn stamp_leader(
        &self,
        mut record: B::Record,
        now: chrono::DateTime<Utc>,
    ) -> Result<B::Record, ApprovalError> {
        if !record.stamps_mut().approve_by_leader(now) {
            return Ok(record);
        }
        let saved = self
            .binding
            .update(&record)
            .await
            .map_err(ApprovalError::Persistence)?;
        record_transition(B::KIND, "leader_approved");
        Ok(saved)
    }

    /// Stamps admin confirmation on a leader-approved record.
    pub async fn admin_confirm(
        &self,
        principal: Option<&Principal>,
        subject: Option<&str>,
    ) -> Result<B::Record, ApprovalError> {
        let principal = principal.ok_or(ApprovalError::Unauthenticated)?;
        self.binding.authorize_admin(principal)?;
        let subject = parse_reference(subject, B::SUBJECT_FIELD)?;

        let mut record = self
            .binding
            .load_by_subject(subject)
            .await
            .map_err(ApprovalError::Store)?
            .ok_or_else(|| ApprovalError::NotFound(B::NOT_FOUND_MESSAGE.to_string()))?;

        if !record.stamps_mut().confirm_by_admin(Utc::now())? {
            return Ok(record);
        }

        let saved = self
            .binding
            .update(&record)
            .await
            .map_err(ApprovalError::Persistence)?;
        record_transition(B::KIND, "admin_confirmed");
        info!(
            kind = B::KIND,
            subject = %subject,
            admin_id = %principal.id,
            "Admin confirmation recorded"
        );
        Ok(saved)
    }

    /// Reads a record. Visible to admins and to the leader of its group.
    pub async fn get(
        &self,
        principal: Option<&Principal>,
        subject: &str,
    ) -> Result<B::Record, ApprovalError> {
        let principal = principal.ok_or(ApprovalError::Unauthenticated)?;
        let subject = parse_reference(Some(subject), B::SUBJECT_FIELD)?;

        let record = self
            .binding
            .load_by_subject(subject)
            .await
            .map_err(ApprovalError::Store)?
            .ok_or_else(|| ApprovalError::NotFound(B::NOT_FOUND_MESSAGE.to_string()))?;

        if principal.is_admin {
            return Ok(record);
        }
        let leads = self
            .binding
            .leads_group(principal, record.group())
            .await
            .map_err(ApprovalError::Store)?;
        if leads {
            Ok(record)
        } else {
            Err(ApprovalError::Forbidden)
        }
    }
}

async fn find_led_group(
    groups: &dyn GroupStore,
    principal: &Principal,
    group_id: Uuid,
) -> Result<(), ApprovalError> {
    let group = groups
        .find_group(group_id)
        .await
        .map_err(ApprovalError::Store)?
        .ok_or_else(|| ApprovalError::NotFound("Group not found".to_string()))?;

    if group.is_led_by(principal.id) {
        Ok(())
    } else {
        Err(ApprovalError::Forbidden)
    }
}

/// Approvals of direct members. The caller names the group.
#[derive(Clone)]
pub struct MemberApprovals {
    approvals: Arc<dyn ApprovalStore>,
    groups: Arc<dyn GroupStore>,
    users: Arc<dyn UserStore>,
}

impl MemberApprovals {
    pub fn new(
        approvals: Arc<dyn ApprovalStore>,
        groups: Arc<dyn GroupStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            approvals,
            groups,
            users,
        }
    }
}

#[async_trait]
impl ApprovalBinding for MemberApprovals {
    type Record = Approval;

    const KIND: &'static str = "member";
    const SUBJECT_FIELD: &'static str = "user";
    const NOT_FOUND_MESSAGE: &'static str = "Approval record not found";

    async fn load_by_subject(&self, subject: Uuid) -> Result<Option<Approval>, StoreError> {
        self.approvals.find_approval_by_user(subject).await
    }

    async fn authorize_leader(
        &self,
        principal: &Principal,
        subject: Uuid,
        group: Option<Uuid>,
        existing: Option<&Approval>,
    ) -> Result<Uuid, ApprovalError> {
        let group_id = group.ok_or_else(|| ApprovalError::BadRequest("Missing group".to_string()))?;
        find_led_group(self.groups.as_ref(), principal, group_id).await?;

        self.users
            .find_user(subject)
            .await
            .map_err(ApprovalError::Store)?
            .ok_or_else(|| ApprovalError::NotFound("User not found".to_string()))?;

        if let Some(existing) = existing {
            if existing.group != group_id {
                return Err(ApprovalError::BadRequest(
                    "User assigned to a different group".to_string(),
                ));
            }
        }

        Ok(group_id)
    }

    async fn leads_group(&self, principal: &Principal, group: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .groups
            .find_group(group)
            .await?
            .is_some_and(|g| g.is_led_by(principal.id)))
    }

    fn new_record(&self, subject: Uuid, group: Uuid) -> Approval {
        Approval::new(subject, group)
    }

    async fn insert(&self, record: &Approval) -> Result<Approval, StoreError> {
        self.approvals.insert_approval(record).await
    }

    async fn update(&self, record: &Approval) -> Result<Approval, StoreError> {
        self.approvals.update_approval(record).await
    }
}

/// Approvals of guardians. The group is resolved from stored records.
#[derive(Clone)]
pub struct GuardianApprovals {
    guardians: Arc<dyn GuardianStore>,
    requests: Arc<dyn RequestStore>,
    groups: Arc<dyn GroupStore>,
}

impl GuardianApprovals {
    pub fn new(
        guardians: Arc<dyn GuardianStore>,
        requests: Arc<dyn RequestStore>,
        groups: Arc<dyn GroupStore>,
    ) -> Self {
        Self {
            guardians,
            requests,
            groups,
        }
    }

    /// Group of the existing record, else of the referenced request, else the supplied one.
    async fn resolve_group(
        &self,
        subject: Uuid,
        supplied: Option<Uuid>,
        existing: Option<&Guardian>,
    ) -> Result<Uuid, ApprovalError> {
        if let Some(existing) = existing {
            return Ok(existing.group);
        }

        let request = self
            .requests
            .find_request(subject)
            .await
            .map_err(ApprovalError::Store)?
            .ok_or_else(|| ApprovalError::NotFound("Request not found".to_string()))?;

        request
            .group
            .or(supplied)
            .ok_or_else(|| ApprovalError::NotFound("Guardian group not found".to_string()))
    }
}

#[async_trait]
impl ApprovalBinding for GuardianApprovals {
    type Record = Guardian;

    const KIND: &'static str = "guardian";
    const SUBJECT_FIELD: &'static str = "request";
    const NOT_FOUND_MESSAGE: &'static str = "Guardian record not found";

    async fn load_by_subject(&self, subject: Uuid) -> Result<Option<Guardian>, StoreError> {
        self.guardians.find_guardian_by_request(subject).await
    }

    async fn authorize_leader(
        &self,
        principal: &Principal,
        subject: Uuid,
        group: Option<Uuid>,
        existing: Option<&Guardian>,
    ) -> Result<Uuid, ApprovalError> {
        let group_id = self.resolve_group(subject, group, existing).await?;
        find_led_group(self.groups.as_ref(), principal, group_id).await?;

        if group.is_some_and(|supplied| supplied != group_id) {
            return Err(ApprovalError::BadRequest(
                "Guardian assigned to a different group".to_string(),
            ));
        }

        Ok(group_id)
    }

    async fn leads_group(&self, principal: &Principal, group: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .groups
            .find_group(group)
            .await?
            .is_some_and(|g| g.is_led_by(principal.id)))
    }

    fn new_record(&self, subject: Uuid, group: Uuid) -> Guardian {
        Guardian::new(subject, group)
    }

    async fn insert(&self, record: &Guardian) -> Result<Guardian, StoreError> {
        self.guardians.insert_guardian(record).await
    }

    async fn update(&self, record: &Guardian) -> Result<Guardian, StoreError> {
        self.guardians.update_guardian(record).await
    }
}

pub type MemberApprovalMachine = ApprovalMachine<MemberApprovals>;
pub type GuardianApprovalMachine = ApprovalMachine<GuardianApprovals>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CivilStatus, Group, MembershipRequest, Region, RequestStatus, User};
    use crate::store::RequestFilter;
    use crate::models::NewMembershipRequest;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Minimal in-test store covering the traits the bindings use.
    #[derive(Default)]
    struct TestStore {
        groups: Mutex<HashMap<Uuid, Group>>,
        users: Mutex<HashMap<Uuid, User>>,
        requests: Mutex<HashMap<Uuid, MembershipRequest>>,
        approvals: Mutex<HashMap<Uuid, Approval>>,
        guardians: Mutex<HashMap<Uuid, Guardian>>,
        /// Simulates a concurrent creator winning the insert race.
        race_on_insert: AtomicBool,
        fail_updates: AtomicBool,
    }

    #[async_trait]
    impl GroupStore for TestStore {
        async fn find_group(&self, id: Uuid) -> Result<Option<Group>, StoreError> {
            Ok(self.groups.lock().unwrap().get(&id).cloned())
        }
        async fn find_open_groups_for_region(&self, _: Uuid) -> Result<Vec<Group>, StoreError> {
            Ok(vec![])
        }
        async fn find_region(&self, _: Uuid) -> Result<Option<Region>, StoreError> {
            Ok(None)
        }
        async fn list_regions(&self) -> Result<Vec<Region>, StoreError> {
            Ok(vec![])
        }
    }

    #[async_trait]
    impl UserStore for TestStore {
        async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            Ok(self.users.lock().unwrap().get(&id).cloned())
        }
        async fn list_admin_emails(&self) -> Result<Vec<String>, StoreError> {
            Ok(vec![])
        }
    }

    #[async_trait]
    impl RequestStore for TestStore {
        async fn find_request(&self, id: Uuid) -> Result<Option<MembershipRequest>, StoreError> {
            Ok(self.requests.lock().unwrap().get(&id).cloned())
        }
        async fn insert_request(&self, _: NewMembershipRequest) -> Result<MembershipRequest, StoreError> {
            Err(StoreError::Io("unused".into()))
        }
        async fn update_request(&self, r: &MembershipRequest) -> Result<MembershipRequest, StoreError> {
            Ok(r.clone())
        }
        async fn list_requests(
            &self,
            _: &RequestFilter,
            _: i64,
            _: i64,
        ) -> Result<(Vec<MembershipRequest>, i64), StoreError> {
            Ok((vec![], 0))
        }
        async fn request_email_exists(&self, _: &str) -> Result<bool, StoreError> {
            Ok(false)
        }
    }

    #[async_trait]
    impl ApprovalStore for TestStore {
        async fn find_approval_by_user(&self, user: Uuid) -> Result<Option<Approval>, StoreError> {
            Ok(self.approvals.lock().unwrap().get(&user).cloned())
        }
        async fn insert_approval(&self, approval: &Approval) -> Result<Approval, StoreError> {
            let mut approvals = self.approvals.lock().unwrap();
            if self.race_on_insert.swap(false, Ordering::SeqCst) {
                approvals.insert(approval.user, Approval::new(approval.user, approval.group));
            }
            if approvals.contains_key(&approval.user) {
                return Err(StoreError::Conflict("approvals_user_key".into()));
            }
            approvals.insert(approval.user, approval.clone());
            Ok(approval.clone())
        }
        async fn update_approval(&self, approval: &Approval) -> Result<Approval, StoreError> {
            if self.fail_updates.load(Ordering::SeqCst) {
                return Err(StoreError::Io("disk full".into()));
            }
            self.approvals
                .lock()
                .unwrap()
                .insert(approval.user, approval.clone());
            Ok(approval.clone())
        }
    }

    #[async_trait]
    impl GuardianStore for TestStore {
        async fn find_guardian_by_request(&self, request: Uuid) -> Result<Option<Guardian>, StoreError> {
            Ok(self.guardians.lock().unwrap().get(&request).cloned())
        }
        async fn insert_guardian(&self, guardian: &Guardian) -> Result<Guardian, StoreError> {
            let mut guardians = self.guardians.lock().unwrap();
            if guardians.contains_key(&guardian.request) {
                return Err(StoreError::Conflict("guardians_request_key".into()));
            }
            guardians.insert(guardian.request, guardian.clone());
            Ok(guardian.clone())
        }
        async fn update_guardian(&self, guardian: &Guardian) -> Result<Guardian, StoreError> {
            self.guardians
                .lock()
                .unwrap()
                .insert(guardian.request, guardian.clone());
            Ok(guardian.clone())
        }
    }

    struct Fixture {
        store: Arc<TestStore>,
        leader: Principal,
        admin: Principal,
        group: Uuid,
        member: Uuid,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(TestStore::default());
        let leader = Principal {
            id: Uuid::new_v4(),
            is_admin: false,
        };
        let admin = Principal {
            id: Uuid::new_v4(),
            is_admin: true,
        };
        let group = Uuid::new_v4();
        let member = Uuid::new_v4();

        store.groups.lock().unwrap().insert(
            group,
            Group {
                id: group,
                name: "North".into(),
                regions: vec![],
                is_open: true,
                leader: Some(leader.id),
            },
        );
        store.users.lock().unwrap().insert(
            member,
            User {
                id: member,
                email: "member@example.com".into(),
                name: None,
                admin: false,
            },
        );

        Fixture {
            store,
            leader,
            admin,
            group,
            member,
        }
    }

    fn members(store: &Arc<TestStore>) -> MemberApprovalMachine {
        ApprovalMachine::new(MemberApprovals::new(
            store.clone(),
            store.clone(),
            store.clone(),
        ))
    }

    fn guardians(store: &Arc<TestStore>) -> GuardianApprovalMachine {
        ApprovalMachine::new(GuardianApprovals::new(
            store.clone(),
            store.clone(),
            store.clone(),
        ))
    }

    fn add_request(store: &TestStore, group: Option<Uuid>) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        store.requests.lock().unwrap().insert(
            id,
            MembershipRequest {
                id,
                name: "Kid".into(),
                email: format!("{}@example.com", id),
                motivation: "m".into(),
                birth_year: "2012".into(),
                civil_status: CivilStatus::Single,
                region: None,
                group,
                status: RequestStatus::Assigned,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    #[tokio::test]
    async fn test_leader_approve_creates_record() {
        let f = fixture();
        let machine = members(&f.store);
        let member = f.member.to_string();
        let group = f.group.to_string();

        let approval = machine
            .leader_approve(Some(&f.leader), Some(&member), Some(&group))
            .await
            .unwrap();

        assert_eq!(approval.user, f.member);
        assert_eq!(approval.group, f.group);
        assert!(approval.stamps.leader_approved_at.is_some());
        assert!(approval.stamps.admin_confirmed_at.is_none());
    }

    #[tokio::test]
    async fn test_leader_approve_is_idempotent() {
        let f = fixture();
        let machine = members(&f.store);
        let member = f.member.to_string();
        let group = f.group.to_string();

        let first = machine
            .leader_approve(Some(&f.leader), Some(&member), Some(&group))
            .await
            .unwrap();
        let second = machine
            .leader_approve(Some(&f.leader), Some(&member), Some(&group))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.stamps.leader_approved_at, second.stamps.leader_approved_at);
        assert_eq!(f.store.approvals.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_leader_approve_requires_principal() {
        let f = fixture();
        let result = members(&f.store)
            .leader_approve(None, Some(&f.member.to_string()), Some(&f.group.to_string()))
            .await;
        assert!(matches!(result, Err(ApprovalError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_leader_approve_rejects_missing_fields() {
        let f = fixture();
        let machine = members(&f.store);

        let result = machine
            .leader_approve(Some(&f.leader), None, Some(&f.group.to_string()))
            .await;
        assert!(matches!(result, Err(ApprovalError::BadRequest(m)) if m == "Missing user"));

        let result = machine
            .leader_approve(Some(&f.leader), Some(&f.member.to_string()), None)
            .await;
        assert!(matches!(result, Err(ApprovalError::BadRequest(m)) if m == "Missing group"));

        let result = machine
            .leader_approve(Some(&f.leader), Some("not-a-uuid"), Some(&f.group.to_string()))
            .await;
        assert!(matches!(result, Err(ApprovalError::BadRequest(m)) if m == "Invalid user"));
    }

    #[tokio::test]
    async fn test_non_leader_is_forbidden() {
        let f = fixture();
        let outsider = Principal {
            id: Uuid::new_v4(),
            is_admin: false,
        };

        let result = members(&f.store)
            .leader_approve(Some(&outsider), Some(&f.member.to_string()), Some(&f.group.to_string()))
            .await;

        assert!(matches!(result, Err(ApprovalError::Forbidden)));
        assert!(f.store.approvals.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_group_and_user_are_not_found() {
        let f = fixture();
        let machine = members(&f.store);

        let result = machine
            .leader_approve(Some(&f.leader), Some(&f.member.to_string()), Some(&Uuid::new_v4().to_string()))
            .await;
        assert!(matches!(result, Err(ApprovalError::NotFound(m)) if m == "Group not found"));

        let result = machine
            .leader_approve(Some(&f.leader), Some(&Uuid::new_v4().to_string()), Some(&f.group.to_string()))
            .await;
        assert!(matches!(result, Err(ApprovalError::NotFound(m)) if m == "User not found"));
    }

    #[tokio::test]
    async fn test_existing_record_in_other_group_is_rejected() {
        let f = fixture();
        let other_group = Uuid::new_v4();
        f.store
            .approvals
            .lock()
            .unwrap()
            .insert(f.member, Approval::new(f.member, other_group));

        let result = members(&f.store)
            .leader_approve(Some(&f.leader), Some(&f.member.to_string()), Some(&f.group.to_string()))
            .await;

        assert!(
            matches!(result, Err(ApprovalError::BadRequest(m)) if m == "User assigned to a different group")
        );
    }

    #[tokio::test]
    async fn test_insert_conflict_rereads_record() {
        let f = fixture();
        f.store.race_on_insert.store(true, Ordering::SeqCst);

        let approval = members(&f.store)
            .leader_approve(Some(&f.leader), Some(&f.member.to_string()), Some(&f.group.to_string()))
            .await
            .unwrap();

        assert!(approval.stamps.leader_approved_at.is_some());
        let stored = f.store.approvals.lock().unwrap().get(&f.member).cloned().unwrap();
        assert_eq!(stored.id, approval.id);
        assert!(stored.stamps.leader_approved_at.is_some());
    }

    #[tokio::test]
    async fn test_admin_confirm_requires_leader_approval() {
        let f = fixture();
        f.store
            .approvals
            .lock()
            .unwrap()
            .insert(f.member, Approval::new(f.member, f.group));

        let result = members(&f.store)
            .admin_confirm(Some(&f.admin), Some(&f.member.to_string()))
            .await;

        assert!(matches!(result, Err(ApprovalError::BadRequest(m)) if m == "Leader approval required"));
        let stored = f.store.approvals.lock().unwrap().get(&f.member).cloned().unwrap();
        assert!(stored.stamps.admin_confirmed_at.is_none());
    }

    #[tokio::test]
    async fn test_admin_confirm_flow() {
        let f = fixture();
        let machine = members(&f.store);
        let member = f.member.to_string();

        machine
            .leader_approve(Some(&f.leader), Some(&member), Some(&f.group.to_string()))
            .await
            .unwrap();

        let forbidden = machine.admin_confirm(Some(&f.leader), Some(&member)).await;
        assert!(matches!(forbidden, Err(ApprovalError::Forbidden)));

        let confirmed = machine.admin_confirm(Some(&f.admin), Some(&member)).await.unwrap();
        let first_stamp = confirmed.stamps.admin_confirmed_at;
        assert!(first_stamp.is_some());

        let again = machine.admin_confirm(Some(&f.admin), Some(&member)).await.unwrap();
        assert_eq!(again.stamps.admin_confirmed_at, first_stamp);
    }

    #[tokio::test]
    async fn test_admin_confirm_missing_record() {
        let f = fixture();
        let result = members(&f.store)
            .admin_confirm(Some(&f.admin), Some(&f.member.to_string()))
            .await;
        assert!(matches!(result, Err(ApprovalError::NotFound(m)) if m == "Approval record not found"));
    }

    #[tokio::test]
    async fn test_save_failure_is_persistence_error() {
        let f = fixture();
        let mut approval = Approval::new(f.member, f.group);
        approval.stamps.approve_by_leader(Utc::now());
        f.store.approvals.lock().unwrap().insert(f.member, approval);
        f.store.fail_updates.store(true, Ordering::SeqCst);

        let result = members(&f.store)
            .admin_confirm(Some(&f.admin), Some(&f.member.to_string()))
            .await;
        assert!(matches!(result, Err(ApprovalError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_get_visibility() {
        let f = fixture();
        let machine = members(&f.store);
        f.store
            .approvals
            .lock()
            .unwrap()
            .insert(f.member, Approval::new(f.member, f.group));
        let member = f.member.to_string();

        assert!(machine.get(Some(&f.admin), &member).await.is_ok());
        assert!(machine.get(Some(&f.leader), &member).await.is_ok());

        let outsider = Principal {
            id: Uuid::new_v4(),
            is_admin: false,
        };
        assert!(matches!(
            machine.get(Some(&outsider), &member).await,
            Err(ApprovalError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_guardian_group_from_request() {
        let f = fixture();
        let request = add_request(&f.store, Some(f.group));

        let guardian = guardians(&f.store)
            .leader_approve(Some(&f.leader), Some(&request.to_string()), None)
            .await
            .unwrap();

        assert_eq!(guardian.request, request);
        assert_eq!(guardian.group, f.group);
        assert!(guardian.stamps.leader_approved_at.is_some());
    }

    #[tokio::test]
    async fn test_guardian_group_from_existing_record_wins() {
        let f = fixture();
        let request = add_request(&f.store, None);
        f.store
            .guardians
            .lock()
            .unwrap()
            .insert(request, Guardian::new(request, f.group));

        let result = guardians(&f.store)
            .leader_approve(Some(&f.leader), Some(&request.to_string()), Some(&Uuid::new_v4().to_string()))
            .await;
        assert!(
            matches!(result, Err(ApprovalError::BadRequest(m)) if m == "Guardian assigned to a different group")
        );

        let ok = guardians(&f.store)
            .leader_approve(Some(&f.leader), Some(&request.to_string()), Some(&f.group.to_string()))
            .await
            .unwrap();
        assert_eq!(ok.group, f.group);
    }

    #[tokio::test]
    async fn test_guardian_falls_back_to_supplied_group() {
        let f = fixture();
        let request = add_request(&f.store, None);

        let guardian = guardians(&f.store)
            .leader_approve(Some(&f.leader), Some(&request.to_string()), Some(&f.group.to_string()))
            .await
            .unwrap();
        assert_eq!(guardian.group, f.group);
    }

    #[tokio::test]
    async fn test_guardian_without_resolvable_group() {
        let f = fixture();
        let request = add_request(&f.store, None);

        let result = guardians(&f.store)
            .leader_approve(Some(&f.leader), Some(&request.to_string()), None)
            .await;
        assert!(matches!(result, Err(ApprovalError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_guardian_non_leader_forbidden() {
        let f = fixture();
        let request = add_request(&f.store, Some(f.group));
        let outsider = Principal {
            id: Uuid::new_v4(),
            is_admin: true,
        };

        let result = guardians(&f.store)
            .leader_approve(Some(&outsider), Some(&request.to_string()), None)
            .await;
        assert!(matches!(result, Err(ApprovalError::Forbidden)));
    }
}
