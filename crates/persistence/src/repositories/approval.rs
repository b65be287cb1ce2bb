//! Approval and guardian repositories.

use async_trait::async_trait;
use domain::models::{Approval, Guardian};
use domain::store::{ApprovalStore, GuardianStore, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{ApprovalEntity, GuardianEntity};
use crate::metrics::QueryTimer;

/// Repository for member approvals.
#[derive(Clone)]
pub struct ApprovalRepository {
    pool: PgPool,
}

impl ApprovalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApprovalStore for ApprovalRepository {
    async fn find_approval_by_user(&self, user: Uuid) -> Result<Option<Approval>, StoreError> {
        let timer = QueryTimer::new("find_approval_by_user");
        let result = sqlx::query_as::<_, ApprovalEntity>(
            r#"
            SELECT id, user_id, group_id, leader_approved_at, admin_confirmed_at, created_at, updated_at
            FROM approvals
            WHERE user_id = $1
            "#,
        )
        .bind(user)
        .fetch_optional(&self.pool)
        .await;
        timer.record(&result);
        Ok(result?.map(Into::into))
    }

    async fn insert_approval(&self, approval: &Approval) -> Result<Approval, StoreError> {
        let timer = QueryTimer::new("insert_approval");
        let result = sqlx::query_as::<_, ApprovalEntity>(
            r#"
            INSERT INTO approvals (id, user_id, group_id, leader_approved_at, admin_confirmed_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, group_id, leader_approved_at, admin_confirmed_at, created_at, updated_at
            "#,
        )
        .bind(approval.id)
        .bind(approval.user)
        .bind(approval.group)
        .bind(approval.stamps.leader_approved_at)
        .bind(approval.stamps.admin_confirmed_at)
        .fetch_one(&self.pool)
        .await;
        timer.record(&result);
        Ok(result?.into())
    }

    async fn update_approval(&self, approval: &Approval) -> Result<Approval, StoreError> {
        let timer = QueryTimer::new("update_approval");
        let result = sqlx::query_as::<_, ApprovalEntity>(
            r#"
            UPDATE approvals
            SET leader_approved_at = COALESCE(leader_approved_at, $2),
                admin_confirmed_at = COALESCE(admin_confirmed_at, $3),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, group_id, leader_approved_at, admin_confirmed_at, created_at, updated_at
            "#,
        )
        .bind(approval.id)
        .bind(approval.stamps.leader_approved_at)
        .bind(approval.stamps.admin_confirmed_at)
        .fetch_optional(&self.pool)
        .await;
        timer.record(&result);
        result?.map(Into::into).ok_or(StoreError::NotFound)
    }
}

/// Repository for guardian confirmations.
#[derive(Clone)]
pub struct GuardianRepository {
    pool: PgPool,
}

impl GuardianRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GuardianStore for GuardianRepository {
    async fn find_guardian_by_request(
        &self,
        request: Uuid,
    ) -> Result<Option<Guardian>, StoreError> {
        let timer = QueryTimer::new("find_guardian_by_request");
        let result = sqlx::query_as::<_, GuardianEntity>(
            r#"
            SELECT id, request_id, guardian_id, group_id, notes, leader_approved_at,
                   admin_confirmed_at, created_at, updated_at
            FROM guardians
            WHERE request_id = $1
            "#,
        )
        .bind(request)
        .fetch_optional(&self.pool)
        .await;
        timer.record(&result);
        Ok(result?.map(Into::into))
    }

    async fn insert_guardian(&self, guardian: &Guardian) -> Result<Guardian, StoreError> {
        let timer = QueryTimer::new("insert_guardian");
        let result = sqlx::query_as::<_, GuardianEntity>(
            r#"
            INSERT INTO guardians (id, request_id, guardian_id, group_id, notes, leader_approved_at, admin_confirmed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, request_id, guardian_id, group_id, notes, leader_approved_at,
                      admin_confirmed_at, created_at, updated_at
            "#,
        )
        .bind(guardian.id)
        .bind(guardian.request)
        .bind(guardian.guardian)
        .bind(guardian.group)
        .bind(&guardian.notes)
        .bind(guardian.stamps.leader_approved_at)
        .bind(guardian.stamps.admin_confirmed_at)
        .fetch_one(&self.pool)
        .await;
        timer.record(&result);
        Ok(result?.into())
    }

    async fn update_guardian(&self, guardian: &Guardian) -> Result<Guardian, StoreError> {
        let timer = QueryTimer::new("update_guardian");
        let result = sqlx::query_as::<_, GuardianEntity>(
            r#"
            UPDATE guardians
            SET leader_approved_at = COALESCE(leader_approved_at, $2),
                admin_confirmed_at = COALESCE(admin_confirmed_at, $3),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, request_id, guardian_id, group_id, notes, leader_approved_at,
                      admin_confirmed_at, created_at, updated_at
            "#,
        )
        .bind(guardian.id)
        .bind(guardian.stamps.leader_approved_at)
        .bind(guardian.stamps.admin_confirmed_at)
        .fetch_optional(&self.pool)
        .await;
        timer.record(&result);
        result?.map(Into::into).ok_or(StoreError::NotFound)
    }
}
