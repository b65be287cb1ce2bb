//! Membership request repository.

use async_trait::async_trait;
use domain::models::{MembershipRequest, NewMembershipRequest};
use domain::store::{RequestFilter, RequestStore, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{CivilStatusDb, RequestEntity, RequestStatusDb};
use crate::metrics::QueryTimer;

const REQUEST_COLUMNS: &str = "id, name, email, motivation, birth_year, civil_status, region_id, \
     group_id, status, created_at, updated_at";

/// Repository for membership request database operations.
#[derive(Clone)]
pub struct RequestRepository {
    pool: PgPool,
}

impl RequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestStore for RequestRepository {
    async fn find_request(&self, id: Uuid) -> Result<Option<MembershipRequest>, StoreError> {
        let timer = QueryTimer::new("find_request_by_id");
        let result = sqlx::query_as::<_, RequestEntity>(&format!(
            "SELECT {} FROM requests WHERE id = $1",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record(&result);
        Ok(result?.map(Into::into))
    }

    async fn insert_request(
        &self,
        request: NewMembershipRequest,
    ) -> Result<MembershipRequest, StoreError> {
        let timer = QueryTimer::new("insert_request");
        let result = sqlx::query_as::<_, RequestEntity>(&format!(
            r#"
            INSERT INTO requests (name, email, motivation, birth_year, civil_status, region_id, group_id, status)
            VALUES ($1, $2, $3, $4, $5, $6, NULL, '0-pending')
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.motivation)
        .bind(&request.birth_year)
        .bind(CivilStatusDb::from(request.civil_status))
        .bind(request.region)
        .fetch_one(&self.pool)
        .await;
        timer.record(&result);
        Ok(result?.into())
    }

    async fn update_request(
        &self,
        request: &MembershipRequest,
    ) -> Result<MembershipRequest, StoreError> {
        let timer = QueryTimer::new("update_request");
        let result = sqlx::query_as::<_, RequestEntity>(&format!(
            r#"
            UPDATE requests
            SET status = $2, group_id = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(request.id)
        .bind(RequestStatusDb::from(request.status))
        .bind(request.group)
        .fetch_optional(&self.pool)
        .await;
        timer.record(&result);
        result?.map(Into::into).ok_or(StoreError::NotFound)
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<MembershipRequest>, i64), StoreError> {
        let status = filter.status.map(RequestStatusDb::from);
        let where_clause = r#"
            WHERE ($1::request_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR group_id IN (SELECT id FROM groups WHERE leader_id = $2))
        "#;

        let timer = QueryTimer::new("list_requests");
        let rows = sqlx::query_as::<_, RequestEntity>(&format!(
            "SELECT {} FROM requests {} ORDER BY created_at DESC, id LIMIT $3 OFFSET $4",
            REQUEST_COLUMNS, where_clause
        ))
        .bind(status)
        .bind(filter.led_by)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await;
        timer.record(&rows);
        let rows = rows?;

        let timer = QueryTimer::new("count_requests");
        let total: Result<i64, sqlx::Error> =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM requests {}", where_clause))
                .bind(status)
                .bind(filter.led_by)
                .fetch_one(&self.pool)
                .await;
        timer.record(&total);

        Ok((rows.into_iter().map(Into::into).collect(), total?))
    }

    async fn request_email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let timer = QueryTimer::new("request_email_exists");
        let result: Result<bool, sqlx::Error> =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM requests WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await;
        timer.record(&result);
        Ok(result?)
    }
}
