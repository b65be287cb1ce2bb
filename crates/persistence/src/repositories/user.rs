//! User repository. Accounts are read-only here.

use async_trait::async_trait;
use domain::models::User;
use domain::store::{StoreError, UserStore};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::UserEntity;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let timer = QueryTimer::new("find_user_by_id");
        let result = sqlx::query_as::<_, UserEntity>(
            "SELECT id, email, name, admin FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record(&result);
        Ok(result?.map(Into::into))
    }

    async fn list_admin_emails(&self) -> Result<Vec<String>, StoreError> {
        let timer = QueryTimer::new("list_admin_emails");
        let result: Result<Vec<String>, sqlx::Error> =
            sqlx::query_scalar("SELECT email FROM users WHERE admin = true ORDER BY email")
                .fetch_all(&self.pool)
                .await;
        timer.record(&result);
        Ok(result?)
    }
}
