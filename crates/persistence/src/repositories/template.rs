//! Email template repository.

use async_trait::async_trait;
use domain::models::Template;
use domain::store::{StoreError, TemplateStore};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::TemplateEntity;
use crate::metrics::QueryTimer;

/// Repository for email templates.
#[derive(Clone)]
pub struct TemplateRepository {
    pool: PgPool,
}

impl TemplateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateStore for TemplateRepository {
    async fn find_template(&self, id: Uuid) -> Result<Option<Template>, StoreError> {
        let timer = QueryTimer::new("find_template_by_id");
        let result = sqlx::query_as::<_, TemplateEntity>(
            "SELECT id, slug, name, subject, body, reply_to, to_address FROM templates WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record(&result);
        Ok(result?.map(Into::into))
    }

    async fn find_template_by_slug(&self, slug: &str) -> Result<Option<Template>, StoreError> {
        let timer = QueryTimer::new("find_template_by_slug");
        let result = sqlx::query_as::<_, TemplateEntity>(
            "SELECT id, slug, name, subject, body, reply_to, to_address FROM templates WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await;
        timer.record(&result);
        Ok(result?.map(Into::into))
    }
}
