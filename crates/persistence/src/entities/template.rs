//! Template entity (database row mapping).

use domain::models::Template;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the templates table.
#[derive(Debug, Clone, FromRow)]
pub struct TemplateEntity {
    pub id: Uuid,
    pub slug: Option<String>,
    pub name: String,
    pub subject: String,
    pub body: String,
    pub reply_to: Option<String>,
    pub to_address: Option<String>,
}

impl From<TemplateEntity> for Template {
    fn from(entity: TemplateEntity) -> Self {
        Self {
            id: entity.id,
            slug: entity.slug,
            name: entity.name,
            subject: entity.subject,
            body: entity.body,
            reply_to: entity.reply_to,
            to: entity.to_address,
        }
    }
}
