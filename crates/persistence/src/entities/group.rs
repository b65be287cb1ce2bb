//! Group and region entities (database row mapping).

use domain::models::{Group, Region};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the groups table joined with its regions.
#[derive(Debug, Clone, FromRow)]
pub struct GroupEntity {
    pub id: Uuid,
    pub name: String,
    pub is_open: bool,
    pub leader_id: Option<Uuid>,
    pub regions: Vec<Uuid>,
}

impl From<GroupEntity> for Group {
    fn from(entity: GroupEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            regions: entity.regions,
            is_open: entity.is_open,
            leader: entity.leader_id,
        }
    }
}

/// Database row mapping for the regions table.
#[derive(Debug, Clone, FromRow)]
pub struct RegionEntity {
    pub id: Uuid,
    pub name: String,
}

impl From<RegionEntity> for Region {
    fn from(entity: RegionEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
        }
    }
}
