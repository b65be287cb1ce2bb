//! Group and region repository.

use async_trait::async_trait;
use domain::models::{Group, Region};
use domain::store::{GroupStore, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{GroupEntity, RegionEntity};
use crate::metrics::QueryTimer;

const GROUP_SELECT: &str = r#"
    SELECT
        g.id, g.name, g.is_open, g.leader_id,
        COALESCE(
            ARRAY_AGG(gr.region_id ORDER BY gr.region_id) FILTER (WHERE gr.region_id IS NOT NULL),
            '{}'::uuid[]
        ) AS regions
    FROM groups g
    LEFT JOIN group_regions gr ON gr.group_id = g.id
"#;

/// Repository for group and region database operations.
#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupStore for GroupRepository {
    async fn find_group(&self, id: Uuid) -> Result<Option<Group>, StoreError> {
        let timer = QueryTimer::new("find_group_by_id");
        let result = sqlx::query_as::<_, GroupEntity>(&format!(
            "{} WHERE g.id = $1 GROUP BY g.id",
            GROUP_SELECT
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record(&result);
        Ok(result?.map(Into::into))
    }

    async fn find_open_groups_for_region(&self, region: Uuid) -> Result<Vec<Group>, StoreError> {
        let timer = QueryTimer::new("find_open_groups_for_region");
        let result = sqlx::query_as::<_, GroupEntity>(&format!(
            r#"{}
            WHERE g.is_open = true
              AND EXISTS (
                  SELECT 1 FROM group_regions m
                  WHERE m.group_id = g.id AND m.region_id = $1
              )
            GROUP BY g.id
            ORDER BY g.id
            "#,
            GROUP_SELECT
        ))
        .bind(region)
        .fetch_all(&self.pool)
        .await;
        timer.record(&result);
        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn find_region(&self, id: Uuid) -> Result<Option<Region>, StoreError> {
        let timer = QueryTimer::new("find_region_by_id");
        let result =
            sqlx::query_as::<_, RegionEntity>("SELECT id, name FROM regions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await;
        timer.record(&result);
        Ok(result?.map(Into::into))
    }

    async fn list_regions(&self) -> Result<Vec<Region>, StoreError> {
        let timer = QueryTimer::new("list_regions");
        let result = sqlx::query_as::<_, RegionEntity>("SELECT id, name FROM regions ORDER BY name")
            .fetch_all(&self.pool)
            .await;
        timer.record(&result);
        Ok(result?.into_iter().map(Into::into).collect())
    }
}
