//! Group and region domain models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Geographic or organizational scope used to match applicants to groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: Uuid,
    pub name: String,
}

/// An organizational unit accepting members from one or more regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub regions: Vec<Uuid>,
    pub is_open: bool,
    pub leader: Option<Uuid>,
}

impl Group {
    /// Whether this group can receive a request from `region` by random assignment.
    pub fn accepts_region(&self, region: Uuid) -> bool {
        self.is_open && self.regions.contains(&region)
    }

    /// Whether `user_id` is this group's leader.
    pub fn is_led_by(&self, user_id: Uuid) -> bool {
        self.leader == Some(user_id)
    }
}

/// Response for listing regions.
#[derive(Debug, Clone, Serialize)]
pub struct ListRegionsResponse {
    pub data: Vec<Region>,
}
