//! Persistence layer for the membership backend.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Entity definitions (database row mappings)
//! - PostgreSQL repository implementations of the domain store traits
//! - An in-memory store used by tests and local runs

pub mod db;
pub mod entities;
pub mod memory;
pub mod metrics;
pub mod repositories;

use std::sync::Arc;

use domain::store::Stores;
use sqlx::PgPool;

use db::PoolHealth;
use repositories::{
    ApprovalRepository, EventRepository, GroupRepository, GuardianRepository, RequestRepository,
    TemplateRepository, UserRepository,
};

/// Builds the store bundle backed by PostgreSQL repositories sharing one pool.
pub fn pg_stores(pool: PgPool) -> Stores {
    Stores {
        requests: Arc::new(RequestRepository::new(pool.clone())),
        groups: Arc::new(GroupRepository::new(pool.clone())),
        approvals: Arc::new(ApprovalRepository::new(pool.clone())),
        guardians: Arc::new(GuardianRepository::new(pool.clone())),
        events: Arc::new(EventRepository::new(pool.clone())),
        templates: Arc::new(TemplateRepository::new(pool.clone())),
        users: Arc::new(UserRepository::new(pool.clone())),
        health: Arc::new(PoolHealth::new(pool)),
    }
}
