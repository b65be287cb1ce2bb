//! Domain layer for the membership backend.
//!
//! This crate contains:
//! - Domain models (Request, Group, Approval, Guardian, Event, Template)
//! - Store traits the persistence layer implements
//! - Business logic services (group assignment, two-phase approvals,
//!   event registration, email templating)

pub mod models;
pub mod services;
pub mod store;
