//! HTTP route handlers.

pub mod approvals;
pub mod events;
pub mod guardians;
pub mod health;
pub mod regions;
pub mod requests;
