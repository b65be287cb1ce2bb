//! Database entity definitions.
//!
//! Entities are direct mappings to database rows and are converted into
//! domain models at the repository boundary.

pub mod approval;
pub mod event;
pub mod group;
pub mod request;
pub mod template;
pub mod user;

pub use approval::{ApprovalEntity, GuardianEntity};
pub use event::{EventEntity, EventRegistrationEntity};
pub use group::{GroupEntity, RegionEntity};
pub use request::{CivilStatusDb, RequestEntity, RequestStatusDb};
pub use template::TemplateEntity;
pub use user::UserEntity;
