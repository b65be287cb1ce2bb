//! PostgreSQL implementations of the domain store traits.

pub mod approval;
pub mod event;
pub mod group;
pub mod request;
pub mod template;
pub mod user;

pub use approval::{ApprovalRepository, GuardianRepository};
pub use event::EventRepository;
pub use group::GroupRepository;
pub use request::RequestRepository;
pub use template::TemplateRepository;
pub use user::UserRepository;
