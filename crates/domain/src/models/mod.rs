//! Domain models for the membership backend.

pub mod approval;
pub mod event;
pub mod group;
pub mod request;
pub mod template;
pub mod user;

pub use approval::{
    Approval, Confirmable, ConfirmationError, ConfirmationStage, ConfirmationStamps,
    ConfirmationView, Guardian,
};
pub use event::{AcceptOutcome, Event, EventRegistration, NewEventRegistration};
pub use group::{Group, Region};
pub use request::{CivilStatus, MembershipRequest, NewMembershipRequest, RequestStatus};
pub use template::Template;
pub use user::{Principal, User};
