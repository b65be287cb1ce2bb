//! Domain services for the membership backend.
//!
//! Services contain business logic that operates on domain models.

pub mod approval;
pub mod assignment;
pub mod notification;
pub mod registration;
pub mod requests;
pub mod templating;

pub use approval::{
    ApprovalBinding, ApprovalError, ApprovalMachine, GuardianApprovalMachine, GuardianApprovals,
    MemberApprovalMachine, MemberApprovals,
};
pub use assignment::{AssignmentOutcome, GroupAssigner};
pub use notification::{MockNotifier, Notifier, NotifyError, OutboundEmail};
pub use registration::{RegistrationError, RegistrationService, RegistrationSettings};
pub use requests::{RequestError, RequestService};
