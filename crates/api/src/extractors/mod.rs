//! Custom Axum extractors.

pub mod json_body;
pub mod user_auth;

pub use json_body::JsonBody;
pub use user_auth::OptionalUserAuth;
