//! Shared utilities and common types for the membership backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Random token generation
//! - Bearer token (JWT) issuing and validation
//! - Email address parsing and normalization

pub mod crypto;
pub mod jwt;
pub mod validation;
