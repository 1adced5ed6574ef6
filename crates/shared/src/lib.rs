//! Shared utilities and common types for the Hotplace Meetup backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Cryptographic utilities (webhook signatures)
//! - Invitation code generation
//! - Common validation logic

pub mod codes;
pub mod crypto;
pub mod validation;
