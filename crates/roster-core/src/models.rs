//! Domain models for Roster.
//!
//! These are the core types shared across all crates.

pub mod permission;
pub mod role;
pub mod user;
