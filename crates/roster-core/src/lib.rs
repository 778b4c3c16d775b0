//! Roster Core — Domain models, error types, and the traits through
//! which the API layer talks to the Identity Store and password policy.

pub mod error;
pub mod models;
pub mod policy;
pub mod repository;
pub mod validation;
