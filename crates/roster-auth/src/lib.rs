//! Roster Auth — Argon2id credential hashing/verification and the
//! default password policy.

pub mod config;
pub mod error;
pub mod password;
pub mod policy;

pub use config::AuthConfig;
pub use error::AuthError;
pub use policy::DefaultPasswordPolicy;
