//! Roster API — maps users to and from request payloads and validates
//! password-change requests.
//!
//! Both components are generic over the `roster-core` Identity Store
//! and password policy traits. The authenticated requester is always
//! passed in explicitly as `actor`.

pub mod password_change;
pub mod user;

pub use password_change::{PasswordChangeInput, PasswordChangeValidator, ValidatedPasswordChange};
pub use user::{UserInput, UserMapper, UserRepresentation, ValidatedUser, ValidationMode};
