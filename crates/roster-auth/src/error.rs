//! Credential error types.

use roster_core::error::RosterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid hash format: {0}")]
    MalformedHash(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for RosterError {
    fn from(err: AuthError) -> Self {
        RosterError::Crypto(err.to_string())
    }
}
