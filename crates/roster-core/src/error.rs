//! Error types for the Roster system.

use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Validation error: {0}")]
    Validation(ValidationError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),
}

impl From<ValidationError> for RosterError {
    fn from(err: ValidationError) -> Self {
        RosterError::Validation(err)
    }
}

pub type RosterResult<T> = Result<T, RosterError>;
