//! Credential and password policy configuration.

/// Configuration for hashing and the default password policy.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Optional pepper prepended to passwords before Argon2id hashing
    /// and verification.
    pub pepper: Option<String>,
    /// Minimum password length in characters (default: 8).
    pub min_password_length: usize,
    /// Maximum password length in characters (default: 128).
    pub max_password_length: usize,
    /// Reject passwords found in the built-in common password list.
    pub reject_common_passwords: bool,
    /// Reject passwords made only of digits.
    pub reject_numeric_passwords: bool,
    /// Reject passwords too close to the username, email or name.
    pub reject_similar_to_user: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            pepper: None,
            min_password_length: 8,
            max_password_length: 128,
            reject_common_passwords: true,
            reject_numeric_passwords: true,
            reject_similar_to_user: true,
        }
    }
}
