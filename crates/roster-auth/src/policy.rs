//! Default password policy.
//!
//! Every enabled rule runs and all violations are reported, so a client
//! can show the complete list in one round trip.

use std::collections::HashSet;

use roster_core::policy::{PasswordContext, PasswordPolicy};
use tracing::debug;

use crate::config::AuthConfig;

const COMMON_PASSWORDS: &str = include_str!("common_passwords.txt");

/// Attribute fragments shorter than this are not compared.
const MIN_SIMILARITY_FRAGMENT: usize = 3;

pub struct DefaultPasswordPolicy {
    min_length: usize,
    max_length: usize,
    reject_common: bool,
    reject_numeric: bool,
    reject_similar: bool,
    common: HashSet<&'static str>,
}

impl DefaultPasswordPolicy {
    pub fn new(config: &AuthConfig) -> Self {
        let common = COMMON_PASSWORDS
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        Self {
            min_length: config.min_password_length,
            max_length: config.max_password_length,
            reject_common: config.reject_common_passwords,
            reject_numeric: config.reject_numeric_passwords,
            reject_similar: config.reject_similar_to_user,
            common,
        }
    }

    fn similar_attribute(
        &self,
        password: &str,
        context: &PasswordContext<'_>,
    ) -> Option<&'static str> {
        let password = password.to_lowercase();
        let email_local = context.email.map(|e| e.split('@').next().unwrap_or(e));
        let attributes = [
            ("username", context.username),
            ("email address", email_local),
            ("first name", context.first_name),
            ("last name", context.last_name),
        ];

        for (label, value) in attributes {
            let Some(value) = value else { continue };
            let value = value.to_lowercase();
            let fragments = value
                .split(|c: char| !c.is_alphanumeric())
                .chain(std::iter::once(value.as_str()));
            for fragment in fragments {
                if fragment.chars().count() < MIN_SIMILARITY_FRAGMENT {
                    continue;
                }
                if password.contains(fragment) || fragment.contains(password.as_str()) {
                    return Some(label);
                }
            }
        }
        None
    }
}

impl Default for DefaultPasswordPolicy {
    fn default() -> Self {
        Self::new(&AuthConfig::default())
    }
}

impl PasswordPolicy for DefaultPasswordPolicy {
    fn check(
        &self,
        password: &str,
        context: Option<&PasswordContext<'_>>,
    ) -> Result<(), Vec<String>> {
        let mut violations = Vec::new();
        let length = password.chars().count();

        if length < self.min_length {
            violations.push(format!(
                "This password is too short. It must contain at least {} characters.",
                self.min_length
            ));
        }
        if length > self.max_length {
            violations.push(format!(
                "This password is too long. It must contain at most {} characters.",
                self.max_length
            ));
        }
        if self.reject_similar
            && let Some(ctx) = context
            && let Some(attribute) = self.similar_attribute(password, ctx)
        {
            violations.push(format!("The password is too similar to the {attribute}."));
        }
        if self.reject_common
            && self.common.contains(password.trim().to_lowercase().as_str())
        {
            violations.push("This password is too common.".to_string());
        }
        if self.reject_numeric
            && !password.is_empty()
            && password.chars().all(|c| c.is_ascii_digit())
        {
            violations.push("This password is entirely numeric.".to_string());
        }

        if violations.is_empty() {
            Ok(())
        } else {
            debug!(count = violations.len(), "Password rejected by policy");
            Err(violations)
        }
    }
}
