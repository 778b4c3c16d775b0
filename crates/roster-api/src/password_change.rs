//! Password-change request validation.

use std::fmt;

use roster_core::error::RosterResult;
use roster_core::models::user::User;
use roster_core::policy::{PasswordContext, PasswordPolicy};
use roster_core::repository::UserRepository;
use roster_core::validation::{ValidationError, required_str};
use serde::Deserialize;
use tracing::{debug, info};

const CURRENT_PASSWORD_INCORRECT: &str = "Current password is incorrect.";
const NEW_PASSWORD_MISMATCH: &str = "New password fields didn't match.";

#[derive(Clone, Default, Deserialize)]
pub struct PasswordChangeInput {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

impl fmt::Debug for PasswordChangeInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[redacted]");
        f.debug_struct("PasswordChangeInput")
            .field("current_password", &redact(&self.current_password))
            .field("new_password", &redact(&self.new_password))
            .field("confirm_password", &redact(&self.confirm_password))
            .finish()
    }
}

/// A password change that passed validation. Nothing has been written.
pub struct ValidatedPasswordChange {
    new_password: String,
}

impl ValidatedPasswordChange {
    /// Store the new password for `actor` through the credential path.
    pub async fn apply<U: UserRepository>(self, users: &U, actor: &User) -> RosterResult<()> {
        users.set_password(actor.id, &self.new_password).await?;
        info!(user_id = %actor.id, "Password change applied");
        Ok(())
    }
}

impl fmt::Debug for ValidatedPasswordChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedPasswordChange").finish_non_exhaustive()
    }
}

/// Validates `current_password` / `new_password` / `confirm_password`
/// against the actor's stored credential and the password policy.
pub struct PasswordChangeValidator<U, Pol> {
    users: U,
    policy: Pol,
}

impl<U, Pol> PasswordChangeValidator<U, Pol>
where
    U: UserRepository,
    Pol: PasswordPolicy,
{
    pub fn new(users: U, policy: Pol) -> Self {
        Self { users, policy }
    }

    pub async fn validate(
        &self,
        input: PasswordChangeInput,
        actor: &User,
    ) -> RosterResult<ValidatedPasswordChange> {
        let mut errors = ValidationError::new();

        let current = required_str(
            &mut errors,
            "current_password",
            input.current_password.as_deref(),
        );
        let new = required_str(&mut errors, "new_password", input.new_password.as_deref());
        let confirm = required_str(
            &mut errors,
            "confirm_password",
            input.confirm_password.as_deref(),
        );

        if let Some(current) = current
            && !self.users.check_password(actor, current).await?
        {
            errors.add("current_password", CURRENT_PASSWORD_INCORRECT);
        }

        if let Some(new) = new
            && let Err(violations) = self
                .policy
                .check(new, Some(&PasswordContext::for_user(actor)))
        {
            errors.extend("new_password", violations);
        }

        if !errors.is_empty() {
            let fields: Vec<&str> = errors.fields().collect();
            debug!(user_id = %actor.id, ?fields, "Password change rejected");
            return Err(errors.into());
        }

        // Every field is present past this point.
        match (new, confirm) {
            (Some(new), Some(confirm)) if new == confirm => Ok(ValidatedPasswordChange {
                new_password: new.to_string(),
            }),
            _ => Err(ValidationError::field("confirm_password", NEW_PASSWORD_MISMATCH).into()),
        }
    }
}
