//! User representation mapping.
//!
//! [`UserMapper`] turns a stored [`User`] into its API representation
//! (including the derived permission list), validates incoming payloads,
//! and applies validated payloads to the Identity Store.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use roster_core::error::{RosterError, RosterResult};
use roster_core::models::permission::WILDCARD;
use roster_core::models::user::{CreateUser, UpdateUser, User};
use roster_core::policy::{PasswordContext, PasswordPolicy};
use roster_core::repository::{PermissionSource, UserRepository};
use roster_core::validation::{BLANK, REQUIRED, ValidationError, required_str};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const NAME_MAX_LENGTH: usize = 150;

const PASSWORD_MISMATCH: &str = "Password fields didn't match.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";
const USERNAME_INVALID: &str = "Enter a valid username. This value may contain only letters, \
                                numbers, and @/./+/-/_ characters.";
const EMAIL_INVALID: &str = "Enter a valid email address.";

/// Outgoing user payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRepresentation {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub two_factor_enabled: bool,
    pub backup_codes: Vec<String>,
    pub created_by: Option<Uuid>,
    pub permissions: Vec<String>,
}

impl UserRepresentation {
    fn new(user: &User, permissions: Vec<String>) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_active: user.is_active,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            date_joined: user.date_joined,
            last_login: user.last_login,
            two_factor_enabled: user.two_factor_enabled,
            backup_codes: user.backup_codes.clone(),
            created_by: user.created_by,
            permissions,
        }
    }
}

/// Incoming user payload.
///
/// Only writable fields exist here. System-derived fields (`id`,
/// `date_joined`, `last_login`, `two_factor_enabled`, `backup_codes`,
/// `created_by`, `permissions`) are dropped during deserialization.
#[derive(Clone, Default, Deserialize)]
pub struct UserInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub password2: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}

impl fmt::Debug for UserInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserInput")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .field("password2", &self.password2.as_ref().map(|_| "[redacted]"))
            .field("is_active", &self.is_active)
            .field("is_staff", &self.is_staff)
            .field("is_superuser", &self.is_superuser)
            .finish()
    }
}

/// Whether a payload creates a new user or updates `instance`.
#[derive(Debug, Clone, Copy)]
pub enum ValidationMode<'a> {
    Create,
    Update(&'a User),
}

/// A payload that passed [`UserMapper::validate`].
pub struct ValidatedUser {
    attrs: UpdateUser,
    password: Option<String>,
    password2: Option<String>,
}

impl ValidatedUser {
    /// The generic (non-credential) attributes.
    pub fn attrs(&self) -> &UpdateUser {
        &self.attrs
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }
}

impl fmt::Debug for ValidatedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedUser")
            .field("attrs", &self.attrs)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .field("password2", &self.password2.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Maps users to and from their API representation.
pub struct UserMapper<U, P, Pol> {
    users: U,
    permissions: P,
    policy: Pol,
}

impl<U, P, Pol> UserMapper<U, P, Pol>
where
    U: UserRepository,
    P: PermissionSource,
    Pol: PasswordPolicy,
{
    pub fn new(users: U, permissions: P, policy: Pol) -> Self {
        Self {
            users,
            permissions,
            policy,
        }
    }

    /// Build the outgoing representation of `user`.
    pub async fn serialize(&self, user: &User) -> RosterResult<UserRepresentation> {
        let permissions = self.effective_permissions(user).await?;
        Ok(UserRepresentation::new(user, permissions))
    }

    /// `["*"]` for superusers, otherwise the deduplicated union of direct
    /// and active-role permission codes in sorted order.
    pub async fn effective_permissions(&self, user: &User) -> RosterResult<Vec<String>> {
        if user.is_superuser {
            return Ok(vec![WILDCARD.to_string()]);
        }
        let direct = self.permissions.direct_codes(user).await?;
        let via_roles = self.permissions.active_role_codes(user).await?;
        Ok(union_codes(direct, via_roles))
    }

    /// Validate an incoming payload.
    ///
    /// Field-level problems are collected first and reported together;
    /// the `password`/`password2` comparison only runs once every field
    /// is individually valid.
    pub async fn validate(
        &self,
        input: UserInput,
        mode: ValidationMode<'_>,
    ) -> RosterResult<ValidatedUser> {
        let mut errors = ValidationError::new();
        let creating = matches!(mode, ValidationMode::Create);

        let username = check_str(&mut errors, "username", input.username.as_deref(), creating);
        let password = check_str(&mut errors, "password", input.password.as_deref(), creating);
        check_str(&mut errors, "password2", input.password2.as_deref(), creating);

        if let Some(username) = username {
            self.check_username(&mut errors, username, mode).await?;
        }
        if let Some(email) = input.email.as_deref()
            && !email.is_empty()
            && !is_valid_email(email)
        {
            errors.add("email", EMAIL_INVALID);
        }
        for (field, value) in [("first_name", &input.first_name), ("last_name", &input.last_name)] {
            if value
                .as_deref()
                .is_some_and(|v| v.chars().count() > NAME_MAX_LENGTH)
            {
                errors.add(field, max_length_message(NAME_MAX_LENGTH));
            }
        }

        if let Some(password) = password {
            let instance = match mode {
                ValidationMode::Update(user) => Some(user),
                ValidationMode::Create => None,
            };
            let context = PasswordContext {
                username: input
                    .username
                    .as_deref()
                    .or(instance.map(|u| u.username.as_str())),
                email: input.email.as_deref().or(instance.map(|u| u.email.as_str())),
                first_name: input
                    .first_name
                    .as_deref()
                    .or(instance.map(|u| u.first_name.as_str())),
                last_name: input
                    .last_name
                    .as_deref()
                    .or(instance.map(|u| u.last_name.as_str())),
            };
            if let Err(violations) = self.policy.check(password, Some(&context)) {
                errors.extend("password", violations);
            }
        }

        if !errors.is_empty() {
            let fields: Vec<&str> = errors.fields().collect();
            debug!(?fields, "User payload rejected");
            return Err(errors.into());
        }

        if let (Some(password), Some(password2)) = (&input.password, &input.password2)
            && password != password2
        {
            return Err(ValidationError::field("password", PASSWORD_MISMATCH).into());
        }

        Ok(ValidatedUser {
            attrs: UpdateUser {
                username: input.username,
                email: input.email,
                first_name: input.first_name,
                last_name: input.last_name,
                is_active: input.is_active,
                is_staff: input.is_staff,
                is_superuser: input.is_superuser,
            },
            password: input.password,
            password2: input.password2,
        })
    }

    /// Create a user from a validated payload, owned by `actor`.
    pub async fn create(&self, validated: ValidatedUser, actor: &User) -> RosterResult<User> {
        let ValidatedUser {
            attrs,
            password,
            password2: _,
        } = validated;

        let password = password.ok_or_else(|| ValidationError::field("password", REQUIRED))?;
        let username = attrs
            .username
            .ok_or_else(|| ValidationError::field("username", REQUIRED))?;

        let input = CreateUser {
            username,
            email: attrs.email.unwrap_or_default(),
            password,
            first_name: attrs.first_name.unwrap_or_default(),
            last_name: attrs.last_name.unwrap_or_default(),
            is_active: attrs.is_active.unwrap_or(true),
            is_staff: attrs.is_staff.unwrap_or(false),
            is_superuser: attrs.is_superuser.unwrap_or(false),
            created_by: Some(actor.id),
        };

        let user = self.users.create(input).await.map_err(username_conflict)?;
        info!(user_id = %user.id, created_by = %actor.id, "User created via API");
        Ok(user)
    }

    /// Apply a validated payload to `user`.
    ///
    /// The attributes are written first. A supplied password goes through
    /// `set_password` only once that write has succeeded, so a rejected
    /// attribute update leaves the stored credential untouched.
    pub async fn update(&self, user: &User, validated: ValidatedUser) -> RosterResult<User> {
        let ValidatedUser {
            attrs,
            password,
            password2: _,
        } = validated;

        let updated = self
            .users
            .update(user.id, attrs)
            .await
            .map_err(username_conflict)?;

        let Some(password) = password else {
            debug!(user_id = %user.id, "User updated via API");
            return Ok(updated);
        };

        self.users.set_password(user.id, &password).await?;
        debug!(user_id = %user.id, "User and password updated via API");
        self.users.get_by_id(user.id).await
    }

    async fn check_username(
        &self,
        errors: &mut ValidationError,
        username: &str,
        mode: ValidationMode<'_>,
    ) -> RosterResult<()> {
        if username.chars().count() > USERNAME_MAX_LENGTH {
            errors.add("username", max_length_message(USERNAME_MAX_LENGTH));
        }
        if !is_valid_username(username) {
            errors.add("username", USERNAME_INVALID);
        }

        match self.users.get_by_username(username).await {
            Ok(existing) => {
                let is_self = matches!(mode, ValidationMode::Update(u) if u.id == existing.id);
                if !is_self {
                    errors.add("username", USERNAME_TAKEN);
                }
                Ok(())
            }
            Err(RosterError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Presence and blank checks for a string field. Returns the value
/// only when present and non-blank.
fn check_str<'a>(
    errors: &mut ValidationError,
    field: &str,
    value: Option<&'a str>,
    required: bool,
) -> Option<&'a str> {
    if required {
        return required_str(errors, field, value);
    }
    match value {
        Some("") => {
            errors.add(field, BLANK);
            None
        }
        other => other,
    }
}

/// A username taken between validation and the write reads the same as
/// one caught during validation.
fn username_conflict(err: RosterError) -> RosterError {
    match err {
        RosterError::AlreadyExists { entity } if entity == "user" => {
            ValidationError::field("username", USERNAME_TAKEN).into()
        }
        other => other,
    }
}

fn max_length_message(max: usize) -> String {
    format!("Ensure this field has no more than {max} characters.")
}

/// Letters, digits and `@ . + - _`.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

/// A single `@` separating a non-empty local part from a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

/// Deduplicated union of two code lists, sorted.
pub fn union_codes(direct: Vec<String>, via_roles: Vec<String>) -> Vec<String> {
    direct
        .into_iter()
        .chain(via_roles)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
