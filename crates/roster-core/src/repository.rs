//! Identity Store trait definitions.
//!
//! All repository operations are async. The API layer is generic over
//! these traits so it has no dependency on the database crate.

use uuid::Uuid;

use crate::error::RosterResult;
use crate::models::{
    permission::{CreatePermission, Permission},
    role::{CreateRole, Role, RoleAssignment},
    user::{CreateUser, UpdateUser, User},
};

pub trait UserRepository: Send + Sync {
    /// Create a user. The raw password in `input` is hashed by the store.
    fn create(&self, input: CreateUser) -> impl Future<Output = RosterResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = RosterResult<User>> + Send;
    fn get_by_username(&self, username: &str)
    -> impl Future<Output = RosterResult<User>> + Send;
    /// Apply a partial update of profile attributes.
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = RosterResult<User>> + Send;
    /// Hash `password` and replace the stored credential.
    fn set_password(
        &self,
        id: Uuid,
        password: &str,
    ) -> impl Future<Output = RosterResult<()>> + Send;
    /// Verify `password` against the user's stored credential.
    fn check_password(
        &self,
        user: &User,
        password: &str,
    ) -> impl Future<Output = RosterResult<bool>> + Send;
    /// Stamp `last_login` with the current time.
    fn record_login(&self, id: Uuid) -> impl Future<Output = RosterResult<()>> + Send;
    fn set_two_factor(
        &self,
        id: Uuid,
        enabled: bool,
    ) -> impl Future<Output = RosterResult<()>> + Send;
    /// Replace the user's backup codes with a fresh set and return it.
    fn regenerate_backup_codes(
        &self,
        id: Uuid,
    ) -> impl Future<Output = RosterResult<Vec<String>>> + Send;
}

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = RosterResult<Role>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = RosterResult<Role>> + Send;

    /// Assign a role to a user. New assignments are active.
    fn assign_to_user(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = RosterResult<RoleAssignment>> + Send;

    /// Activate or deactivate an existing assignment.
    fn set_assignment_active(
        &self,
        user_id: Uuid,
        role_id: Uuid,
        is_active: bool,
    ) -> impl Future<Output = RosterResult<RoleAssignment>> + Send;

    /// All assignments of a user, active or not.
    fn get_user_assignments(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = RosterResult<Vec<RoleAssignment>>> + Send;
}

pub trait PermissionRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePermission,
    ) -> impl Future<Output = RosterResult<Permission>> + Send;
    fn get_by_code(&self, code: &str) -> impl Future<Output = RosterResult<Permission>> + Send;

    fn grant_to_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = RosterResult<()>> + Send;

    /// Grant a permission directly to a user, bypassing roles.
    fn grant_to_user(
        &self,
        user_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = RosterResult<()>> + Send;

    fn get_role_permissions(
        &self,
        role_id: Uuid,
    ) -> impl Future<Output = RosterResult<Vec<Permission>>> + Send;
}

/// Read access to the permission codes that make up a user's effective
/// permission set.
pub trait PermissionSource: Send + Sync {
    /// Codes granted directly to the user.
    fn direct_codes(&self, user: &User) -> impl Future<Output = RosterResult<Vec<String>>> + Send;

    /// Codes granted through the user's active role assignments.
    fn active_role_codes(
        &self,
        user: &User,
    ) -> impl Future<Output = RosterResult<Vec<String>>> + Send;
}
