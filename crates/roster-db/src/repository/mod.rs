//! SurrealDB repository implementations.

mod permission;
mod role;
mod user;

pub use permission::SurrealPermissionRepository;
pub use role::SurrealRoleRepository;
pub use user::{BACKUP_CODE_COUNT, SurrealUserRepository};
