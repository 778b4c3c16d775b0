//! SurrealDB implementation of [`PermissionRepository`] and
//! [`PermissionSource`].

use chrono::{DateTime, Utc};
use roster_core::error::RosterResult;
use roster_core::models::permission::{CreatePermission, Permission};
use roster_core::models::user::User;
use roster_core::repository::{PermissionRepository, PermissionSource};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid, statement_error};

#[derive(Debug, SurrealValue)]
struct PermissionRow {
    code: String,
    name: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct PermissionRowWithId {
    record_id: String,
    code: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl PermissionRowWithId {
    fn try_into_permission(self) -> Result<Permission, DbError> {
        Ok(Permission {
            id: parse_uuid(&self.record_id, "permission")?,
            code: self.code,
            name: self.name,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Permission repository.
#[derive(Clone)]
pub struct SurrealPermissionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn codes(&self, query: &'static str, user: &User) -> Result<Vec<String>, DbError> {
        let mut result = self
            .db
            .query(query)
            .bind(("user_id", user.id.to_string()))
            .await?;

        let codes: Vec<String> = result.take(0)?;
        Ok(codes)
    }
}

impl<C: Connection> PermissionRepository for SurrealPermissionRepository<C> {
    async fn create(&self, input: CreatePermission) -> RosterResult<Permission> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('permission', $id) SET \
                 code = $code, name = $name",
            )
            .bind(("id", id_str.clone()))
            .bind(("code", input.code))
            .bind(("name", input.name))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| statement_error("permission", e))?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "permission".into(),
            id: id_str,
        })?;

        Ok(Permission {
            id,
            code: row.code,
            name: row.name,
            created_at: row.created_at,
        })
    }

    async fn get_by_code(&self, code: &str) -> RosterResult<Permission> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM permission WHERE code = $code")
            .bind(("code", code.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "permission".into(),
            id: format!("code={code}"),
        })?;

        Ok(row.try_into_permission()?)
    }

    async fn grant_to_role(&self, role_id: Uuid, permission_id: Uuid) -> RosterResult<()> {
        let role_id_str = role_id.to_string();
        let perm_id_str = permission_id.to_string();

        let query = format!("RELATE role:`{role_id_str}` -> grants -> permission:`{perm_id_str}`;");

        self.db
            .query(query)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| statement_error("grants", e))?;

        info!(role_id = %role_id, permission_id = %permission_id, "Permission granted to role");
        Ok(())
    }

    async fn grant_to_user(&self, user_id: Uuid, permission_id: Uuid) -> RosterResult<()> {
        let user_id_str = user_id.to_string();
        let perm_id_str = permission_id.to_string();

        let query = format!(
            "RELATE user:`{user_id_str}` -> has_permission -> permission:`{perm_id_str}`;"
        );

        self.db
            .query(query)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| statement_error("has_permission", e))?;

        info!(user_id = %user_id, permission_id = %permission_id, "Permission granted to user");
        Ok(())
    }

    async fn get_role_permissions(&self, role_id: Uuid) -> RosterResult<Vec<Permission>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE id IN (\
                     SELECT VALUE out FROM grants \
                     WHERE in = type::record('role', $role_id)\
                 )",
            )
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;

        let permissions = rows
            .into_iter()
            .map(|row| row.try_into_permission())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(permissions)
    }
}

impl<C: Connection> PermissionSource for SurrealPermissionRepository<C> {
    async fn direct_codes(&self, user: &User) -> RosterResult<Vec<String>> {
        let codes = self
            .codes(
                "SELECT VALUE code FROM permission \
                 WHERE id IN (\
                     SELECT VALUE out FROM has_permission \
                     WHERE in = type::record('user', $user_id)\
                 )",
                user,
            )
            .await?;
        Ok(codes)
    }

    async fn active_role_codes(&self, user: &User) -> RosterResult<Vec<String>> {
        let codes = self
            .codes(
                "SELECT VALUE code FROM permission \
                 WHERE id IN (\
                     SELECT VALUE out FROM grants \
                     WHERE in IN (\
                         SELECT VALUE out FROM has_role \
                         WHERE in = type::record('user', $user_id) \
                         AND is_active = true\
                     )\
                 )",
                user,
            )
            .await?;
        Ok(codes)
    }
}
