//! SurrealDB implementation of [`RoleRepository`].

use chrono::{DateTime, Utc};
use roster_core::error::RosterResult;
use roster_core::models::role::{CreateRole, Role, RoleAssignment};
use roster_core::repository::RoleRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid, statement_error};

#[derive(Debug, SurrealValue)]
struct RoleRow {
    name: String,
    description: String,
    created_at: DateTime<Utc>,
}

impl RoleRow {
    fn into_role(self, id: Uuid) -> Role {
        Role {
            id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
        }
    }
}

/// A `has_role` edge projected with the role's record id.
#[derive(Debug, SurrealValue)]
struct AssignmentRow {
    role_id: String,
    is_active: bool,
    assigned_at: DateTime<Utc>,
}

impl AssignmentRow {
    fn try_into_assignment(self, user_id: Uuid) -> Result<RoleAssignment, DbError> {
        Ok(RoleAssignment {
            user_id,
            role_id: parse_uuid(&self.role_id, "role")?,
            is_active: self.is_active,
            assigned_at: self.assigned_at,
        })
    }
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn get_assignment(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<RoleAssignment, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(out) AS role_id, is_active, assigned_at \
                 FROM has_role \
                 WHERE in = type::record('user', $user_id) \
                 AND out = type::record('role', $role_id)",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .await?;

        let rows: Vec<AssignmentRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role_assignment".into(),
            id: format!("{user_id}->{role_id}"),
        })?;

        row.try_into_assignment(user_id)
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> RosterResult<Role> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('role', $id) SET \
                 name = $name, description = $description",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| statement_error("role", e))?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        Ok(row.into_role(id))
    }

    async fn get_by_id(&self, id: Uuid) -> RosterResult<Role> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('role', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        Ok(row.into_role(id))
    }

    async fn assign_to_user(&self, user_id: Uuid, role_id: Uuid) -> RosterResult<RoleAssignment> {
        let user_id_str = user_id.to_string();
        let role_id_str = role_id.to_string();

        let query = format!(
            "RELATE user:`{user_id_str}` -> has_role -> role:`{role_id_str}` \
             SET is_active = true;"
        );

        self.db
            .query(query)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| statement_error("has_role", e))?;

        info!(user_id = %user_id, role_id = %role_id, "Role assigned");
        Ok(self.get_assignment(user_id, role_id).await?)
    }

    async fn set_assignment_active(
        &self,
        user_id: Uuid,
        role_id: Uuid,
        is_active: bool,
    ) -> RosterResult<RoleAssignment> {
        self.db
            .query(
                "UPDATE has_role SET is_active = $is_active \
                 WHERE in = type::record('user', $user_id) \
                 AND out = type::record('role', $role_id)",
            )
            .bind(("is_active", is_active))
            .bind(("user_id", user_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| statement_error("has_role", e))?;

        let assignment = self.get_assignment(user_id, role_id).await?;
        info!(user_id = %user_id, role_id = %role_id, is_active, "Role assignment updated");
        Ok(assignment)
    }

    async fn get_user_assignments(&self, user_id: Uuid) -> RosterResult<Vec<RoleAssignment>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(out) AS role_id, is_active, assigned_at \
                 FROM has_role \
                 WHERE in = type::record('user', $user_id) \
                 ORDER BY assigned_at ASC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssignmentRow> = result.take(0).map_err(DbError::from)?;

        let assignments = rows
            .into_iter()
            .map(|row| row.try_into_assignment(user_id))
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(assignments)
    }
}
