//! SurrealDB implementation of [`UserRepository`].
//!
//! Credentials are hashed with Argon2id (see `roster_auth::password`)
//! before they reach the database; the plaintext is never bound into a
//! query. An optional pepper can be provided at construction time.

use chrono::{DateTime, Utc};
use rand::Rng;
use roster_auth::password::{hash_password, verify_password};
use roster_core::error::RosterResult;
use roster_core::models::user::{CreateUser, UpdateUser, User, normalize_email};
use roster_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, parse_uuid, statement_error};

/// Number of backup codes issued per regeneration.
pub const BACKUP_CODE_COUNT: usize = 10;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct UserRow {
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    is_active: bool,
    is_staff: bool,
    is_superuser: bool,
    two_factor_enabled: bool,
    backup_codes: Vec<String>,
    created_by: Option<String>,
    date_joined: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    is_active: bool,
    is_staff: bool,
    is_superuser: bool,
    two_factor_enabled: bool,
    backup_codes: Vec<String>,
    created_by: Option<String>,
    date_joined: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, DbError> {
        let created_by = self
            .created_by
            .as_deref()
            .map(|s| parse_uuid(s, "created_by"))
            .transpose()?;
        Ok(User {
            id,
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password_hash: self.password_hash,
            is_active: self.is_active,
            is_staff: self.is_staff,
            is_superuser: self.is_superuser,
            two_factor_enabled: self.two_factor_enabled,
            backup_codes: self.backup_codes,
            created_by,
            date_joined: self.date_joined,
            last_login: self.last_login,
        })
    }
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        let id = parse_uuid(&self.record_id, "user")?;
        UserRow {
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password_hash: self.password_hash,
            is_active: self.is_active,
            is_staff: self.is_staff,
            is_superuser: self.is_superuser,
            two_factor_enabled: self.two_factor_enabled,
            backup_codes: self.backup_codes,
            created_by: self.created_by,
            date_joined: self.date_joined,
            last_login: self.last_login,
        }
        .into_user(id)
    }
}

fn generate_backup_codes() -> Vec<String> {
    let mut rng = rand::rng();
    (0..BACKUP_CODE_COUNT)
        .map(|_| {
            let bytes: [u8; 4] = rng.random();
            hex::encode(bytes)
        })
        .collect()
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
    /// Optional server-side pepper for password hashing.
    pepper: Option<String>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db, pepper: None }
    }

    pub fn with_pepper(db: Surreal<C>, pepper: String) -> Self {
        Self {
            db,
            pepper: Some(pepper),
        }
    }
}

/// Convert the single row an id-addressed statement returns.
fn single_user(rows: Vec<UserRow>, id: Uuid) -> Result<User, DbError> {
    let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
        entity: "user".into(),
        id: id.to_string(),
    })?;
    row.into_user(id)
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> RosterResult<User> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let password_hash = hash_password(&input.password, self.pepper.as_deref())
            .map_err(DbError::from)?;

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 username = $username, email = $email, \
                 first_name = $first_name, last_name = $last_name, \
                 password_hash = $password_hash, \
                 is_active = $is_active, is_staff = $is_staff, \
                 is_superuser = $is_superuser, \
                 two_factor_enabled = false, backup_codes = [], \
                 created_by = $created_by, last_login = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("username", input.username))
            .bind(("email", normalize_email(&input.email)))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind(("password_hash", password_hash))
            .bind(("is_active", input.is_active))
            .bind(("is_staff", input.is_staff))
            .bind(("is_superuser", input.is_superuser))
            .bind(("created_by", input.created_by.map(|u| u.to_string())))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| statement_error("user", e))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        let user = row.into_user(id)?;
        info!(user_id = %user.id, username = %user.username, "User created");
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> RosterResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?)
    }

    async fn get_by_username(&self, username: &str) -> RosterResult<User> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM user WHERE username = $username")
            .bind(("username", username.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: format!("username={username}"),
        })?;

        Ok(row.try_into_user()?)
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> RosterResult<User> {
        if input.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut sets = Vec::new();
        if input.username.is_some() {
            sets.push("username = $username");
        }
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        if input.is_staff.is_some() {
            sets.push("is_staff = $is_staff");
        }
        if input.is_superuser.is_some() {
            sets.push("is_superuser = $is_superuser");
        }

        let query = format!("UPDATE type::record('user', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));

        if let Some(username) = input.username {
            builder = builder.bind(("username", username));
        }
        if let Some(email) = input.email {
            builder = builder.bind(("email", normalize_email(&email)));
        }
        if let Some(first_name) = input.first_name {
            builder = builder.bind(("first_name", first_name));
        }
        if let Some(last_name) = input.last_name {
            builder = builder.bind(("last_name", last_name));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }
        if let Some(is_staff) = input.is_staff {
            builder = builder.bind(("is_staff", is_staff));
        }
        if let Some(is_superuser) = input.is_superuser {
            builder = builder.bind(("is_superuser", is_superuser));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| statement_error("user", e))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let user = single_user(rows, id)?;
        debug!(user_id = %id, fields = sets.len(), "User updated");
        Ok(user)
    }

    async fn set_password(&self, id: Uuid, password: &str) -> RosterResult<()> {
        let password_hash =
            hash_password(password, self.pepper.as_deref()).map_err(DbError::from)?;

        let mut result = self
            .db
            .query("UPDATE type::record('user', $id) SET password_hash = $password_hash")
            .bind(("id", id.to_string()))
            .bind(("password_hash", password_hash))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| statement_error("user", e))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        single_user(rows, id)?;

        info!(user_id = %id, "Password changed");
        Ok(())
    }

    async fn check_password(&self, user: &User, password: &str) -> RosterResult<bool> {
        let valid = verify_password(password, &user.password_hash, self.pepper.as_deref())
            .map_err(DbError::from)?;
        Ok(valid)
    }

    async fn record_login(&self, id: Uuid) -> RosterResult<()> {
        let mut result = self
            .db
            .query("UPDATE type::record('user', $id) SET last_login = time::now()")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        single_user(rows, id)?;
        Ok(())
    }

    async fn set_two_factor(&self, id: Uuid, enabled: bool) -> RosterResult<()> {
        // Disabling two-factor also invalidates outstanding backup codes.
        let query = if enabled {
            "UPDATE type::record('user', $id) SET two_factor_enabled = true"
        } else {
            "UPDATE type::record('user', $id) SET \
             two_factor_enabled = false, backup_codes = []"
        };

        let mut result = self
            .db
            .query(query)
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        single_user(rows, id)?;

        info!(user_id = %id, enabled, "Two-factor setting changed");
        Ok(())
    }

    async fn regenerate_backup_codes(&self, id: Uuid) -> RosterResult<Vec<String>> {
        let mut result = self
            .db
            .query("UPDATE type::record('user', $id) SET backup_codes = $backup_codes")
            .bind(("id", id.to_string()))
            .bind(("backup_codes", generate_backup_codes()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let user = single_user(rows, id)?;

        info!(user_id = %id, "Backup codes regenerated");
        Ok(user.backup_codes)
    }
}
