//! Identity Store startup: connect, migrate, and hand out repositories.

use std::fmt;

use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::{Connection, Surreal};
use tracing::info;

use crate::error::DbError;
use crate::repository::{
    SurrealPermissionRepository, SurrealRoleRepository, SurrealUserRepository,
};
use crate::schema::run_migrations;

/// Where the Identity Store lives and how to sign in to it.
#[derive(Clone)]
pub struct DbConfig {
    /// WebSocket address (e.g., `127.0.0.1:8000`).
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "roster".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("url", &self.url)
            .field("namespace", &self.namespace)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// A migrated Identity Store.
///
/// Every repository handed out shares the one underlying connection.
#[derive(Clone)]
pub struct DbManager<C: Connection = Client> {
    db: Surreal<C>,
}

impl DbManager<Client> {
    /// Sign in as root over WebSocket, select the configured namespace
    /// and database, then apply pending migrations.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to Identity Store"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        Self::open(db).await
    }
}

impl<C: Connection> DbManager<C> {
    /// Take over an already-selected connection and bring its schema up
    /// to date.
    pub async fn open(db: Surreal<C>) -> Result<Self, DbError> {
        run_migrations(&db).await?;
        info!("Identity Store ready");
        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<C> {
        &self.db
    }

    pub fn users(&self, pepper: Option<String>) -> SurrealUserRepository<C> {
        match pepper {
            Some(pepper) => SurrealUserRepository::with_pepper(self.db.clone(), pepper),
            None => SurrealUserRepository::new(self.db.clone()),
        }
    }

    pub fn roles(&self) -> SurrealRoleRepository<C> {
        SurrealRoleRepository::new(self.db.clone())
    }

    pub fn permissions(&self) -> SurrealPermissionRepository<C> {
        SurrealPermissionRepository::new(self.db.clone())
    }
}
