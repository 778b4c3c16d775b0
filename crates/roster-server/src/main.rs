//! Roster server entry point.
//!
//! Loads configuration from the environment, connects to SurrealDB,
//! applies pending migrations and assembles the user mapper and
//! password-change validator for the routing layer.

mod config;

use roster_api::{PasswordChangeValidator, UserMapper};
use roster_auth::DefaultPasswordPolicy;
use roster_db::DbManager;
use roster_db::repository::{SurrealPermissionRepository, SurrealUserRepository};
use surrealdb::engine::remote::ws::Client;
use tracing_subscriber::EnvFilter;

use crate::config::{Settings, SystemEnvironment};

/// Components shared by request handlers.
pub struct AppState {
    pub users: UserMapper<
        SurrealUserRepository<Client>,
        SurrealPermissionRepository<Client>,
        DefaultPasswordPolicy,
    >,
    pub password_change:
        PasswordChangeValidator<SurrealUserRepository<Client>, DefaultPasswordPolicy>,
}

impl AppState {
    fn new(db: &DbManager, settings: &Settings) -> Self {
        let user_repo = db.users(settings.auth.pepper.clone());
        let permission_repo = db.permissions();

        Self {
            users: UserMapper::new(
                user_repo.clone(),
                permission_repo,
                DefaultPasswordPolicy::new(&settings.auth),
            ),
            password_change: PasswordChangeValidator::new(
                user_repo,
                DefaultPasswordPolicy::new(&settings.auth),
            ),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("roster=info".parse()?))
        .json()
        .init();

    tracing::info!("Starting Roster server...");

    let settings = Settings::from_env(&SystemEnvironment)?;
    tracing::info!(
        min_password_length = settings.auth.min_password_length,
        pepper = settings.auth.pepper.is_some(),
        "Configuration loaded"
    );

    let db = DbManager::connect(&settings.db).await?;
    let _state = AppState::new(&db, &settings);

    tokio::signal::ctrl_c().await?;

    tracing::info!("Roster server stopped.");
    Ok(())
}
