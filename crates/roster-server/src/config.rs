//! Environment-driven configuration.

use std::str::FromStr;

use roster_auth::AuthConfig;
use roster_db::DbConfig;
use thiserror::Error;

pub const DB_URL: &str = "ROSTER_DB_URL";
pub const DB_NAMESPACE: &str = "ROSTER_DB_NAMESPACE";
pub const DB_DATABASE: &str = "ROSTER_DB_DATABASE";
pub const DB_USERNAME: &str = "ROSTER_DB_USERNAME";
pub const DB_PASSWORD: &str = "ROSTER_DB_PASSWORD";
pub const PASSWORD_PEPPER: &str = "ROSTER_PASSWORD_PEPPER";
pub const MIN_PASSWORD_LENGTH: &str = "ROSTER_MIN_PASSWORD_LENGTH";

/// Source of environment variables.
///
/// Tests supply their own implementation instead of mutating the
/// process environment, which is shared between parallel tests.
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment.
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub db: DbConfig,
    pub auth: AuthConfig,
}

impl Settings {
    /// Start from defaults and override with whatever the environment
    /// provides. Empty values count as unset.
    pub fn from_env(env: &impl EnvironmentProvider) -> Result<Self, ConfigError> {
        let get = |key: &str| env.get_var(key).filter(|v| !v.is_empty());
        let mut settings = Self::default();

        if let Some(url) = get(DB_URL) {
            settings.db.url = url;
        }
        if let Some(namespace) = get(DB_NAMESPACE) {
            settings.db.namespace = namespace;
        }
        if let Some(database) = get(DB_DATABASE) {
            settings.db.database = database;
        }
        if let Some(username) = get(DB_USERNAME) {
            settings.db.username = username;
        }
        if let Some(password) = get(DB_PASSWORD) {
            settings.db.password = password;
        }

        settings.auth.pepper = get(PASSWORD_PEPPER);
        if let Some(raw) = get(MIN_PASSWORD_LENGTH) {
            settings.auth.min_password_length = parse_positive(MIN_PASSWORD_LENGTH, raw)?;
        }

        Ok(settings)
    }
}

fn parse_positive<T: FromStr + PartialOrd + Default>(
    key: &'static str,
    raw: String,
) -> Result<T, ConfigError> {
    match raw.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(ConfigError::InvalidNumber { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct MockEnvironment {
        vars: HashMap<String, String>,
    }

    impl MockEnvironment {
        fn with_vars(vars: &[(&str, &str)]) -> Self {
            Self {
                vars: vars
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }
        }
    }

    impl EnvironmentProvider for MockEnvironment {
        fn get_var(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }
    }

    #[test]
    fn defaults_without_environment() {
        let settings = Settings::from_env(&MockEnvironment::with_vars(&[])).unwrap();
        assert_eq!(settings.db.url, "127.0.0.1:8000");
        assert_eq!(settings.db.namespace, "roster");
        assert_eq!(settings.auth.min_password_length, 8);
        assert!(settings.auth.pepper.is_none());
    }

    #[test]
    fn environment_overrides_defaults() {
        let env = MockEnvironment::with_vars(&[
            (DB_URL, "db.internal:8000"),
            (DB_DATABASE, "users"),
            (PASSWORD_PEPPER, "s3cret"),
            (MIN_PASSWORD_LENGTH, "12"),
        ]);
        let settings = Settings::from_env(&env).unwrap();
        assert_eq!(settings.db.url, "db.internal:8000");
        assert_eq!(settings.db.database, "users");
        assert_eq!(settings.db.namespace, "roster");
        assert_eq!(settings.auth.pepper.as_deref(), Some("s3cret"));
        assert_eq!(settings.auth.min_password_length, 12);
    }

    #[test]
    fn empty_values_are_ignored() {
        let env = MockEnvironment::with_vars(&[(DB_URL, ""), (PASSWORD_PEPPER, "")]);
        let settings = Settings::from_env(&env).unwrap();
        assert_eq!(settings.db.url, "127.0.0.1:8000");
        assert!(settings.auth.pepper.is_none());
    }

    #[test]
    fn invalid_length_is_rejected() {
        for bad in ["zero", "0", "-3"] {
            let env = MockEnvironment::with_vars(&[(MIN_PASSWORD_LENGTH, bad)]);
            let err = Settings::from_env(&env).unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidNumber {
                    key: MIN_PASSWORD_LENGTH,
                    ..
                }
            ));
        }
    }
}
