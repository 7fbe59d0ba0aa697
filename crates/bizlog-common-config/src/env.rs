//! Environment variable handling.

use std::env;
use thiserror::Error;

/// Environment variable errors.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("failed to load .env file: {0}")]
    DotenvError(#[from] dotenvy::Error),
}

/// Environment variable names.
pub mod vars {
    // Configuration
    pub const BIZLOG_CONFIG_DIR: &str = "BIZLOG_CONFIG_DIR";
    pub const BIZLOG_ENV: &str = "BIZLOG_ENV";

    // Dispatcher overrides
    pub const BIZLOG_POOL_SIZE: &str = "BIZLOG_POOL_SIZE";
    pub const BIZLOG_QUEUE_CAPACITY: &str = "BIZLOG_QUEUE_CAPACITY";

    // Logging
    pub const BIZLOG_LOG_LEVEL: &str = "BIZLOG_LOG_LEVEL";
    pub const BIZLOG_LOG_FORMAT: &str = "BIZLOG_LOG_FORMAT";
    pub const BIZLOG_LOG_FILE: &str = "BIZLOG_LOG_FILE";
}

/// Environment configuration.
pub struct Environment {
    _guard: (),
}

impl Environment {
    /// Initialize environment from .env files.
    ///
    /// Loads `.env`, `.env.local`, then `.env.{BIZLOG_ENV}` when set.
    /// Variables already present in the process environment are never replaced.
    /// A missing file is skipped; a malformed one is an error.
    pub fn init() -> Result<Self, EnvError> {
        load_optional(".env")?;
        load_optional(".env.local")?;

        if let Ok(profile) = env::var(vars::BIZLOG_ENV) {
            load_optional(&format!(".env.{}", profile))?;
        }

        Ok(Self { _guard: () })
    }

    /// Get an optional string variable.
    pub fn get(var: &str) -> Option<String> {
        env::var(var).ok()
    }

    /// Get an integer variable.
    pub fn get_int<T: std::str::FromStr>(var: &str) -> Result<Option<T>, EnvError> {
        match env::var(var) {
            Ok(v) => v.trim().parse().map(Some).map_err(|_| EnvError::InvalidValue {
                var: var.to_string(),
                message: format!("expected integer, got '{}'", v),
            }),
            Err(_) => Ok(None),
        }
    }
}

fn load_optional(file: &str) -> Result<(), EnvError> {
    match dotenvy::from_filename(file) {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing() {
        assert_eq!(Environment::get("BIZLOG_TEST_NONEXISTENT_12345"), None);
    }

    #[test]
    fn test_integer_parsing() {
        env::set_var("BIZLOG_TEST_INT", " 42 ");
        let val: Result<Option<usize>, _> = Environment::get_int("BIZLOG_TEST_INT");
        assert_eq!(val.unwrap(), Some(42));

        env::set_var("BIZLOG_TEST_INT", "many");
        let val: Result<Option<usize>, _> = Environment::get_int("BIZLOG_TEST_INT");
        assert!(matches!(val, Err(EnvError::InvalidValue { .. })));

        env::remove_var("BIZLOG_TEST_INT");
        let val: Result<Option<usize>, _> = Environment::get_int("BIZLOG_TEST_INT");
        assert_eq!(val.unwrap(), None);
    }

    #[test]
    fn test_environment_init_without_files() {
        assert!(Environment::init().is_ok());
    }

    #[test]
    fn test_dotenv_does_not_override_process_env() {
        use std::fs;
        use tempfile::tempdir;

        let dir = tempdir().unwrap();
        let env_path = dir.path().join(".env");
        fs::write(
            &env_path,
            "BIZLOG_TEST_DOTENV_NEW=from_dotenv\nBIZLOG_TEST_DOTENV_SET=from_dotenv\n",
        )
        .unwrap();

        env::remove_var("BIZLOG_TEST_DOTENV_NEW");
        env::set_var("BIZLOG_TEST_DOTENV_SET", "from_process");

        dotenvy::from_path(&env_path).unwrap();

        assert_eq!(
            Environment::get("BIZLOG_TEST_DOTENV_NEW"),
            Some("from_dotenv".to_string())
        );
        assert_eq!(
            Environment::get("BIZLOG_TEST_DOTENV_SET"),
            Some("from_process".to_string())
        );

        env::remove_var("BIZLOG_TEST_DOTENV_NEW");
        env::remove_var("BIZLOG_TEST_DOTENV_SET");
    }
}
