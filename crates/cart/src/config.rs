//! Cart engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CART_DATABASE_URL` - Postgres connection string (falls back to
//!   `DATABASE_URL`)
//!
//! ## Optional
//! - `CART_DB_MAX_CONNECTIONS` - Pool ceiling (default: 10)
//! - `CART_DB_MIN_CONNECTIONS` - Pool floor (default: 2)

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart engine configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Postgres connection URL (contains password).
    pub database_url: SecretString,
    /// Connection pool ceiling.
    pub max_connections: u32,
    /// Connection pool floor.
    pub min_connections: u32,
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: get_database_url("CART_DATABASE_URL")?,
            max_connections: get_parsed_or_default("CART_DB_MAX_CONNECTIONS", 10)?,
            min_connections: get_parsed_or_default("CART_DB_MIN_CONNECTIONS", 2)?,
        })
    }
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an environment variable parsed as `u32`, defaulted when unset.
fn get_parsed_or_default(key: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_var_error_names_the_variable() {
        let err = ConfigError::MissingEnvVar("CART_DATABASE_URL".to_string());
        assert_eq!(
            err.to_string(),
            "Missing environment variable: CART_DATABASE_URL"
        );
    }

    #[test]
    fn unset_pool_size_uses_default() {
        let value = get_parsed_or_default("GREENGROCER_TEST_UNSET_POOL", 10).expect("default");
        assert_eq!(value, 10);
    }
}
