// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// Signing key for session tokens (raw bytes)
    pub session_signing_key: Vec<u8>,
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// SQLite database path
    pub database_path: String,
    /// Directory where attachment uploads are stored
    pub upload_dir: String,
    /// Server port
    pub port: u16,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            google_client_id: "test_client_id".to_string(),
            google_client_secret: "test_secret".to_string(),
            session_signing_key: b"test_session_key_32_bytes_min!!!".to_vec(),
            frontend_url: "http://localhost:5173".to_string(),
            database_path: ":memory:".to_string(),
            upload_dir: "uploads".to_string(),
            port: 3000,
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            session_signing_key: env::var("SESSION_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("SESSION_SIGNING_KEY"))?
                .into_bytes(),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            database_path: env::var("DB_PATH").unwrap_or_else(|_| "health.db".to_string()),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("GOOGLE_CLIENT_ID", "test_id");
        env::set_var("GOOGLE_CLIENT_SECRET", "test_secret");
        env::set_var("SESSION_SIGNING_KEY", "test_session_key_32_bytes_min!!!");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.google_client_id, "test_id");
        assert_eq!(config.google_client_secret, "test_secret");
        assert_eq!(config.port, 3000);
    }
}
