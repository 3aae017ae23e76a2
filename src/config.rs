//! Service configuration.
//!
//! Built once at startup and injected into the application state; request
//! handlers never read the process environment.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Environment variable names.
pub mod env {
    /// HTTP listen port.
    pub const PORT: &str = "LEXDRAFT_PORT";
    /// `SQLite` database path.
    pub const DB_PATH: &str = "LEXDRAFT_DB_PATH";
    /// Gemini API key.
    pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
    /// Gemini model name.
    pub const GEMINI_MODEL: &str = "LEXDRAFT_GEMINI_MODEL";
    /// Gemini API base URL.
    pub const GEMINI_URL: &str = "LEXDRAFT_GEMINI_URL";
    /// Directory for uploaded media.
    pub const MEDIA_DIR: &str = "LEXDRAFT_MEDIA_DIR";
    /// Public base URL used to build absolute media links.
    pub const PUBLIC_URL: &str = "LEXDRAFT_PUBLIC_URL";
    /// Maximum signature upload size in bytes.
    pub const MAX_UPLOAD_BYTES: &str = "LEXDRAFT_MAX_UPLOAD_BYTES";
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// An environment variable could not be parsed.
    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Top-level service configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Generative model settings.
    pub gemini: GeminiConfig,
    /// Upload settings.
    pub uploads: UploadConfig,
}

impl AppConfig {
    /// Create a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from process environment variables.
    ///
    /// # Errors
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(port) = get(env::PORT) {
            config.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: env::PORT,
                value: port,
            })?;
        }
        if let Some(path) = get(env::DB_PATH) {
            config.storage.sqlite_path = PathBuf::from(path);
        }
        if let Some(key) = get(env::GEMINI_API_KEY) {
            config.gemini.api_key = Some(key);
        }
        if let Some(model) = get(env::GEMINI_MODEL) {
            config.gemini.model = model;
        }
        if let Some(base_url) = get(env::GEMINI_URL) {
            config.gemini.base_url = base_url;
        }
        if let Some(dir) = get(env::MEDIA_DIR) {
            config.uploads.media_dir = PathBuf::from(dir);
        }
        if let Some(public) = get(env::PUBLIC_URL) {
            config.uploads.public_base_url = Some(public);
        }
        if let Some(max) = get(env::MAX_UPLOAD_BYTES) {
            config.uploads.max_bytes = max.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: env::MAX_UPLOAD_BYTES,
                value: max,
            })?;
        }

        Ok(config)
    }

    /// Set the listen port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.server.port = port;
        self
    }

    /// Set the Gemini API key.
    #[must_use]
    pub fn with_gemini_api_key(mut self, key: impl Into<String>) -> Self {
        self.gemini.api_key = Some(key.into());
        self
    }

    /// Set the media directory.
    #[must_use]
    pub fn with_media_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.uploads.media_dir = dir.into();
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be > 0".to_string()));
        }

        if self.gemini.model.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "gemini.model must not be empty".to_string(),
            ));
        }

        Url::parse(&self.gemini.base_url)?;

        if self.gemini.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "gemini.request_timeout must be > 0".to_string(),
            ));
        }

        if self.uploads.max_bytes == 0 {
            return Err(ConfigError::Invalid(
                "uploads.max_bytes must be > 0".to_string(),
            ));
        }

        if let Some(public) = &self.uploads.public_base_url {
            Url::parse(public)?;
        }

        Ok(())
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen port (binds `0.0.0.0`).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

/// Storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("lexdraft.sqlite3"),
        }
    }
}

/// Gemini API settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key; chat requests fail with a server error while unset.
    pub api_key: Option<String>,
    /// Model name, without the `models/` prefix.
    pub model: String,
    /// API base URL.
    pub base_url: String,
    /// Connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash-lite".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Signature upload settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory served under `/media`.
    pub media_dir: PathBuf,
    /// Prefix for returned URLs; root-relative links when unset.
    pub public_base_url: Option<String>,
    /// Maximum accepted file size in bytes.
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from("media"),
            public_base_url: None,
            max_bytes: 5 * 1024 * 1024, // 5 MiB
        }
    }
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert!(config.gemini.api_key.is_none());
        assert_eq!(config.uploads.max_bytes, 5 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_reads_variables() {
        let config = AppConfig::from_lookup(lookup(&[
            (env::PORT, "9100"),
            (env::GEMINI_API_KEY, "secret"),
            (env::GEMINI_MODEL, "gemini-2.5-pro"),
            (env::MEDIA_DIR, "/tmp/media"),
            (env::PUBLIC_URL, "https://docs.example.com"),
            (env::MAX_UPLOAD_BYTES, "1024"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.gemini.api_key.as_deref(), Some("secret"));
        assert_eq!(config.gemini.model, "gemini-2.5-pro");
        assert_eq!(config.uploads.media_dir, PathBuf::from("/tmp/media"));
        assert_eq!(
            config.uploads.public_base_url.as_deref(),
            Some("https://docs.example.com")
        );
        assert_eq!(config.uploads.max_bytes, 1024);
    }

    #[test]
    fn test_blank_api_key_counts_as_unset() {
        let config = AppConfig::from_lookup(lookup(&[(env::GEMINI_API_KEY, "  ")])).unwrap();
        assert!(config.gemini.api_key.is_none());
    }

    #[test]
    fn test_unparsable_port_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[(env::PORT, "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name, .. } if name == env::PORT));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(AppConfig::new().with_port(0).validate().is_err());

        let mut config = AppConfig::default();
        config.gemini.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.uploads.max_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = AppConfig::new()
            .with_port(3000)
            .with_gemini_api_key("k")
            .with_media_dir("uploads");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.gemini.api_key.as_deref(), Some("k"));
        assert_eq!(config.uploads.media_dir, PathBuf::from("uploads"));
    }
}
