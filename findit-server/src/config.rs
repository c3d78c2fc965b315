use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use findit_core::DEFAULT_ROUND_SECONDS;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub round_seconds: u32,
    pub jwt_secret: String,
    pub token_ttl_seconds: u64,
    pub blob_directory: PathBuf,
    pub public_base_url: String,
    pub label_detection_url: String,
    pub challenges_file: PathBuf,
    pub session_retention_seconds: u64,
    pub session_idle_timeout_seconds: u64,
}

impl Config {
    /// Read every setting from the environment, falling back to the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port)?,
            round_seconds: parse_var("ROUND_SECONDS", defaults.round_seconds)?,
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            token_ttl_seconds: parse_var("TOKEN_TTL_SECONDS", defaults.token_ttl_seconds)?,
            blob_directory: env::var("BLOB_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or(defaults.blob_directory),
            public_base_url: env::var("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),
            label_detection_url: env::var("LABEL_DETECTION_URL")
                .unwrap_or(defaults.label_detection_url),
            challenges_file: env::var("CHALLENGES_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.challenges_file),
            session_retention_seconds: parse_var(
                "SESSION_RETENTION_SECONDS",
                defaults.session_retention_seconds,
            )?,
            session_idle_timeout_seconds: parse_var(
                "SESSION_IDLE_TIMEOUT_SECONDS",
                defaults.session_idle_timeout_seconds,
            )?,
        })
    }

    pub fn session_retention(&self) -> Duration {
        Duration::from_secs(self.session_retention_seconds)
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            round_seconds: DEFAULT_ROUND_SECONDS,
            jwt_secret: "findit-dev-secret".to_string(),
            token_ttl_seconds: 7 * 24 * 3600,
            blob_directory: PathBuf::from("./blobs"),
            public_base_url: "http://127.0.0.1:8080".to_string(),
            label_detection_url: "http://127.0.0.1:5001/detectar-etiquetas".to_string(),
            challenges_file: PathBuf::from("./data/challenges.json"),
            session_retention_seconds: 600,
            session_idle_timeout_seconds: 1800,
        }
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}
