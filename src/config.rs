//! Configuration management for Drive Relay Server

use std::env;
use std::time::Duration;

/// Backend chunk ranges must be multiples of this size (except the last one)
pub const CHUNK_GRANULARITY: u64 = 256 * 1024;

/// Default single-shot threshold: 6MB
pub const DEFAULT_SINGLE_SHOT_THRESHOLD: u64 = 6 * 1024 * 1024;

/// Default chunk size: 5MB
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Default session max age: 1 hour
pub const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 60 * 60;

/// Default relay deadline: 5 minutes
pub const DEFAULT_RELAY_TIMEOUT_SECS: u64 = 5 * 60;

pub const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Default deadline for one token refresh
pub const DEFAULT_TOKEN_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub upload: UploadConfig,
    pub drive: DriveConfig,
    pub credentials: CredentialConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone)]
pub struct AuthConfig {
    /// Bearer secret required on session creation
    pub shared_secret: String,
    /// Origins allowed by the CORS layer
    pub allowed_origins: Vec<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("shared_secret", &"<redacted>")
            .field("allowed_origins", &self.allowed_origins)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub single_shot_threshold: u64,
    pub chunk_size: u64,
    pub max_file_size: Option<u64>,
    pub session_max_age: Duration,
    pub relay_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub api_base: String,
    pub parent_folder_id: Option<String>,
}

#[derive(Clone)]
pub enum CredentialConfig {
    /// OAuth2 refresh-token grant
    RefreshToken {
        client_id: String,
        client_secret: String,
        refresh_token: String,
        token_url: String,
        timeout: Duration,
    },
    /// Fixed access token (development only)
    Static { access_token: String },
}

impl std::fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RefreshToken { client_id, token_url, timeout, .. } => f
                .debug_struct("RefreshToken")
                .field("client_id", client_id)
                .field("token_url", token_url)
                .field("timeout", timeout)
                .finish_non_exhaustive(),
            Self::Static { .. } => f.debug_struct("Static").finish_non_exhaustive(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig {
            single_shot_threshold: DEFAULT_SINGLE_SHOT_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_file_size: None,
            session_max_age: Duration::from_secs(DEFAULT_SESSION_MAX_AGE_SECS),
            relay_timeout: Duration::from_secs(DEFAULT_RELAY_TIMEOUT_SECS),
        }
    }
}

impl UploadConfig {
    /// Largest request body any relay route has to accept
    pub fn body_limit(&self) -> usize {
        let largest = self.single_shot_threshold.max(self.chunk_size);
        usize::try_from(largest).unwrap_or(usize::MAX).saturating_add(64 * 1024)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 || self.chunk_size % CHUNK_GRANULARITY != 0 {
            return Err(ConfigError::Invalid {
                name: "CHUNK_SIZE_BYTES",
                reason: format!("must be a positive multiple of {}", CHUNK_GRANULARITY),
            });
        }
        if self.single_shot_threshold == 0 {
            return Err(ConfigError::Invalid {
                name: "SINGLE_SHOT_THRESHOLD_BYTES",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let upload = UploadConfig {
            single_shot_threshold: parse_or("SINGLE_SHOT_THRESHOLD_BYTES", DEFAULT_SINGLE_SHOT_THRESHOLD)?,
            chunk_size: parse_or("CHUNK_SIZE_BYTES", DEFAULT_CHUNK_SIZE)?,
            max_file_size: parse_opt("MAX_FILE_SIZE_BYTES")?,
            session_max_age: Duration::from_secs(parse_or(
                "SESSION_MAX_AGE_SECS",
                DEFAULT_SESSION_MAX_AGE_SECS,
            )?),
            relay_timeout: Duration::from_secs(parse_or(
                "RELAY_TIMEOUT_SECS",
                DEFAULT_RELAY_TIMEOUT_SECS,
            )?),
        };
        upload.validate()?;

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_or("SERVER_PORT", 3000)?,
            },
            auth: AuthConfig {
                shared_secret: required("UPLOAD_SHARED_SECRET")?,
                allowed_origins: parse_origins(&env::var("ALLOWED_ORIGINS").unwrap_or_default()),
            },
            upload,
            drive: DriveConfig {
                api_base: env::var("DRIVE_API_BASE")
                    .unwrap_or_else(|_| DEFAULT_DRIVE_API_BASE.to_string()),
                parent_folder_id: optional("DRIVE_PARENT_FOLDER_ID"),
            },
            credentials: credentials_from_env()?,
        })
    }
}

fn credentials_from_env() -> Result<CredentialConfig, ConfigError> {
    if let Some(refresh_token) = optional("GOOGLE_REFRESH_TOKEN") {
        return Ok(CredentialConfig::RefreshToken {
            client_id: required("GOOGLE_CLIENT_ID")?,
            client_secret: required("GOOGLE_CLIENT_SECRET")?,
            refresh_token,
            token_url: env::var("GOOGLE_TOKEN_URL").unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string()),
            timeout: Duration::from_secs(parse_or(
                "GOOGLE_TOKEN_TIMEOUT_SECS",
                DEFAULT_TOKEN_TIMEOUT_SECS,
            )?),
        });
    }

    match optional("GOOGLE_ACCESS_TOKEN") {
        Some(access_token) => Ok(CredentialConfig::Static { access_token }),
        None => Err(ConfigError::Missing("GOOGLE_REFRESH_TOKEN")),
    }
}

/// Split a comma-separated origin list, dropping blanks
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_opt<T>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional(name)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn parse_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(name)?.unwrap_or(default))
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        auth: AuthConfig {
            shared_secret: "test-secret".to_string(),
            allowed_origins: vec!["https://app.example.com".to_string()],
        },
        upload: UploadConfig::default(),
        drive: DriveConfig {
            api_base: DEFAULT_DRIVE_API_BASE.to_string(),
            parent_folder_id: None,
        },
        credentials: CredentialConfig::Static {
            access_token: "test-token".to_string(),
        },
    }
}
