//! Centralized configuration for api-server.
//!
//! All environment variables are loaded and validated at startup to fail fast
//! on misconfiguration rather than at request time.

use axum::http::HeaderValue;
use domain::snapshot::{SnapshotConfig, DEFAULT_REDIRECT_DELAY};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound for the snapshot redirect delay.
const MAX_REDIRECT_DELAY_MS: u64 = 10_000;

/// Storage backend provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageProvider {
    /// In-memory storage (data lost on restart)
    Memory,
    /// SQLite file-based storage
    Sqlite,
}

impl StorageProvider {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("sqlite") {
            Self::Sqlite
        } else {
            Self::Memory
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3001)
    pub port: u16,
    pub cors_allow_origin: HeaderValue,
    pub storage_provider: StorageProvider,
    /// SQLite database path; the adapter default applies when unset
    pub db_path: Option<PathBuf>,
    pub log_format: LogFormat,
    /// Public origin of the site hosting the canonical SmartLink routes
    pub public_base_url: String,
    /// Custom domain for generated short URLs
    pub shortlink_domain: Option<String>,
    pub snapshot: SnapshotConfig,
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("PORT") {
            Ok(s) => s.trim().parse().map_err(|_| ConfigError {
                field: "PORT",
                message: format!("not a port number: '{}'", s),
            })?,
            Err(_) => 3001,
        };

        // CORS allow origin
        let cors_origin_str = env::var("CORS_ALLOW_ORIGIN").unwrap_or_else(|_| "*".into());
        let cors_allow_origin = if cors_origin_str == "*" {
            HeaderValue::from_static("*")
        } else {
            HeaderValue::from_str(&cors_origin_str).map_err(|e| ConfigError {
                field: "CORS_ALLOW_ORIGIN",
                message: format!("Invalid header value '{}': {}", cors_origin_str, e),
            })?
        };

        let storage_provider = StorageProvider::from_str(
            &env::var("STORAGE_PROVIDER").unwrap_or_else(|_| "sqlite".into()),
        );
        let db_path = env::var("DB_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let log_format =
            LogFormat::from_str(&env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".into()));

        let public_base_url = match env::var("PUBLIC_BASE_URL") {
            Ok(s) if !s.trim().is_empty() => parse_base_url("PUBLIC_BASE_URL", &s)?,
            _ => format!("http://localhost:{}", port),
        };

        let shortlink_domain = match env::var("SHORTLINK_DOMAIN") {
            Ok(s) if !s.trim().is_empty() => Some(parse_base_url("SHORTLINK_DOMAIN", &s)?),
            _ => None,
        };

        let redirect_delay = match env::var("SNAPSHOT_REDIRECT_DELAY_MS") {
            Ok(s) => parse_redirect_delay(&s)?,
            Err(_) => DEFAULT_REDIRECT_DELAY,
        };

        let site_name = env::var("SITE_NAME")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| SnapshotConfig::default().site_name);

        let fallback_image_url = match env::var("DEFAULT_OG_IMAGE") {
            Ok(s) if !s.trim().is_empty() => Some(parse_base_url("DEFAULT_OG_IMAGE", &s)?),
            _ => None,
        };

        let snapshot = SnapshotConfig {
            site_base_url: public_base_url.clone(),
            redirect_delay,
            site_name,
            fallback_image_url,
            ..SnapshotConfig::default()
        };

        Ok(Self {
            port,
            cors_allow_origin,
            storage_provider,
            db_path,
            log_format,
            public_base_url,
            shortlink_domain,
            snapshot,
        })
    }

    /// Log notes about configuration that is fine locally but not in production.
    pub fn warn_if_local(&self) {
        if self.storage_provider == StorageProvider::Memory {
            tracing::warn!("STORAGE_PROVIDER=memory: SmartLinks are lost on restart");
        }
        if self.public_base_url.starts_with("http://localhost") {
            tracing::warn!(
                base = %self.public_base_url,
                "PUBLIC_BASE_URL not set: snapshots and redirects point at localhost"
            );
        }
    }
}

/// Absolute http(s) URL without a trailing slash.
fn parse_base_url(field: &'static str, raw: &str) -> Result<String, ConfigError> {
    let v = raw.trim();
    if !(v.starts_with("http://") || v.starts_with("https://")) || v.contains(char::is_whitespace)
    {
        return Err(ConfigError {
            field,
            message: format!("expected an absolute http(s) URL, got '{}'", v),
        });
    }
    Ok(v.trim_end_matches('/').to_string())
}

fn parse_redirect_delay(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms <= MAX_REDIRECT_DELAY_MS => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError {
            field: "SNAPSHOT_REDIRECT_DELAY_MS",
            message: format!(
                "expected milliseconds between 0 and {}, got '{}'",
                MAX_REDIRECT_DELAY_MS, raw
            ),
        }),
    }
}
