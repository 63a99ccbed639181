//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. It provides
//! thread-safe access and mutation for testing or overrides in runtime environments.

use std::env;
use std::str::FromStr;
use std::sync::{OnceLock, RwLock};

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_path: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    /// CIDRs of reverse proxies whose `X-Forwarded-For` header is believed.
    /// Empty means the peer address is always the client address.
    pub trusted_proxies: Vec<String>,
    /// Hex-encoded bootstrap key for the QR signer. Only read when the
    /// `verifier_secrets` table is empty.
    pub qr_signing_secret: Option<String>,
    /// How many retired key versions below the active one still verify.
    pub qr_retained_key_versions: u32,
    pub scan_rate_limit: u32,
    pub scan_rate_window_seconds: u32,
    pub session_retention_minutes: u32,
    pub cleanup_interval_seconds: u64,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// Missing or unparsable values fall back to their defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            project_name: env::var("PROJECT_NAME").unwrap_or_else(|_| "qr-checkin".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "api=info,services=info".into()),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "api.log".into()),
            log_to_stdout: env::var("LOG_TO_STDOUT").unwrap_or_else(|_| "false".into()) == "true",
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/qr-checkin.db".into()),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env_or("PORT", 3000),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_default(),
            trusted_proxies: env::var("TRUSTED_PROXIES")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
            qr_signing_secret: env::var("QR_SIGNING_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            qr_retained_key_versions: env_or("QR_RETAINED_KEY_VERSIONS", 1),
            scan_rate_limit: env_or("SCAN_RATE_LIMIT", 5),
            scan_rate_window_seconds: env_or("SCAN_RATE_WINDOW_SECONDS", 60),
            session_retention_minutes: env_or("SESSION_RETENTION_MINUTES", 60),
            cleanup_interval_seconds: env_or("CLEANUP_INTERVAL_SECONDS", 3600),
        }
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    pub fn global() -> std::sync::RwLockReadGuard<'static, AppConfig> {
        CONFIG_INSTANCE
            .get_or_init(|| RwLock::new(AppConfig::from_env()))
            .read()
            .expect("Failed to acquire AppConfig read lock")
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            let mut guard = lock
                .write()
                .expect("Failed to acquire AppConfig write lock");
            *guard = AppConfig::from_env();
        }
    }

    /// Generic internal setter for any field in the config.
    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        let mut guard = lock
            .write()
            .expect("Failed to acquire AppConfig write lock");
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    pub fn set_env(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.env = value.into());
    }

    pub fn set_database_path(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.database_path = value.into());
    }

    pub fn set_jwt_secret(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.jwt_secret = value.into());
    }

    pub fn set_trusted_proxies(value: Vec<String>) {
        AppConfig::set_field(|cfg| cfg.trusted_proxies = value);
    }

    pub fn set_qr_signing_secret(value: Option<String>) {
        AppConfig::set_field(|cfg| cfg.qr_signing_secret = value);
    }

    pub fn set_scan_rate_limit(value: u32) {
        AppConfig::set_field(|cfg| cfg.scan_rate_limit = value);
    }

    pub fn set_scan_rate_window_seconds(value: u32) {
        AppConfig::set_field(|cfg| cfg.scan_rate_window_seconds = value);
    }

    pub fn set_session_retention_minutes(value: u32) {
        AppConfig::set_field(|cfg| cfg.session_retention_minutes = value);
    }
}

// --- Free accessors, so call sites read `config::host()` ---

pub fn env() -> String {
    AppConfig::global().env.clone()
}

pub fn project_name() -> String {
    AppConfig::global().project_name.clone()
}

pub fn log_level() -> String {
    AppConfig::global().log_level.clone()
}

pub fn log_file() -> String {
    AppConfig::global().log_file.clone()
}

pub fn log_to_stdout() -> bool {
    AppConfig::global().log_to_stdout
}

pub fn database_path() -> String {
    AppConfig::global().database_path.clone()
}

pub fn host() -> String {
    AppConfig::global().host.clone()
}

pub fn port() -> u16 {
    AppConfig::global().port
}

pub fn jwt_secret() -> String {
    AppConfig::global().jwt_secret.clone()
}

pub fn trusted_proxies() -> Vec<String> {
    AppConfig::global().trusted_proxies.clone()
}

pub fn qr_signing_secret() -> Option<String> {
    AppConfig::global().qr_signing_secret.clone()
}

pub fn qr_retained_key_versions() -> u32 {
    AppConfig::global().qr_retained_key_versions
}

pub fn scan_rate_limit() -> u32 {
    AppConfig::global().scan_rate_limit
}

pub fn scan_rate_window_seconds() -> u32 {
    AppConfig::global().scan_rate_window_seconds
}

pub fn session_retention_minutes() -> u32 {
    AppConfig::global().session_retention_minutes
}

pub fn cleanup_interval_seconds() -> u64 {
    AppConfig::global().cleanup_interval_seconds
}
