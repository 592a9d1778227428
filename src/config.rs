//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)
//! 4. Legacy environment variables (TWITTER_CLIENT_*)
//!
//! `DO_NOT_ALLOW_NEW_USERS` is not part of the loaded configuration; see
//! [`AppConfig::allow_new_users`].

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub twitter: TwitterConfig,
    pub http: HttpClientConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Registration policy and internal API authentication
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// When false, OAuth callbacks for unknown identities are turned away
    pub allow_new_users: bool,
    /// Bearer token the OAuth callback handler presents to this service
    pub api_token: String,
}

/// Twitter application credentials
#[derive(Debug, Clone, Deserialize)]
pub struct TwitterConfig {
    /// OAuth consumer key
    pub client_id: String,
    /// OAuth consumer secret
    pub client_secret: String,
    /// REST API root (e.g., "https://api.twitter.com")
    pub api_base_url: String,
}

/// Outbound HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpClientConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

/// Closes registration whenever it is present in the process environment,
/// whatever its value. Checked on every link, not at load time.
pub const DISABLE_REGISTRATION_VAR: &str = "DO_NOT_ALLOW_NEW_USERS";

/// Maps the historical flat Twitter environment variables onto config keys.
fn legacy_overrides(lookup: impl Fn(&str) -> Option<String>) -> Vec<(&'static str, String)> {
    let mut overrides = Vec::new();

    if let Some(client_id) = lookup("TWITTER_CLIENT_ID") {
        overrides.push(("twitter.client_id", client_id));
    }
    if let Some(client_secret) = lookup("TWITTER_CLIENT_SECRET") {
        overrides.push(("twitter.client_secret", client_secret));
    }

    overrides
}

impl LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is not set
    pub fn default_directives(&self) -> String {
        format!("crossposter={},tower_http=debug", self.level)
    }
}

impl AppConfig {
    /// Whether unknown identities may register right now.
    ///
    /// `auth.allow_new_users` must be set and `DO_NOT_ALLOW_NEW_USERS`
    /// absent from the environment.
    pub fn allow_new_users(&self) -> bool {
        self.allow_new_users_with(|name| std::env::var_os(name).map(|_| String::new()))
    }

    fn allow_new_users_with(&self, lookup: impl Fn(&str) -> Option<String>) -> bool {
        self.auth.allow_new_users && lookup(DISABLE_REGISTRATION_VAR).is_none()
    }

    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (CROSSPOSTER__*)
    /// 5. Legacy environment variables
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let mut builder = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.path", "data/crossposter.db")?
            .set_default("auth.allow_new_users", true)?
            .set_default("twitter.client_id", "")?
            .set_default("twitter.client_secret", "")?
            .set_default("twitter.api_base_url", "https://api.twitter.com")?
            .set_default("http.timeout_seconds", 30)?
            .set_default("http.user_agent", "Crossposter/0.1.0")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (CROSSPOSTER__*)
            .add_source(
                Environment::with_prefix("CROSSPOSTER")
                    .separator("__")
                    .try_parsing(true),
            );

        for (key, value) in legacy_overrides(|name| std::env::var(name).ok()) {
            builder = builder.set_override(key, value)?;
        }

        let config = builder
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_API_TOKEN_BYTES: usize = 16;

        if self.auth.api_token.as_bytes().len() < MIN_API_TOKEN_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.api_token must be at least {} bytes",
                MIN_API_TOKEN_BYTES
            )));
        }

        if url::Url::parse(&self.twitter.api_base_url).is_err() {
            return Err(crate::error::AppError::Config(format!(
                "twitter.api_base_url is not a valid URL: {}",
                self.twitter.api_base_url
            )));
        }

        if self.http.timeout_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "http.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
