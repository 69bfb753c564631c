//! For reading application configuration.

use serde::Deserialize;
use std::time::Duration;

/// Application configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Database configuration.
    /// Items are kept in memory when this is not set.
    pub database: Option<DatabaseConfig>,
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    /// Server address.
    pub http_address: String,
    /// Server http port.
    pub http_port: u16,
}

/// Authentication configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthConfig {
    /// The secret used to sign and verify tokens.
    pub jwt_secret: String,
    /// How long an issued token is valid.
    #[serde(with = "humantime_serde", default = "default_token_ttl")]
    pub token_ttl: Duration,
    /// The bcrypt cost used when hashing passwords.
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    /// The users that may sign in.
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

fn default_token_ttl() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

/// A user that may sign in.
#[derive(Clone, Debug, Deserialize)]
pub struct UserConfig {
    /// The user's name.
    pub username: String,
    /// The user's password. Only a bcrypt hash of it is kept in memory.
    pub password: String,
    /// The user's roles, e.g. `ADMIN`.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Database configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseConfig {
    /// The database username.
    pub username: String,
    /// The database password.
    pub password: String,
    /// The database port.
    pub port: u16,
    /// The database name.
    pub database_name: String,
    /// The database host.
    pub host: String,
}

/// Retrieve [`Config`] from the default configuration file.
#[tracing::instrument]
pub fn load_config() -> Result<Config, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::with_name("config").required(false))
        .add_source(config::Environment::with_prefix("app").separator("__"))
        .build()?
        .try_deserialize()
}
