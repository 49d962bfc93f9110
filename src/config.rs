use std::env;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use validator::Validate;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Deployment environment. Gates the mock-store fallback: outside
/// production a failed database connection degrades to the in-memory store,
/// in production it is a startup error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown environment '{0}' (expected development or production)")]
pub struct ParseEnvironmentError(String);

impl FromStr for Environment {
    type Err = ParseEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ParseEnvironmentError(other.to_string())),
        }
    }
}

/// Server configuration with validation
#[derive(Clone, Debug, Validate)]
pub struct ServerConfig {
    /// HTTP server host address
    #[validate(length(min = 1, message = "HTTP host cannot be empty"))]
    pub http_host: String,

    /// HTTP server port (1-65535)
    #[validate(range(
        min = 1,
        max = 65535,
        message = "HTTP port must be between 1 and 65535"
    ))]
    pub http_port: u16,

    /// PostgreSQL host
    #[validate(length(min = 1, message = "Database host cannot be empty"))]
    pub db_host: String,

    /// PostgreSQL port (1-65535)
    #[validate(range(
        min = 1,
        max = 65535,
        message = "Database port must be between 1 and 65535"
    ))]
    pub db_port: u16,

    /// PostgreSQL user
    pub db_user: String,

    /// PostgreSQL password
    pub db_password: String,

    /// PostgreSQL database name
    #[validate(length(min = 1, message = "Database name cannot be empty"))]
    pub db_name: String,

    /// Connection attempt timeout in milliseconds
    #[validate(range(
        min = 100,
        max = 60_000,
        message = "Connect timeout must be between 100 and 60000 ms"
    ))]
    pub db_connect_timeout_ms: u64,

    /// Secret used to sign and verify JWTs
    #[validate(length(min = 1, message = "JWT secret cannot be empty"))]
    pub jwt_secret: String,

    /// Force the in-memory mock store, skipping the real database entirely
    pub mock_db: bool,

    /// Deployment environment (development | production)
    pub environment: Environment,

    /// Base URL used when building invite links
    #[validate(length(min = 1, message = "Frontend URL cannot be empty"))]
    pub frontend_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: "0.0.0.0".to_string(),
            http_port: 5000,
            db_host: "localhost".to_string(),
            db_port: 5432,
            db_user: "postgres".to_string(),
            db_password: "postgres".to_string(),
            db_name: "perigee".to_string(),
            db_connect_timeout_ms: 2000,
            jwt_secret: "your-secret-key".to_string(),
            mock_db: false,
            environment: Environment::Development,
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            http_host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: parse_env_var("PORT", "5000")?,
            db_host: env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            db_port: parse_env_var("DB_PORT", "5432")?,
            db_user: env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            db_password: env::var("DB_PASSWORD").unwrap_or_else(|_| "postgres".to_string()),
            db_name: env::var("DB_NAME").unwrap_or_else(|_| "perigee".to_string()),
            db_connect_timeout_ms: parse_env_var("DB_CONNECT_TIMEOUT_MS", "2000")?,
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "your-secret-key".to_string()),
            mock_db: parse_env_var("MOCK_DB", "false")?,
            environment: parse_env_var("APP_ENV", "development")?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from CLI arguments layered over the environment
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let mut config = Self::from_env()?;

        if let Some(host) = cli.http_host {
            config.http_host = host;
        }
        if let Some(port) = cli.http_port {
            config.http_port = port;
        }
        if cli.mock_db {
            config.mock_db = true;
        }
        if let Some(environment) = cli.environment {
            config.environment = environment;
        }

        config.validate()?;
        Ok(config)
    }
}

/// CLI configuration (parsed from command line arguments). Unset fields
/// defer to the environment.
#[derive(Clone, Debug, Default)]
pub struct CliConfig {
    pub http_host: Option<String>,
    pub http_port: Option<u16>,
    pub mock_db: bool,
    pub environment: Option<Environment>,
}

/// Parse an environment variable with a default value
fn parse_env_var<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
