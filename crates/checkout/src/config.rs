//! Checkout service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `JWT_ACCESS_SECRET` - Access-token signing secret (min 32 chars, high entropy)
//! - `JWT_REFRESH_SECRET` - Refresh-token signing secret (min 32 chars, distinct from the
//!   access secret)
//! - `CHECKOUT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`);
//!   not needed when `CHECKOUT_STORAGE=memory`
//!
//! ## Optional
//! - `CHECKOUT_STORAGE` - `postgres` (default) or `memory`
//! - `CHECKOUT_HOST` - Bind address (default: 127.0.0.1)
//! - `CHECKOUT_PORT` - Listen port (default: 3000)
//! - `CHECKOUT_REQUEST_TIMEOUT_SECS` - Per-request budget (default: 15)
//! - `CHECKOUT_RECONCILE_INTERVAL_SECS` - Order cleanup sweep interval, 0 disables (default: 300)
//! - `CHECKOUT_RATE_LIMIT` - Rate-limit unauthenticated account endpoints (default: true)
//! - `CHECKOUT_LOG_FORMAT` - `pretty` (default) or `json`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SIGNING_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Where documents are persisted.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    /// `PostgreSQL` at the given connection URL.
    Postgres(SecretString),
    /// Process-local maps; data is lost on restart.
    Memory,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Checkout service configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Persistence backend
    pub storage: StorageBackend,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Token signing secrets
    pub jwt: JwtConfig,
    /// Budget for a single request, including storage and gateway calls
    pub request_timeout: Duration,
    /// Interval of the order cleanup sweep (`None` disables it)
    pub reconcile_interval: Option<Duration>,
    /// Whether unauthenticated account endpoints are rate limited
    pub rate_limit: bool,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry trace sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Signing secrets for access and refresh tokens.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct JwtConfig {
    /// Signs access tokens
    pub access_secret: SecretString,
    /// Signs refresh tokens
    pub refresh_secret: SecretString,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"[REDACTED]")
            .field("refresh_secret", &"[REDACTED]")
            .finish()
    }
}

impl CheckoutConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let storage = match get_env_or_default("CHECKOUT_STORAGE", "postgres").as_str() {
            "postgres" => StorageBackend::Postgres(get_database_url("CHECKOUT_DATABASE_URL")?),
            "memory" => StorageBackend::Memory,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "CHECKOUT_STORAGE".to_string(),
                    format!("expected 'postgres' or 'memory', got '{other}'"),
                ));
            }
        };
        let host = parse_env("CHECKOUT_HOST", "127.0.0.1")?;
        let port = parse_env("CHECKOUT_PORT", "3000")?;
        let jwt = JwtConfig::from_env()?;
        let request_timeout =
            Duration::from_secs(parse_env("CHECKOUT_REQUEST_TIMEOUT_SECS", "15")?);
        let reconcile_secs: u64 = parse_env("CHECKOUT_RECONCILE_INTERVAL_SECS", "300")?;
        let reconcile_interval = (reconcile_secs > 0).then(|| Duration::from_secs(reconcile_secs));
        let rate_limit = parse_env("CHECKOUT_RATE_LIMIT", "true")?;
        let log_format = match get_env_or_default("CHECKOUT_LOG_FORMAT", "pretty").as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            storage,
            host,
            port,
            jwt,
            request_timeout,
            reconcile_interval,
            rate_limit,
            log_format,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Configuration for tests and local experiments: in-memory storage, no
    /// rate limiting, no background sweep.
    #[must_use]
    pub fn for_memory(jwt: JwtConfig) -> Self {
        Self {
            storage: StorageBackend::Memory,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            jwt,
            request_timeout: Duration::from_secs(15),
            reconcile_interval: None,
            rate_limit: false,
            log_format: LogFormat::Pretty,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let access_secret = get_validated_secret("JWT_ACCESS_SECRET")?;
        let refresh_secret = get_validated_secret("JWT_REFRESH_SECRET")?;
        if access_secret.expose_secret() == refresh_secret.expose_secret() {
            return Err(ConfigError::InsecureSecret(
                "JWT_REFRESH_SECRET".to_string(),
                "must differ from JWT_ACCESS_SECRET".to_string(),
            ));
        }
        Ok(Self {
            access_secret,
            refresh_secret,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
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

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a signing secret is long, not a placeholder, and has
/// sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    if secret.len() < MIN_SIGNING_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {MIN_SIGNING_SECRET_LENGTH} characters (got {})",
                secret.len()
            ),
        ));
    }

    let lower = secret.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= \
                 {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const STRONG: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_rejects_short() {
        let err = validate_secret_strength("aB3$xY9!", "JWT_ACCESS_SECRET").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_rejects_placeholder() {
        let result = validate_secret_strength(
            "your-jwt-signing-key-goes-here-0123456789",
            "JWT_ACCESS_SECRET",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_rejects_low_entropy() {
        let result = validate_secret_strength(&"ab".repeat(20), "JWT_ACCESS_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_accepts_strong() {
        assert!(validate_secret_strength(STRONG, "JWT_ACCESS_SECRET").is_ok());
    }

    #[test]
    fn test_jwt_config_debug_redacts_secrets() {
        let config = JwtConfig {
            access_secret: SecretString::from(STRONG),
            refresh_secret: SecretString::from("refresh-value-that-must-not-leak"),
        };
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(STRONG));
        assert!(!debug_output.contains("must-not-leak"));
    }

    #[test]
    fn test_memory_config_socket_addr() {
        let config = CheckoutConfig::for_memory(JwtConfig {
            access_secret: SecretString::from(STRONG),
            refresh_secret: SecretString::from(STRONG),
        });
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert!(!config.rate_limit);
        assert!(config.reconcile_interval.is_none());
    }
}
