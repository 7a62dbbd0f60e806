//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MAPLE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `MAPLE_API_TOKEN` - Bearer token required on every `/api` request (min 32 chars)
//! - `SQUARE_ACCESS_TOKEN` - Square API access token
//! - `SQUARE_LOCATION_ID` - Square location that holds inventory
//!
//! ## Optional
//! - `MAPLE_HOST` - Bind address (default: 127.0.0.1)
//! - `MAPLE_PORT` - Listen port (default: 3001)
//! - `SQUARE_ENVIRONMENT` - `sandbox` or `production` (default: sandbox)
//! - `SQUARE_API_VERSION` - `Square-Version` header (default: 2025-10-16)
//! - `SYNC_CONCURRENCY` - Products checked in parallel during a full sync (default: 4)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (Square webhooks - both or neither)
//! - `SQUARE_WEBHOOK_SIGNATURE_KEY` - Signature key of the webhook subscription
//! - `SQUARE_WEBHOOK_URL` - Notification URL exactly as registered with Square
//!
//! ## Optional (Webflow - all or none)
//! - `WEBFLOW_API_TOKEN` - Webflow site API token
//! - `WEBFLOW_CLASSES_COLLECTION_ID` - CMS collection for published classes
//! - `WEBFLOW_ARTISTS_COLLECTION_ID` - CMS collection for artist profiles
//!
//! ## Optional (SMTP - all or none)
//! - `SMTP_HOST`, `SMTP_PORT` (default 587), `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_API_TOKEN_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_SQUARE_API_VERSION: &str = "2025-10-16";
const DEFAULT_SYNC_CONCURRENCY: usize = 4;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "put-your",
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

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer token for `/api` routes
    pub api_token: SecretString,
    /// Square API configuration
    pub square: SquareConfig,
    /// Webflow CMS configuration (optional - disables public site publishing)
    pub webflow: Option<WebflowConfig>,
    /// SMTP configuration (optional - disables confirmation emails)
    pub email: Option<EmailConfig>,
    /// Number of products checked concurrently during a full sync
    pub sync_concurrency: usize,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Which Square deployment to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SquareEnvironment {
    Sandbox,
    Production,
}

impl SquareEnvironment {
    /// REST API base URL.
    #[must_use]
    pub const fn base_url(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://connect.squareupsandbox.com",
            Self::Production => "https://connect.squareup.com",
        }
    }
}

impl std::str::FromStr for SquareEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "production" => Ok(Self::Production),
            other => Err(format!("expected 'sandbox' or 'production', got '{other}'")),
        }
    }
}

/// Square API configuration.
///
/// Implements `Debug` manually to redact credentials.
#[derive(Clone)]
pub struct SquareConfig {
    pub access_token: SecretString,
    pub location_id: String,
    pub environment: SquareEnvironment,
    pub api_version: String,
    pub webhook: Option<SquareWebhookConfig>,
}

impl std::fmt::Debug for SquareConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SquareConfig")
            .field("access_token", &"[REDACTED]")
            .field("location_id", &self.location_id)
            .field("environment", &self.environment)
            .field("api_version", &self.api_version)
            .field("webhook", &self.webhook)
            .finish()
    }
}

/// Square webhook subscription details used for signature verification.
#[derive(Clone)]
pub struct SquareWebhookConfig {
    pub signature_key: SecretString,
    /// Notification URL as registered; it is part of the signed payload.
    pub notification_url: String,
}

impl std::fmt::Debug for SquareWebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SquareWebhookConfig")
            .field("signature_key", &"[REDACTED]")
            .field("notification_url", &self.notification_url)
            .finish()
    }
}

/// Webflow CMS configuration.
#[derive(Clone)]
pub struct WebflowConfig {
    pub api_token: SecretString,
    pub classes_collection_id: String,
    pub artists_collection_id: String,
}

impl std::fmt::Debug for WebflowConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebflowConfig")
            .field("api_token", &"[REDACTED]")
            .field("classes_collection_id", &self.classes_collection_id)
            .field("artists_collection_id", &self.artists_collection_id)
            .finish()
    }
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl AdminConfig {
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

        let database_url = get_database_url("MAPLE_DATABASE_URL")?;
        let host = get_env_or_default("MAPLE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("MAPLE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("MAPLE_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("MAPLE_PORT".to_string(), e.to_string()))?;
        let api_token = get_validated_secret("MAPLE_API_TOKEN")?;
        validate_token_length(&api_token, "MAPLE_API_TOKEN")?;

        let square = SquareConfig::from_env()?;
        let webflow = WebflowConfig::from_env()?;
        let email = EmailConfig::from_env()?;
        let sync_concurrency = sync_concurrency_from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            api_token,
            square,
            webflow,
            email,
            sync_concurrency,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns the Webflow configuration, if publishing is enabled.
    #[must_use]
    pub const fn webflow(&self) -> Option<&WebflowConfig> {
        self.webflow.as_ref()
    }

    /// Returns the SMTP configuration, if confirmation emails are enabled.
    #[must_use]
    pub const fn email(&self) -> Option<&EmailConfig> {
        self.email.as_ref()
    }
}

impl SquareConfig {
    /// Load only the Square settings (used by the CLI, which has no API
    /// token or server address).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = get_env_or_default("SQUARE_ENVIRONMENT", "sandbox")
            .parse::<SquareEnvironment>()
            .map_err(|e| ConfigError::InvalidEnvVar("SQUARE_ENVIRONMENT".to_string(), e))?;

        let webhook = match (
            get_optional_env("SQUARE_WEBHOOK_SIGNATURE_KEY"),
            get_optional_env("SQUARE_WEBHOOK_URL"),
        ) {
            (Some(key), Some(url)) => Some(SquareWebhookConfig {
                signature_key: SecretString::from(key),
                notification_url: url,
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::InvalidEnvVar(
                    "SQUARE_WEBHOOK_*".to_string(),
                    "SQUARE_WEBHOOK_SIGNATURE_KEY and SQUARE_WEBHOOK_URL must be set together"
                        .to_string(),
                ));
            }
        };

        Ok(Self {
            access_token: get_validated_secret("SQUARE_ACCESS_TOKEN")?,
            location_id: get_required_env("SQUARE_LOCATION_ID")?,
            environment,
            api_version: get_env_or_default("SQUARE_API_VERSION", DEFAULT_SQUARE_API_VERSION),
            webhook,
        })
    }
}

impl WebflowConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        match (
            get_optional_env("WEBFLOW_API_TOKEN"),
            get_optional_env("WEBFLOW_CLASSES_COLLECTION_ID"),
            get_optional_env("WEBFLOW_ARTISTS_COLLECTION_ID"),
        ) {
            (Some(token), Some(classes), Some(artists)) => {
                validate_secret_strength(&token, "WEBFLOW_API_TOKEN")?;
                Ok(Some(Self {
                    api_token: SecretString::from(token),
                    classes_collection_id: classes,
                    artists_collection_id: artists,
                }))
            }
            (None, None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "WEBFLOW_*".to_string(),
                "WEBFLOW_API_TOKEN, WEBFLOW_CLASSES_COLLECTION_ID and \
                 WEBFLOW_ARTISTS_COLLECTION_ID must be set together"
                    .to_string(),
            )),
        }
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        let smtp_port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Some(Self {
            smtp_host,
            smtp_port,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_env("SMTP_PASSWORD").map(SecretString::from)?,
            from_address: get_required_env("SMTP_FROM")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Read `SYNC_CONCURRENCY` (default 4).
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` unless it is a positive integer.
pub fn sync_concurrency_from_env() -> Result<usize, ConfigError> {
    parse_sync_concurrency(get_optional_env("SYNC_CONCURRENCY").as_deref())
}

fn parse_sync_concurrency(value: Option<&str>) -> Result<usize, ConfigError> {
    let Some(value) = value else {
        return Ok(DEFAULT_SYNC_CONCURRENCY);
    };
    value
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            ConfigError::InvalidEnvVar(
                "SYNC_CONCURRENCY".to_string(),
                "must be a positive integer".to_string(),
            )
        })
}

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn validate_token_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_API_TOKEN_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_API_TOKEN_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
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

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sync_concurrency() {
        assert_eq!(parse_sync_concurrency(None).unwrap(), DEFAULT_SYNC_CONCURRENCY);
        assert_eq!(parse_sync_concurrency(Some("8")).unwrap(), 8);
        assert!(matches!(
            parse_sync_concurrency(Some("0")),
            Err(ConfigError::InvalidEnvVar(..))
        ));
        assert!(parse_sync_concurrency(Some("lots")).is_err());
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("zzzzzz") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("Qm7#pL2!vX9$kR4&") > 3.3);
    }

    #[test]
    fn test_placeholder_secret_rejected() {
        let err = validate_secret_strength("replace-with-square-token", "SQUARE_ACCESS_TOKEN")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(var, _) if var == "SQUARE_ACCESS_TOKEN"));
    }

    #[test]
    fn test_low_entropy_secret_rejected() {
        assert!(validate_secret_strength(&"ab".repeat(20), "MAPLE_API_TOKEN").is_err());
        assert!(validate_secret_strength("EAAAl7Qz9vKp2Xw4Rt8Ny6Bm3Jc5Hd1Fg", "T").is_ok());
    }

    #[test]
    fn test_token_length() {
        assert!(validate_token_length(&SecretString::from("short"), "MAPLE_API_TOKEN").is_err());
        assert!(validate_token_length(&SecretString::from("k".repeat(32)), "MAPLE_API_TOKEN").is_ok());
    }

    #[test]
    fn test_square_environment() {
        assert_eq!(
            "Production".parse::<SquareEnvironment>().unwrap(),
            SquareEnvironment::Production
        );
        assert!("staging".parse::<SquareEnvironment>().is_err());
        assert_eq!(
            SquareEnvironment::Sandbox.base_url(),
            "https://connect.squareupsandbox.com"
        );
    }

    #[test]
    fn test_square_config_debug_redacts_secrets() {
        let config = SquareConfig {
            access_token: SecretString::from("EAAA-very-secret-square-token"),
            location_id: "L8XQ2M4".to_string(),
            environment: SquareEnvironment::Sandbox,
            api_version: DEFAULT_SQUARE_API_VERSION.to_string(),
            webhook: Some(SquareWebhookConfig {
                signature_key: SecretString::from("whsec-very-secret"),
                notification_url: "https://api.maplespruce.org/webhooks/square".to_string(),
            }),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("L8XQ2M4"));
        assert!(debug_output.contains("webhooks/square"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("very-secret"));
    }

    #[test]
    fn test_email_config_debug_redacts_password() {
        let config = EmailConfig {
            smtp_host: "smtp.maplespruce.org".to_string(),
            smtp_port: 587,
            smtp_username: "classes".to_string(),
            smtp_password: SecretString::from("smtp-password-value"),
            from_address: "classes@maplespruce.org".to_string(),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("smtp.maplespruce.org"));
        assert!(!debug_output.contains("smtp-password-value"));
    }
}
