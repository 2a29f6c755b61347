//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPIFY_STORE` - Shopify store domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_ADMIN_ACCESS_TOKEN` - Admin API access token (HIGH PRIVILEGE)
//! - `DISCOUNT_APP_HANDLE` - Handle of the app that owns the discounts
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `SHOPIFY_API_VERSION` - API version (default: 2026-01)
//! - `DISCOUNT_APP_TITLE` - App title, matched against app metadata
//! - `DISCOUNT_FUNCTION_ID` - Function the app's discounts run on
//! - `SENTRY_DSN` - Sentry error tracking DSN
//!
//! ## Optional (sync tuning)
//! - `SYNC_CONFIG_NAMESPACE` - Namespace of the records document (default: config)
//! - `SYNC_PANEL_NAMESPACE` - Namespace of panel settings (default: panel)
//! - `SYNC_LEGACY_NAMESPACE` - Namespace of pre-consolidation keys (default: discounts)
//! - `SYNC_MAX_ITEMS_PER_CALL` - Fields per write call (default and maximum: 25)
//! - `SYNC_MAX_RECORDS` - Records kept per document (default: 100)
//! - `SYNC_WORKER_LIMIT` - Concurrent existence checks (default: 4)
//! - `SYNC_REQUEST_TIMEOUT_SECS` - Deadline per remote call (default: 15)
//! - `SYNC_HEURISTIC_OWNERSHIP` - Claim unattributed discounts (default: true)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use discount_sync_core::OwnershipPolicy;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Platform ceiling on items per `metafieldsSet` / `metafieldsDelete` call.
pub const MAX_ITEMS_PER_CALL: usize = 25;

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
    "insert",
    "enter-",
    "put-your",
    "add-your",
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

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Shopify Admin API configuration
    pub shopify: ShopifyAdminConfig,
    /// Identity of the app whose discounts are managed
    pub app: AppIdentityConfig,
    /// Sync pipeline tuning
    pub sync: SyncConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Shopify Admin API configuration.
///
/// Implements `Debug` manually to redact the HIGH PRIVILEGE token.
#[derive(Clone)]
pub struct ShopifyAdminConfig {
    /// Shopify store domain (e.g., your-store.myshopify.com)
    pub store: String,
    /// Shopify API version (e.g., 2026-01)
    pub api_version: String,
    /// Admin API access token (HIGH PRIVILEGE - full store access)
    pub access_token: SecretString,
}

impl std::fmt::Debug for ShopifyAdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyAdminConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// What this deployment knows about the app that creates its discounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentityConfig {
    /// App handle
    pub handle: String,
    /// App title, when it differs from the handle
    pub title: Option<String>,
    /// Function ID used when creating app discounts
    pub function_id: Option<String>,
    /// Whether unattributed discounts are claimed as ours
    pub heuristic_ownership: bool,
}

impl AppIdentityConfig {
    /// Ownership policy for the classifier.
    #[must_use]
    pub fn ownership_policy(&self) -> OwnershipPolicy {
        let mut policy = OwnershipPolicy::new(self.handle.clone());
        policy.app_title.clone_from(&self.title);
        policy.function_id.clone_from(&self.function_id);
        policy.heuristic_fallbacks = self.heuristic_ownership;
        policy
    }
}

/// Sync pipeline tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Namespace holding `records` and `activeRecords`
    pub config_namespace: String,
    /// Namespace holding one field per panel setting
    pub panel_namespace: String,
    /// Namespace holding `record<index>_<field>` keys
    pub legacy_namespace: String,
    /// Fields per set/delete call, never above [`MAX_ITEMS_PER_CALL`]
    pub max_items_per_call: usize,
    /// Records kept in the consolidated document
    pub max_records: usize,
    /// Concurrent existence checks during reconciliation
    pub worker_limit: usize,
    /// Deadline applied to every remote call
    pub request_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            config_namespace: "config".to_string(),
            panel_namespace: "panel".to_string(),
            legacy_namespace: "discounts".to_string(),
            max_items_per_call: MAX_ITEMS_PER_CALL,
            max_records: 100,
            worker_limit: 4,
            request_timeout: Duration::from_secs(15),
        }
    }
}

impl SyncConfig {
    /// Load the sync section on its own (used by the CLI).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a numeric variable is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(get_optional_env)
    }

    /// Build from a variable lookup; unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a numeric variable does not
    /// parse or is zero.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let positive = |key: &str, default: usize| -> Result<usize, ConfigError> {
            lookup(key).map_or(Ok(default), |raw| match raw.trim().parse::<usize>() {
                Ok(0) => Err(ConfigError::InvalidEnvVar(
                    key.to_string(),
                    "must be greater than zero".to_string(),
                )),
                Ok(n) => Ok(n),
                Err(e) => Err(ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
            })
        };

        let max_items_per_call =
            positive("SYNC_MAX_ITEMS_PER_CALL", defaults.max_items_per_call)?;
        if max_items_per_call > MAX_ITEMS_PER_CALL {
            tracing::warn!(
                requested = max_items_per_call,
                ceiling = MAX_ITEMS_PER_CALL,
                "SYNC_MAX_ITEMS_PER_CALL above platform ceiling, capping"
            );
        }

        let timeout_secs = positive(
            "SYNC_REQUEST_TIMEOUT_SECS",
            usize::try_from(defaults.request_timeout.as_secs()).unwrap_or(15),
        )?;

        Ok(Self {
            config_namespace: lookup("SYNC_CONFIG_NAMESPACE").unwrap_or(defaults.config_namespace),
            panel_namespace: lookup("SYNC_PANEL_NAMESPACE").unwrap_or(defaults.panel_namespace),
            legacy_namespace: lookup("SYNC_LEGACY_NAMESPACE").unwrap_or(defaults.legacy_namespace),
            max_items_per_call: max_items_per_call.min(MAX_ITEMS_PER_CALL),
            max_records: positive("SYNC_MAX_RECORDS", defaults.max_records)?,
            worker_limit: positive("SYNC_WORKER_LIMIT", defaults.worker_limit)?,
            request_timeout: Duration::from_secs(u64::try_from(timeout_secs).unwrap_or(15)),
        })
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

        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("ADMIN_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_PORT".to_string(), e.to_string()))?;

        let shopify = ShopifyAdminConfig::from_env()?;
        let app = AppIdentityConfig::from_env()?;
        let sync = SyncConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            host,
            port,
            shopify,
            app,
            sync,
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
}

impl ShopifyAdminConfig {
    /// Load the Shopify section on its own (used by the CLI).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the store or token is missing or the token
    /// looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            store: get_required_env("SHOPIFY_STORE")?,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", "2026-01"),
            access_token: get_validated_secret("SHOPIFY_ADMIN_ACCESS_TOKEN")?,
        })
    }
}

impl AppIdentityConfig {
    /// Load the app identity section on its own (used by the CLI).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the handle is missing or a flag is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let heuristic_ownership = match get_optional_env("SYNC_HEURISTIC_OWNERSHIP") {
            None => true,
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "SYNC_HEURISTIC_OWNERSHIP".to_string(),
                    format!("expected true or false, got '{raw}'"),
                )
            })?,
        };

        Ok(Self {
            handle: get_required_env("DISCOUNT_APP_HANDLE")?,
            title: get_optional_env("DISCOUNT_APP_TITLE"),
            function_id: get_optional_env("DISCOUNT_FUNCTION_ID"),
            heuristic_ownership,
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

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
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
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the token issued by Shopify."
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
