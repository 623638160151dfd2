//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CARDVAULT_GATEWAY_URL` - Base URL of the remote realtime database
//! - `CARDVAULT_GATEWAY_KEY` - Public (anon) API key for the gateway
//!
//! ## Optional
//! - `CARDVAULT_COMMERCE_API_KEY` - Payment gateway API key (checkout is
//!   disabled without it)
//! - `CARDVAULT_RETURN_URL` - Redirect target after a hosted payment page
//! - `CARDVAULT_STATE_PATH` - Local key-value state file (default:
//!   cardvault-state.json)
//! - `CARDVAULT_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 8)
//! - `CARDVAULT_POLL_INTERVAL_MS` - Change-feed poll interval (default: 2000)
//! - `CARDVAULT_CACHE_TTL_SECS` - Product list cache TTL (default: 30)
//! - `CARDVAULT_DISCOUNT_RATE` - Volume discount rate (default: 0.10)
//! - `CARDVAULT_DISCOUNT_MIN_ITEMS` - Item count that triggers the discount
//!   (default: 20)
//! - `CARDVAULT_FREE_SHIPPING_THRESHOLD` - Discounted subtotal above which
//!   shipping is waived (default: 150)
//! - `CARDVAULT_SHIPPING_FEE` - Flat shipping fee (default: 9.99)

use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::cart::CartPolicy;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &["your-", "changeme", "replace", "placeholder", "example"];

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

/// Client application configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Remote gateway connection settings
    pub gateway: GatewayConfig,
    /// Payment gateway settings; `None` disables checkout hand-off
    pub payment: Option<PaymentConfig>,
    /// Path of the persisted client-local key-value state
    pub state_path: PathBuf,
    /// Cart pricing policy (discount, shipping)
    pub cart: CartPolicy,
}

/// Remote realtime database connection settings.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Base URL of the remote store's REST surface
    pub url: Url,
    /// Public (anon) API key sent with every request
    pub api_key: SecretString,
    /// Conservative timeout applied to every remote call
    pub request_timeout: Duration,
    /// Interval between change-feed polls
    pub poll_interval: Duration,
    /// How long a fetched product list stays fresh
    pub cache_ttl: Duration,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("url", &self.url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("request_timeout", &self.request_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

/// Payment gateway settings.
#[derive(Clone)]
pub struct PaymentConfig {
    /// Payment gateway API key
    pub api_key: SecretString,
    /// Where the hosted payment page sends the buyer afterwards
    pub redirect_url: Url,
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("api_key", &"[REDACTED]")
            .field("redirect_url", &self.redirect_url.as_str())
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the gateway key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let gateway = GatewayConfig::from_env()?;
        let payment = PaymentConfig::from_env()?;
        let state_path =
            PathBuf::from(get_env_or_default("CARDVAULT_STATE_PATH", "cardvault-state.json"));
        let cart = cart_policy_from_env()?;

        Ok(Self {
            gateway,
            payment,
            state_path,
            cart,
        })
    }
}

impl GatewayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = parse_env::<Url>("CARDVAULT_GATEWAY_URL", get_required_env("CARDVAULT_GATEWAY_URL")?)?;
        let api_key = get_validated_secret("CARDVAULT_GATEWAY_KEY")?;
        let request_timeout = Duration::from_secs(parse_env(
            "CARDVAULT_REQUEST_TIMEOUT_SECS",
            get_env_or_default("CARDVAULT_REQUEST_TIMEOUT_SECS", "8"),
        )?);
        let poll_interval = Duration::from_millis(parse_env(
            "CARDVAULT_POLL_INTERVAL_MS",
            get_env_or_default("CARDVAULT_POLL_INTERVAL_MS", "2000"),
        )?);
        let cache_ttl = Duration::from_secs(parse_env(
            "CARDVAULT_CACHE_TTL_SECS",
            get_env_or_default("CARDVAULT_CACHE_TTL_SECS", "30"),
        )?);

        Ok(Self {
            url,
            api_key,
            request_timeout,
            poll_interval,
            cache_ttl,
        })
    }
}

impl PaymentConfig {
    /// Payment configuration is optional as a whole: without an API key the
    /// storefront simply cannot hand off to the hosted payment page.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(api_key) = get_optional_env("CARDVAULT_COMMERCE_API_KEY") else {
            return Ok(None);
        };
        let redirect_url = parse_env::<Url>(
            "CARDVAULT_RETURN_URL",
            get_env_or_default("CARDVAULT_RETURN_URL", "https://cardvault.example/"),
        )?;
        Ok(Some(Self {
            api_key: SecretString::from(api_key),
            redirect_url,
        }))
    }
}

/// Cart policy values are configuration, not structure.
fn cart_policy_from_env() -> Result<CartPolicy, ConfigError> {
    Ok(CartPolicy {
        discount_rate: parse_env::<Decimal>(
            "CARDVAULT_DISCOUNT_RATE",
            get_env_or_default("CARDVAULT_DISCOUNT_RATE", "0.10"),
        )?,
        discount_min_items: parse_env(
            "CARDVAULT_DISCOUNT_MIN_ITEMS",
            get_env_or_default("CARDVAULT_DISCOUNT_MIN_ITEMS", "20"),
        )?,
        free_shipping_threshold: parse_env::<Decimal>(
            "CARDVAULT_FREE_SHIPPING_THRESHOLD",
            get_env_or_default("CARDVAULT_FREE_SHIPPING_THRESHOLD", "150"),
        )?,
        shipping_fee: parse_env::<Decimal>(
            "CARDVAULT_SHIPPING_FEE",
            get_env_or_default("CARDVAULT_SHIPPING_FEE", "9.99"),
        )?,
    })
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
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a value, attributing failures to the variable it came from.
fn parse_env<T>(key: &str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a secret is not an obvious placeholder.
fn validate_secret(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }
    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret(&value, key)?;
    Ok(SecretString::from(value))
}
