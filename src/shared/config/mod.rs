//! Gateway configuration module
//!
//! Provides the configuration consumed by the transport and the session
//! gateway: where the backend lives, which path refreshes the session, and the
//! timing knobs around the refresh.
//!
//! # Refresh grace period
//!
//! After a successful refresh the gateway waits `refresh_grace` before
//! replaying anything. The backend hands out the new credential as a cookie,
//! and in some environments the cookie is persisted asynchronously; the pause
//! is a race-avoidance heuristic, not a synchronization guarantee. Set it to
//! zero when the transport stores cookies synchronously (as `reqwest` does).

use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

/// Default backend URL
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

/// Default session refresh endpoint
pub const DEFAULT_REFRESH_PATH: &str = "/api/v1/identity/refresh";

/// Default pause between a successful refresh and the first replay
pub const DEFAULT_REFRESH_GRACE: Duration = Duration::from_millis(100);

/// Default transport timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default capacity of the session event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Largest accepted event channel capacity; the channel allocates every slot up front
pub const MAX_EVENT_CAPACITY: usize = 65_536;

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    api_url: Url,
    refresh_path: String,
    refresh_grace: Duration,
    timeout: Duration,
    event_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            refresh_grace: DEFAULT_REFRESH_GRACE,
            timeout: DEFAULT_TIMEOUT,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl GatewayConfig {
    /// Create a new GatewayConfigBuilder
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }

    /// Load configuration from `DOCPORTAL_*` environment variables
    ///
    /// Unset variables fall back to the defaults; set but malformed variables
    /// are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::builder();

        if let Ok(url) = std::env::var("DOCPORTAL_API_URL") {
            builder = builder.api_url(url);
        }
        if let Ok(path) = std::env::var("DOCPORTAL_REFRESH_PATH") {
            builder = builder.refresh_path(path);
        }
        if let Ok(raw) = std::env::var("DOCPORTAL_REFRESH_GRACE_MS") {
            let millis = parse_number("DOCPORTAL_REFRESH_GRACE_MS", &raw)?;
            builder = builder.refresh_grace(Duration::from_millis(millis));
        }
        if let Ok(raw) = std::env::var("DOCPORTAL_TIMEOUT_SECS") {
            let secs = parse_number("DOCPORTAL_TIMEOUT_SECS", &raw)?;
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Ok(raw) = std::env::var("DOCPORTAL_EVENT_CAPACITY") {
            let capacity = parse_number("DOCPORTAL_EVENT_CAPACITY", &raw)?;
            let capacity = usize::try_from(capacity).map_err(|e| ConfigError::InvalidValue {
                field: "DOCPORTAL_EVENT_CAPACITY",
                message: format!("{:?}: {}", raw, e),
            })?;
            builder = builder.event_capacity(capacity);
        }

        builder.build()
    }

    /// Backend base URL
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Get the full URL for an API path
    pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
        self.api_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Path of the session refresh endpoint
    pub fn refresh_path(&self) -> &str {
        &self.refresh_path
    }

    /// Pause between a successful refresh and the first replay
    pub fn refresh_grace(&self) -> Duration {
        self.refresh_grace
    }

    /// Transport request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Capacity of the session event channel
    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }
}

/// Builder for GatewayConfig
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    api_url: Option<String>,
    refresh_path: Option<String>,
    refresh_grace: Option<Duration>,
    timeout: Option<Duration>,
    event_capacity: Option<usize>,
}

impl GatewayConfigBuilder {
    /// Set the backend base URL
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Set the session refresh path
    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = Some(path.into());
        self
    }

    /// Set the post-refresh grace period
    pub fn refresh_grace(mut self, grace: Duration) -> Self {
        self.refresh_grace = Some(grace);
        self
    }

    /// Set the transport timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the session event channel capacity
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = Some(capacity);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<GatewayConfig, ConfigError> {
        let mut api_url = match self.api_url {
            Some(raw) => Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", raw, e)))?,
            None => Url::parse(DEFAULT_API_URL).map_err(|e| ConfigError::InvalidUrl(e.to_string()))?,
        };
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                api_url
            )));
        }
        // Url::join replaces the last segment unless the base ends with '/'
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        let refresh_path = self
            .refresh_path
            .unwrap_or_else(|| DEFAULT_REFRESH_PATH.to_string());
        if refresh_path.trim().is_empty() {
            return Err(ConfigError::MissingValue("refresh_path"));
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "timeout",
                message: "must be greater than zero".to_string(),
            });
        }

        let event_capacity = self.event_capacity.unwrap_or(DEFAULT_EVENT_CAPACITY);
        if event_capacity == 0 || event_capacity > MAX_EVENT_CAPACITY {
            return Err(ConfigError::InvalidValue {
                field: "event_capacity",
                message: format!("must be between 1 and {}", MAX_EVENT_CAPACITY),
            });
        }

        Ok(GatewayConfig {
            api_url,
            refresh_path,
            refresh_grace: self.refresh_grace.unwrap_or(DEFAULT_REFRESH_GRACE),
            timeout,
            event_capacity,
        })
    }
}

fn parse_number(variable: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidValue {
        field: variable,
        message: format!("{:?}: {}", raw, e),
    })
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}
