//! Environment-driven configuration.
//!
//! Values come from the process environment, which `main` seeds from `.env`
//! or the bundled `assets/config.env`. Parsing goes through
//! [`AppConfig::from_lookup`] so callers can supply any key source.

use crate::error::ConfigError;
use std::time::Duration;

pub const BASE_URL_KEY: &str = "API_BASE_URL";
/// Name used by the web client; accepted as a fallback.
pub const BASE_URL_ALIAS_KEY: &str = "NEXT_PUBLIC_API_BASE_URL";
pub const TIMEOUT_KEY: &str = "RESQHER_REQUEST_TIMEOUT_SECS";
pub const RETRY_MAX_KEY: &str = "RESQHER_RETRY_MAX";
pub const RETRY_BACKOFF_KEY: &str = "RESQHER_RETRY_BACKOFF_MS";
pub const THERAPY_DELAY_KEY: &str = "RESQHER_THERAPY_DELAY_MS";

const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);
const DEFAULT_THERAPY_DELAY: Duration = Duration::from_millis(1000);

/// Connection settings for the inference backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackendConfig {
    /// Base address such as `http://localhost:8000`. `None` means unset.
    pub base_url: Option<String>,
    /// Applied per request only when configured.
    pub request_timeout: Option<Duration>,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(Some(base_url.into())),
            request_timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

/// Automatic retry of failed submissions. Disabled unless `max_retries > 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn disabled() -> Self {
        Self {
            max_retries: 0,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    pub const fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// Delay before retry number `retry` (zero-based), doubling each time.
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(retry))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub retry: RetryPolicy,
    pub therapy_delay: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            retry: RetryPolicy::disabled(),
            therapy_delay: DEFAULT_THERAPY_DELAY,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = normalize_base_url(lookup(BASE_URL_KEY))
            .or_else(|| normalize_base_url(lookup(BASE_URL_ALIAS_KEY)));

        let request_timeout = match parse_u64(&lookup, TIMEOUT_KEY)? {
            Some(0) => return Err(ConfigError::ZeroDuration { key: TIMEOUT_KEY }),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        let max_retries = match parse_u64(&lookup, RETRY_MAX_KEY)? {
            Some(n) => u32::try_from(n).map_err(|_| ConfigError::InvalidNumber {
                key: RETRY_MAX_KEY,
                value: n.to_string(),
            })?,
            None => 0,
        };
        let backoff = parse_u64(&lookup, RETRY_BACKOFF_KEY)?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_RETRY_BACKOFF);

        let therapy_delay = parse_u64(&lookup, THERAPY_DELAY_KEY)?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_THERAPY_DELAY);

        Ok(Self {
            backend: BackendConfig {
                base_url,
                request_timeout,
            },
            retry: RetryPolicy::new(max_retries, backoff),
            therapy_delay,
        })
    }
}

fn normalize_base_url(raw: Option<String>) -> Option<String> {
    let trimmed = raw?.trim().trim_end_matches('/').to_string();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

fn parse_u64<F>(lookup: &F, key: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u64>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidNumber {
            key,
            value: raw.to_string(),
        })
}
