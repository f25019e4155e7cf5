//! Container configuration.
//!
//! Settings come from code (builder setters), from any [`ConfigSource`]
//! (environment variables out of the box) or, with the `config` feature,
//! from JSON.

use std::env;
use std::time::Duration;

#[cfg(feature = "config")]
use serde::Deserialize;
use tracing::warn;

use crate::error::{DiError, DiResult};
use crate::registration::DuplicatePolicy;

/// Default environment prefix for [`ContainerConfig::from_env`].
pub const ENV_PREFIX: &str = "PROXY_DI";

/// A raw configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Boolean(bool),
}

impl ConfigValue {
    fn parse(raw: String) -> Self {
        if let Ok(int_val) = raw.parse::<i64>() {
            ConfigValue::Integer(int_val)
        } else if let Ok(bool_val) = raw.parse::<bool>() {
            ConfigValue::Boolean(bool_val)
        } else {
            ConfigValue::String(raw)
        }
    }

    fn as_u64(&self, key: &str) -> DiResult<u64> {
        match self {
            ConfigValue::Integer(i) if *i >= 0 => Ok(*i as u64),
            other => Err(DiError::Config(format!("{} must be a non-negative integer, got {:?}", key, other))),
        }
    }
}

/// Where configuration values come from.
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    /// Looks up a lowercase, underscore-separated key.
    fn get(&self, key: &str) -> Option<ConfigValue>;
}

/// Environment variables, optionally under a prefix.
///
/// Key `max_depth` with prefix `PROXY_DI` reads `PROXY_DI_MAX_DEPTH`.
#[derive(Debug, Default)]
pub struct EnvironmentConfigSource {
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: Some(prefix.into()) }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        let env_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key.to_uppercase()),
            None => key.to_uppercase(),
        };
        env::var(env_key).ok().map(ConfigValue::parse)
    }
}

/// Runtime settings of a provider tree.
///
/// # Examples
///
/// ```
/// use proxy_di::{ContainerConfig, DuplicatePolicy};
/// use std::time::Duration;
///
/// let config = ContainerConfig::default()
///     .with_proxy_idle_expiry(Duration::from_secs(30))
///     .with_sweep_interval(None)
///     .with_duplicate_policy(DuplicatePolicy::Reject);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.proxy_idle_expiry(), Duration::from_secs(30));
/// assert!(config.sweep_interval().is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerConfig {
    /// Idle time after which a cached type proxy is evicted
    pub proxy_idle_expiry_ms: u64,
    /// Period of the background pool sweeper; `None` disables the thread
    pub sweep_interval_ms: Option<u64>,
    /// Handling of duplicate registrations at one level
    pub duplicate_policy: DuplicatePolicy,
    /// Maximum nesting of in-flight builds on one thread
    pub max_depth: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            proxy_idle_expiry_ms: 300_000,
            sweep_interval_ms: Some(60_000),
            duplicate_policy: DuplicatePolicy::FirstWins,
            max_depth: 1024,
        }
    }
}

impl ContainerConfig {
    pub fn with_proxy_idle_expiry(mut self, expiry: Duration) -> Self {
        self.proxy_idle_expiry_ms = expiry.as_millis() as u64;
        self
    }

    /// Sub-millisecond intervals round up to 1 ms.
    pub fn with_sweep_interval(mut self, interval: Option<Duration>) -> Self {
        self.sweep_interval_ms = interval.map(|i| match i.as_millis() as u64 {
            0 if !i.is_zero() => 1,
            ms => ms,
        });
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn proxy_idle_expiry(&self) -> Duration {
        Duration::from_millis(self.proxy_idle_expiry_ms)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_ms.map(Duration::from_millis)
    }

    /// Defaults overlaid with `PROXY_DI_*` environment variables.
    pub fn from_env() -> DiResult<Self> {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// Defaults overlaid with `<PREFIX>_*` environment variables.
    pub fn from_env_with_prefix(prefix: &str) -> DiResult<Self> {
        Self::load(&EnvironmentConfigSource::with_prefix(prefix))
    }

    /// Defaults overlaid with whatever `source` provides.
    ///
    /// `sweep_interval_ms` accepts `0` or `off` to disable the sweeper.
    pub fn load(source: &dyn ConfigSource) -> DiResult<Self> {
        let mut config = Self::default();

        if let Some(value) = source.get("proxy_idle_expiry_ms") {
            config.proxy_idle_expiry_ms = value.as_u64("proxy_idle_expiry_ms")?;
        }
        if let Some(value) = source.get("sweep_interval_ms") {
            config.sweep_interval_ms = match value {
                ConfigValue::String(s) if s.eq_ignore_ascii_case("off") => None,
                ConfigValue::Boolean(false) => None,
                other => match other.as_u64("sweep_interval_ms")? {
                    0 => None,
                    ms => Some(ms),
                },
            };
        }
        if let Some(value) = source.get("duplicate_policy") {
            config.duplicate_policy = match value {
                ConfigValue::String(s) => s.parse()?,
                other => return Err(DiError::Config(format!("duplicate_policy must be a string, got {:?}", other))),
            };
        }
        if let Some(value) = source.get("max_depth") {
            config.max_depth = value.as_u64("max_depth")? as usize;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON object; missing fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> DiResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| DiError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DiResult<()> {
        if self.max_depth == 0 {
            return Err(DiError::Config("max_depth must be at least 1".into()));
        }
        if self.sweep_interval_ms == Some(0) {
            return Err(DiError::Config("sweep_interval_ms must be positive; use None to disable".into()));
        }
        Ok(())
    }

    /// Replaces invalid fields with their defaults, logging each one.
    pub(crate) fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.max_depth == 0 {
            warn!(target: "proxy_di", fallback = defaults.max_depth, "max_depth must be at least 1");
            self.max_depth = defaults.max_depth;
        }
        if self.sweep_interval_ms == Some(0) {
            warn!(
                target: "proxy_di",
                fallback_ms = ?defaults.sweep_interval_ms,
                "sweep interval must be positive"
            );
            self.sweep_interval_ms = defaults.sweep_interval_ms;
        }
        self
    }
}
