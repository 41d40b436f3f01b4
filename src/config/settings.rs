use serde::Deserialize;
use std::time::Duration;

use crate::auth::credential::RenewalPolicy;
use crate::utils::constants::{
    DEFAULT_ENV_PREFIX, DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_SAFETY_MARGIN_SECS, DEFAULT_TOKEN_PATH,
};

/// ================================
/// Global bootstrap settings
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct SettingsConfig {
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub identity: IdentityConfig,
    pub refresh: Option<RefreshConfig>,
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// environment variables with this prefix override configuration values
    #[serde(default = "default_env_prefix")]
    pub env_prefix: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            logging: None,
            identity: IdentityConfig::default(),
            refresh: None,
            metrics: MetricsConfig::default(),
            env_prefix: default_env_prefix(),
        }
    }
}

/// ================================
/// Identity provider / token lifecycle
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// appended to the authority url, e.g. `oauth2/v2.0/token`
    #[serde(default = "default_token_path")]
    pub token_path: String,
    #[serde(default)]
    pub renewal: RenewalMode,
    /// only used with `renewal: expiry_aware`
    #[serde(default = "default_safety_margin_seconds")]
    pub safety_margin_seconds: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            token_path: default_token_path(),
            renewal: RenewalMode::default(),
            safety_margin_seconds: default_safety_margin_seconds(),
        }
    }
}

impl IdentityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn renewal_policy(&self) -> RenewalPolicy {
        match self.renewal {
            RenewalMode::ExplicitOnly => RenewalPolicy::ExplicitOnly,
            RenewalMode::ExpiryAware => RenewalPolicy::ExpiryAware {
                safety_margin_seconds: self.safety_margin_seconds,
            },
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RenewalMode {
    /// cached token is reused until the caller forces renewal
    ExplicitOnly,
    /// cached token is renewed once it is within the safety margin of expiry
    #[default]
    ExpiryAware,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshConfig {
    pub interval_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_path")]
    pub path: String,
    #[serde(default)]
    pub is_enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            path: default_metrics_path(),
            is_enabled: false,
        }
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new("info".to_owned(), LogFormat::Compact)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

fn default_token_path() -> String {
    DEFAULT_TOKEN_PATH.to_string()
}

fn default_safety_margin_seconds() -> u64 {
    DEFAULT_SAFETY_MARGIN_SECS
}

fn default_env_prefix() -> String {
    DEFAULT_ENV_PREFIX.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_settings_fall_back_to_defaults() {
        let settings: SettingsConfig = serde_yaml::from_str("{}").unwrap();
        assert!(settings.logging.is_none());
        assert!(settings.refresh.is_none());
        assert_eq!(settings.identity.timeout_ms, DEFAULT_HTTP_TIMEOUT_MS);
        assert_eq!(settings.identity.token_path, "oauth2/v2.0/token");
        assert_eq!(settings.metrics.path, "/metrics");
        assert_eq!(settings.env_prefix, "APP_");
        assert_eq!(
            settings.identity.renewal_policy(),
            RenewalPolicy::ExpiryAware { safety_margin_seconds: 60 }
        );
    }

    #[test]
    fn explicit_only_renewal_maps_to_policy() {
        let identity: IdentityConfig =
            serde_yaml::from_str("renewal: explicit_only\nsafety_margin_seconds: 5").unwrap();
        assert_eq!(identity.renewal_policy(), RenewalPolicy::ExplicitOnly);
    }
}
