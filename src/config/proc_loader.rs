use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::configuration::AppConfiguration;
use crate::config::settings::{LoggingConfig, SettingsConfig};
use crate::observability::metrics::get_metrics;

/// ================================
/// appsettings file layout
/// ================================
#[derive(Debug, Deserialize, Default)]
struct AppSettingsFile {
    #[serde(default)]
    settings: SettingsConfig,
    #[serde(default)]
    values: serde_yaml::Value,
}

/// Parsed settings plus the flattened configuration values.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub settings: SettingsConfig,
    pub configuration: AppConfiguration,
}

/// Load config from YAML file, expanding `${VAR}` references first
pub async fn file_to_config(path: &Path) -> Result<BootstrapConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read config file '{}'", path.display()))?;

    let expanded = expand_env_vars(&content);
    parse_config(expanded).await
}

pub async fn parse_config(content: String) -> Result<BootstrapConfig> {
    let metrics = get_metrics().await;
    let file: AppSettingsFile = serde_yaml::from_str(&content)
        .inspect_err(|e| {
            error!("parse config error: {}", e);
            metrics.parse_failures.inc();
        })?;

    let mut settings = file.settings;
    // Apply defaults
    if settings.logging.is_none() {
        settings.logging = Some(LoggingConfig::default());
    }

    let mut configuration = AppConfiguration::from_yaml(&file.values);
    configuration.overlay_env(&settings.env_prefix, utf8_env_vars());
    debug!("configuration loaded, {} keys", configuration.len());

    Ok(BootstrapConfig {
        settings,
        configuration,
    })
}

/// Process environment with non UTF-8 names or values skipped.
pub fn utf8_env_vars() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os().filter_map(|(name, value)| match (name.into_string(), value.into_string()) {
        (Ok(name), Ok(value)) => Some((name, value)),
        (name, _) => {
            debug!("skipping non utf-8 environment variable {:?}", name);
            None
        }
    })
}

/// Replaces `${NAME}` and `${NAME:default}` with the environment value,
/// the default, or an empty string. `$${` is written out as a literal `${`.
pub fn expand_env_vars(input: &str) -> String {
    static ENV_REF: OnceLock<Regex> = OnceLock::new();
    let re = ENV_REF.get_or_init(|| {
        Regex::new(r"\$\$\{|\$\{(\w+)(?::([^\}]+))?\}").expect("env reference pattern is valid")
    });
    re.replace_all(input, |caps: &regex::Captures| {
        let Some(var) = caps.get(1) else {
            return "${".to_string();
        };
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var.as_str()).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::configuration::Configuration;
    use crate::config::settings::LogFormat;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    #[serial]
    fn expand_env_vars_uses_value_then_default() {
        std::env::set_var("APP_BOOTSTRAP_TEST_TENANT", "tid-env");
        std::env::remove_var("APP_BOOTSTRAP_TEST_MISSING");

        let expanded = expand_env_vars(
            "a: ${APP_BOOTSTRAP_TEST_TENANT}\nb: ${APP_BOOTSTRAP_TEST_MISSING:fallback}\nc: ${APP_BOOTSTRAP_TEST_MISSING}",
        );

        assert_eq!(expanded, "a: tid-env\nb: fallback\nc: ");
        std::env::remove_var("APP_BOOTSTRAP_TEST_TENANT");
    }

    #[tokio::test]
    #[serial]
    async fn parse_config_applies_logging_default() -> Result<()> {
        let config = parse_config("values:\n  SubscriptionName: Orders\n".to_string()).await?;

        let logging = config.settings.logging.unwrap();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, LogFormat::Compact);
        assert_eq!(config.configuration.get("SubscriptionName").as_deref(), Some("Orders"));
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn environment_overrides_file_values() -> Result<()> {
        std::env::set_var("BOOTTEST_SubscriptionName", "Billing");
        let config = parse_config(
            "settings:\n  env_prefix: BOOTTEST_\nvalues:\n  SubscriptionName: Orders\n".to_string(),
        )
        .await;
        std::env::remove_var("BOOTTEST_SubscriptionName");

        assert_eq!(config?.configuration.get("SubscriptionName").as_deref(), Some("Billing"));
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn file_to_config_reads_and_expands() -> Result<()> {
        std::env::set_var("APP_BOOTSTRAP_TEST_SUBSCRIPTION", "Orders");
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(
            file,
            "settings:\n  logging:\n    level: debug\n    format: json\nvalues:\n  SubscriptionName: ${{APP_BOOTSTRAP_TEST_SUBSCRIPTION}}"
        )?;

        let config = file_to_config(file.path()).await?;
        std::env::remove_var("APP_BOOTSTRAP_TEST_SUBSCRIPTION");

        assert_eq!(config.settings.logging.unwrap().format, LogFormat::Json);
        assert_eq!(config.configuration.get("SubscriptionName").as_deref(), Some("Orders"));
        Ok(())
    }

    #[test]
    #[serial]
    fn escaped_reference_is_kept_literally() {
        std::env::set_var("APP_BOOTSTRAP_TEST_WORD", "expanded");

        let expanded = expand_env_vars("a: 'p@ss$${APP_BOOTSTRAP_TEST_WORD}x'\nb: 'a$${B:c}d'\nc: $$HOME");

        assert_eq!(expanded, "a: 'p@ss${APP_BOOTSTRAP_TEST_WORD}x'\nb: 'a${B:c}d'\nc: $$HOME");
        std::env::remove_var("APP_BOOTSTRAP_TEST_WORD");
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial]
    async fn non_utf8_environment_is_skipped() -> Result<()> {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        std::env::set_var("APP_BOOTSTRAP_TEST_BINARY", OsString::from_vec(vec![0x66, 0xff, 0x6f]));
        std::env::set_var("APP_Region", "west");
        let config = tokio::spawn(parse_config("values:\n  SubscriptionName: Orders\n".to_string())).await;
        std::env::remove_var("APP_BOOTSTRAP_TEST_BINARY");
        std::env::remove_var("APP_Region");

        let config = config.expect("config parsing does not panic")?;
        assert_eq!(config.configuration.get("SubscriptionName").as_deref(), Some("Orders"));
        assert_eq!(config.configuration.get("Region").as_deref(), Some("west"));
        assert!(config.configuration.get("BOOTSTRAP_TEST_BINARY").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn invalid_yaml_is_an_error() {
        assert!(parse_config("settings: [unclosed".to_string()).await.is_err());
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        assert!(file_to_config(Path::new("does/not/exist.yaml")).await.is_err());
    }
}
