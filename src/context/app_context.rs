use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::info;

use crate::auth::identity::ClientCredentialsProvider;
use crate::config::configuration::SharedConfiguration;
use crate::config::proc_loader::{file_to_config, BootstrapConfig};
use crate::config::refresh::spawn_refresh_loop;
use crate::config::settings::SettingsConfig;
use crate::errors::FactoryError;
use crate::factory::authorized_client::{
    AuthorizedClientDetails, AuthorizedClientFactory, ClientFactoryOptions,
};
use crate::secrets::store::{file_to_secret_store, InMemorySecretStore, SecretStore};

/// State built once at startup and handed to everything that needs
/// configuration, secrets or authorized clients.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub settings: SettingsConfig,
    pub configuration: SharedConfiguration,
    pub secrets: InMemorySecretStore,
    pub identity: ClientCredentialsProvider,
}

impl AppContext {
    pub fn new(
        settings: SettingsConfig,
        configuration: SharedConfiguration,
        secrets: InMemorySecretStore,
    ) -> Result<Self> {
        let identity = ClientCredentialsProvider::from_settings(&settings.identity)
            .context("cannot build identity provider")?;
        Ok(Self {
            settings,
            configuration,
            secrets,
            identity,
        })
    }

    /// Loads configuration and secrets files.
    pub async fn bootstrap(config_path: &Path, secrets_path: &Path) -> Result<Self> {
        let config = file_to_config(config_path).await?;
        Self::with_config(config, secrets_path).await
    }

    /// Same as [`Self::bootstrap`] for an already parsed configuration file.
    pub async fn with_config(config: BootstrapConfig, secrets_path: &Path) -> Result<Self> {
        let secrets = file_to_secret_store(secrets_path).await?;
        info!(
            "bootstrap complete: {} configuration keys, {} secrets",
            config.configuration.len(),
            secrets.len().await
        );
        Self::new(
            config.settings,
            SharedConfiguration::new(config.configuration),
            secrets,
        )
    }

    pub fn factory_options(&self) -> ClientFactoryOptions {
        ClientFactoryOptions::from_settings(&self.settings.identity)
    }

    /// Lenient: see [`AuthorizedClientFactory::create`].
    pub async fn authorized_api_client(
        &self,
        subscription_name: Option<&str>,
    ) -> AuthorizedClientDetails {
        let configuration = self.configuration.snapshot().await;
        AuthorizedClientFactory::new(&self.secrets, &configuration, &self.identity)
            .with_options(self.factory_options())
            .create(subscription_name)
            .await
    }

    /// Strict: see [`AuthorizedClientFactory::try_create`].
    pub async fn try_authorized_api_client(
        &self,
        subscription_name: Option<&str>,
    ) -> Result<AuthorizedClientDetails, FactoryError> {
        let configuration = self.configuration.snapshot().await;
        AuthorizedClientFactory::new(&self.secrets, &configuration, &self.identity)
            .with_options(self.factory_options())
            .try_create(subscription_name)
            .await
    }

    pub async fn connection_string(&self, name: &str) -> Option<String> {
        self.secrets.connection_string(name).await
    }

    /// Starts the configuration refresh loop when `settings.refresh` is set.
    pub fn start_refresh(&self, config_path: PathBuf) -> Option<JoinHandle<()>> {
        let refresh = self.settings.refresh.as_ref()?;
        let interval = Duration::from_secs(refresh.interval_seconds.max(1));
        info!(
            "configuration refresh every {}s from '{}'",
            interval.as_secs(),
            config_path.display()
        );
        Some(spawn_refresh_loop(
            config_path,
            self.configuration.clone(),
            interval,
        ))
    }
}
