use std::time::Duration;

use tracing::{info, warn};

use crate::auth::client::AuthorizedClient;
use crate::auth::credential::{AuthCredential, RenewalPolicy};
use crate::auth::identity::IdentityProvider;
use crate::config::configuration::Configuration;
use crate::config::settings::IdentityConfig;
use crate::errors::FactoryError;
use crate::observability::metrics::get_metrics;
use crate::secrets::record::SecretRecord;
use crate::secrets::store::SecretStore;
use crate::utils::constants::{API_SECRET_SUFFIX, SUBSCRIPTION_NAME_KEY};

static SUCCESS_MSG: &str = "success";
static DEGRADED_MSG: &str = "degraded";
static ERROR_MSG: &str = "error";

/// Applied to every credential the factory derives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientFactoryOptions {
    pub renewal: RenewalPolicy,
    pub http_timeout: Option<Duration>,
}

impl ClientFactoryOptions {
    pub fn from_settings(identity: &IdentityConfig) -> Self {
        Self {
            renewal: identity.renewal_policy(),
            http_timeout: Some(identity.timeout()),
        }
    }
}

/// Everything resolved while building an authorized API client.
///
/// Lenient construction stops at the first failure, so later fields may be unset.
#[derive(Debug, Default)]
pub struct AuthorizedClientDetails {
    pub secret_name: String,
    pub secret: Option<SecretRecord>,
    pub auth_credential: Option<AuthCredential>,
    pub authorized_client: Option<AuthorizedClient>,
}

impl AuthorizedClientDetails {
    pub fn is_complete(&self) -> bool {
        self.secret.is_some() && self.auth_credential.is_some() && self.authorized_client.is_some()
    }
}

/// Secret name holding the credentials of a subscription's API.
pub fn api_secret_name(subscription_name: &str) -> String {
    format!("{}{}", subscription_name, API_SECRET_SUFFIX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Lenient,
    Strict,
}

/// Builds [`AuthorizedClientDetails`] from a secret store, configuration and identity provider.
pub struct AuthorizedClientFactory<'a, S, C, P> {
    store: &'a S,
    configuration: &'a C,
    provider: &'a P,
    options: ClientFactoryOptions,
}

impl<'a, S, C, P> AuthorizedClientFactory<'a, S, C, P>
where
    S: SecretStore,
    C: Configuration,
    P: IdentityProvider,
{
    pub fn new(store: &'a S, configuration: &'a C, provider: &'a P) -> Self {
        Self {
            store,
            configuration,
            provider,
            options: ClientFactoryOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ClientFactoryOptions) -> Self {
        self.options = options;
        self
    }

    /// Never fails: errors are logged and the details are returned as far as
    /// they got.
    pub async fn create(&self, subscription_name: Option<&str>) -> AuthorizedClientDetails {
        let mut details = AuthorizedClientDetails::default();
        let outcome = self.populate(&mut details, subscription_name, Mode::Lenient).await;
        if let Err(err) = outcome {
            warn!("authorized client for '{}' is incomplete: {}", details.secret_name, err);
        }
        details
    }

    pub async fn try_create(
        &self,
        subscription_name: Option<&str>,
    ) -> Result<AuthorizedClientDetails, FactoryError> {
        let mut details = AuthorizedClientDetails::default();
        self.populate(&mut details, subscription_name, Mode::Strict).await?;
        Ok(details)
    }

    async fn populate(
        &self,
        details: &mut AuthorizedClientDetails,
        subscription_name: Option<&str>,
        mode: Mode,
    ) -> Result<(), FactoryError> {
        let metrics = get_metrics().await;
        let result = self.populate_steps(details, subscription_name, mode).await;
        let token_missing = details
            .auth_credential
            .as_ref()
            .map_or(true, |credential| credential.cached_token().is_none());
        let outcome = match result {
            Ok(()) if token_missing => DEGRADED_MSG,
            Ok(()) => SUCCESS_MSG,
            Err(_) => ERROR_MSG,
        };
        metrics.authorized_clients.with_label_values(&[outcome]).inc();
        result
    }

    async fn populate_steps(
        &self,
        details: &mut AuthorizedClientDetails,
        subscription_name: Option<&str>,
        mode: Mode,
    ) -> Result<(), FactoryError> {
        // 1. resolve secret name
        let subscription = match subscription_name
            .map(str::to_owned)
            .or_else(|| self.configuration.get(SUBSCRIPTION_NAME_KEY))
        {
            Some(subscription) => subscription,
            None if mode == Mode::Strict => {
                return Err(FactoryError::MissingSubscriptionName(SUBSCRIPTION_NAME_KEY))
            }
            None => String::new(),
        };
        details.secret_name = api_secret_name(&subscription);

        // 2. fetch secret
        let secret = self
            .store
            .secret(&details.secret_name)
            .await
            .ok_or_else(|| FactoryError::SecretNotFound(details.secret_name.clone()))?;
        let secret = details.secret.insert(secret);

        // 3. metadata -> credential
        let credential: AuthCredential = match mode {
            Mode::Lenient => secret.convert_metadata_to(),
            Mode::Strict => secret.try_convert_metadata_to()?,
        };
        let mut credential = credential.with_renewal_policy(self.options.renewal);
        if let Some(timeout) = self.options.http_timeout {
            credential = credential.with_http_timeout(timeout);
        }
        let credential = details.auth_credential.insert(credential);

        // 4. authorized client
        let client = match mode {
            Mode::Lenient => credential.get_authorized_client(self.provider).await,
            Mode::Strict => credential.try_get_authorized_client(self.provider).await,
        }?;
        info!(
            "authorized client ready for '{}' at '{}'",
            details.secret_name,
            client.endpoint_address()
        );
        details.authorized_client = Some(client);
        Ok(())
    }
}

/// Lenient construction with default options.
pub async fn create_authorized_api_client<S, C, P>(
    store: &S,
    configuration: &C,
    provider: &P,
    subscription_name: Option<&str>,
) -> AuthorizedClientDetails
where
    S: SecretStore,
    C: Configuration,
    P: IdentityProvider,
{
    AuthorizedClientFactory::new(store, configuration, provider)
        .create(subscription_name)
        .await
}

/// Strict construction with default options.
pub async fn try_create_authorized_api_client<S, C, P>(
    store: &S,
    configuration: &C,
    provider: &P,
    subscription_name: Option<&str>,
) -> Result<AuthorizedClientDetails, FactoryError>
where
    S: SecretStore,
    C: Configuration,
    P: IdentityProvider,
{
    AuthorizedClientFactory::new(store, configuration, provider)
        .try_create(subscription_name)
        .await
}
