use std::fmt;
use std::time::Duration;

use http::HeaderMap;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::client::{apply_default_headers, AuthorizedClient};
use crate::auth::identity::{IdentityProvider, TokenRequest};
use crate::auth::token::AuthResult;
use crate::errors::AuthError;
use crate::observability::metrics::get_metrics;
use crate::utils::constants::TENANT_PLACEHOLDER;

/// When a cached auth result stops being reused without `force_renew`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenewalPolicy {
    /// reuse until the caller forces renewal; expiry is never inspected
    #[default]
    ExplicitOnly,
    /// renew once the token expires within `safety_margin_seconds`
    ExpiryAware { safety_margin_seconds: u64 },
}

impl RenewalPolicy {
    fn should_renew(&self, cached: &AuthResult) -> bool {
        match *self {
            RenewalPolicy::ExplicitOnly => false,
            RenewalPolicy::ExpiryAware {
                safety_margin_seconds,
            } => cached.expires_within(safety_margin_seconds),
        }
    }
}

/// Client-credential identity for one API plus its cached token.
///
/// Configuration fields are read from secret metadata names (`Instance`,
/// `TenantId`, `ClientId`, `ClientSecret`, `BaseAddress`, `Endpoint`,
/// `ResourceID`); missing names stay empty.
#[derive(Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct AuthCredential {
    /// authority template, `{0}` is replaced with the tenant id
    pub instance: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub base_address: String,
    pub endpoint: String,
    #[serde(rename = "ResourceID", alias = "ResourceId")]
    pub resource_id: String,

    #[serde(skip)]
    cached_token: Option<String>,
    #[serde(skip)]
    cached_auth_result: Option<AuthResult>,
    #[serde(skip)]
    renewal: RenewalPolicy,
    #[serde(skip)]
    http_timeout: Option<Duration>,
}

impl fmt::Debug for AuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCredential")
            .field("instance", &self.instance)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("base_address", &self.base_address)
            .field("endpoint", &self.endpoint)
            .field("resource_id", &self.resource_id)
            .field("has_cached_token", &self.cached_token.is_some())
            .field("cached_auth_result", &self.cached_auth_result)
            .field("renewal", &self.renewal)
            .finish()
    }
}

impl AuthCredential {
    pub fn with_renewal_policy(mut self, renewal: RenewalPolicy) -> Self {
        self.renewal = renewal;
        self
    }

    /// Timeout applied to clients built by [`Self::get_authorized_client`].
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    pub fn renewal_policy(&self) -> RenewalPolicy {
        self.renewal
    }

    pub fn authority_url(&self) -> String {
        self.instance.replace(TENANT_PLACEHOLDER, &self.tenant_id)
    }

    pub fn endpoint_address(&self) -> String {
        format!("{}{}", self.base_address, self.endpoint)
    }

    pub fn cached_token(&self) -> Option<&str> {
        self.cached_token.as_deref()
    }

    pub fn cached_auth_result(&self) -> Option<&AuthResult> {
        self.cached_auth_result.as_ref()
    }

    pub fn token_request(&self) -> TokenRequest {
        TokenRequest {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            authority_url: self.authority_url(),
            scopes: vec![self.resource_id.clone()],
        }
    }

    /// Returns the cached token or acquires a new one.
    ///
    /// A failed acquisition leaves the cache as it was and surfaces the error.
    pub async fn try_get_access_token<P>(
        &mut self,
        provider: &P,
        force_renew: bool,
    ) -> Result<String, AuthError>
    where
        P: IdentityProvider,
    {
        if !force_renew {
            let renewal = self.renewal;
            if let Some(cached) = self
                .cached_auth_result
                .as_ref()
                .filter(|cached| !renewal.should_renew(cached))
            {
                get_metrics().await.token_cache_hits.inc();
                debug!("reusing cached token for client '{}'", self.client_id);
                return Ok(cached.access_token.clone());
            }
        }

        let request = self.token_request();
        let auth_result = provider.acquire_token(&request).await?;
        let token = auth_result.access_token.clone();
        info!(
            "token acquired for client '{}', expires at {:?}",
            self.client_id,
            auth_result.expires_on()
        );
        self.cached_token = Some(token.clone());
        self.cached_auth_result = Some(auth_result);
        Ok(token)
    }

    /// Lenient [`Self::try_get_access_token`]: failures are logged and yield
    /// an empty token.
    pub async fn get_access_token<P>(&mut self, provider: &P, force_renew: bool) -> String
    where
        P: IdentityProvider,
    {
        match self.try_get_access_token(provider, force_renew).await {
            Ok(token) => token,
            Err(err) => {
                warn!(
                    "access token for client '{}' unavailable, continuing with empty token: {}",
                    self.client_id, err
                );
                String::new()
            }
        }
    }

    /// Authorizes `headers` with the (possibly empty) token and builds a new client.
    pub async fn authorize_headers<P>(
        &mut self,
        provider: &P,
        mut headers: HeaderMap,
    ) -> Result<AuthorizedClient, AuthError>
    where
        P: IdentityProvider,
    {
        let token = self.get_access_token(provider, false).await;
        apply_default_headers(&mut headers, &token)?;
        AuthorizedClient::new(headers, self.endpoint_address(), self.http_timeout)
    }

    /// New client for [`Self::endpoint_address`] with bearer authorization.
    ///
    /// Token failures do not fail this call; the bearer is then empty.
    pub async fn get_authorized_client<P>(&mut self, provider: &P) -> Result<AuthorizedClient, AuthError>
    where
        P: IdentityProvider,
    {
        self.authorize_headers(provider, HeaderMap::new()).await
    }

    /// Like [`Self::get_authorized_client`] but token failures are errors.
    pub async fn try_get_authorized_client<P>(
        &mut self,
        provider: &P,
    ) -> Result<AuthorizedClient, AuthError>
    where
        P: IdentityProvider,
    {
        let token = self.try_get_access_token(provider, false).await?;
        let mut headers = HeaderMap::new();
        apply_default_headers(&mut headers, &token)?;
        AuthorizedClient::new(headers, self.endpoint_address(), self.http_timeout)
    }
}
