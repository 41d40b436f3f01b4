use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::auth::token::{AuthResult, TokenResponse};
use crate::config::settings::IdentityConfig;
use crate::errors::AuthError;
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::utils::constants::CLIENT_CREDENTIALS_GRANT;

static SUCCESS_MSG: &str = "success";
static ERROR_MSG: &str = "error";

/// Client-credential token request
#[derive(Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub client_id: String,
    pub client_secret: String,
    pub authority_url: String,
    pub scopes: Vec<String>,
}

impl fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRequest")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("authority_url", &self.authority_url)
            .field("scopes", &self.scopes)
            .finish()
    }
}

pub trait IdentityProvider {
    fn acquire_token(
        &self,
        request: &TokenRequest,
    ) -> impl Future<Output = Result<AuthResult, AuthError>> + Send;
}

/// OAuth2 client-credentials grant against `<authority>/<token_path>`.
#[derive(Debug, Clone)]
pub struct ClientCredentialsProvider {
    client: Client,
    token_path: String,
}

impl ClientCredentialsProvider {
    pub fn new(token_path: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AuthError::ClientBuild(err.to_string()))?;
        Ok(Self::with_client(client, token_path))
    }

    pub fn from_settings(identity: &IdentityConfig) -> Result<Self, AuthError> {
        Self::new(identity.token_path.clone(), identity.timeout())
    }

    pub fn with_client(client: Client, token_path: impl Into<String>) -> Self {
        Self {
            client,
            token_path: token_path.into(),
        }
    }

    pub fn token_url(&self, authority_url: &str) -> String {
        let path = self.token_path.trim_start_matches('/');
        if path.is_empty() {
            return authority_url.to_owned();
        }
        format!("{}/{}", authority_url.trim_end_matches('/'), path)
    }

    async fn request_token(&self, request: &TokenRequest) -> Result<AuthResult, AuthError> {
        let url = self.token_url(&request.authority_url);
        let scope = request.scopes.join(" ");
        let form = [
            ("grant_type", CLIENT_CREDENTIALS_GRANT),
            ("client_id", request.client_id.as_str()),
            ("client_secret", request.client_secret.as_str()),
            ("scope", scope.as_str()),
        ];

        debug!("requesting token from '{}' for client '{}'", url, request.client_id);
        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;

        if !status.is_success() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(TokenResponse::parse(&body)?.into_auth_result())
    }
}

impl IdentityProvider for ClientCredentialsProvider {
    async fn acquire_token(&self, request: &TokenRequest) -> Result<AuthResult, AuthError> {
        let metrics = get_metrics().await;
        let start = get_instant();
        let result = self.request_token(request).await;
        metrics
            .token_acquisition_duration
            .observe(start.elapsed().as_secs_f64());

        match &result {
            Ok(auth_result) => {
                metrics.token_acquisitions.with_label_values(&[SUCCESS_MSG]).inc();
                debug!(expires_at = auth_result.expires_on_unix_ts, "token acquired for client '{}'", request.client_id);
            }
            Err(err) => {
                metrics.token_acquisitions.with_label_values(&[ERROR_MSG]).inc();
                warn!("token acquisition for client '{}' failed: {}", request.client_id, err);
            }
        }
        result
    }
}
