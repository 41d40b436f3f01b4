use std::time::Duration;

use http::header::{ACCEPT, AUTHORIZATION};
use http::{HeaderMap, HeaderValue, Method};
use reqwest::{Client, RequestBuilder};

use crate::errors::AuthError;
use crate::utils::constants::{BEARER_PREFIX, JSON_MEDIA_TYPE};

/// Adds `Accept: application/json` unless already present and sets
/// `Authorization: Bearer <token>`, replacing any previous value.
pub fn apply_default_headers(headers: &mut HeaderMap, token: &str) -> Result<(), AuthError> {
    let accepts_json = headers
        .get_all(ACCEPT)
        .iter()
        .any(|value| value.as_bytes() == JSON_MEDIA_TYPE.as_bytes());
    if !accepts_json {
        headers.append(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));
    }

    let mut bearer = HeaderValue::from_str(&format!("{}{}", BEARER_PREFIX, token))
        .map_err(|err| AuthError::InvalidHeader(err.to_string()))?;
    bearer.set_sensitive(true);
    headers.insert(AUTHORIZATION, bearer);
    Ok(())
}

/// HTTP client carrying bearer authorization for one API endpoint.
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    client: Client,
    default_headers: HeaderMap,
    endpoint_address: String,
}

impl AuthorizedClient {
    pub fn new(
        default_headers: HeaderMap,
        endpoint_address: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, AuthError> {
        let mut builder = Client::builder().default_headers(default_headers.clone());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| AuthError::ClientBuild(err.to_string()))?;

        Ok(Self {
            client,
            default_headers,
            endpoint_address: endpoint_address.into(),
        })
    }

    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    pub fn endpoint_address(&self) -> &str {
        &self.endpoint_address
    }

    pub fn http(&self) -> &Client {
        &self.client
    }

    /// Request to `endpoint_address + path`.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.endpoint_address, path))
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }
}
