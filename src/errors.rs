//! Error kinds surfaced by the strict (`try_*`) operations.
//!
//! The lenient operations log these and fall back to empty/default values.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("token endpoint rejected the request: {status} {body}")]
    Rejected { status: u16, body: String },
    #[error("failed to request token: {0}")]
    Transport(String),
    #[error("failed to parse token response: {0}")]
    InvalidResponse(String),
    #[error("token cannot be used as an authorization header: {0}")]
    InvalidHeader(String),
    #[error("failed to build http client: {0}")]
    ClientBuild(String),
}

#[derive(Debug, Error)]
#[error("secret metadata cannot be converted to {target}: {source}")]
pub struct ConversionError {
    pub target: &'static str,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("no subscription name given and '{0}' is not configured")]
    MissingSubscriptionName(&'static str),
    #[error("secret '{0}' not found")]
    SecretNotFound(String),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}
