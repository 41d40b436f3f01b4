use std::fmt;

use anyhow::{anyhow, Result};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::errors::AuthError;
use crate::helpers::time::{now_u64, unix_to_datetime};
use crate::utils::constants::DEFAULT_TOKEN_TTL_SECS;

/// Token returned by the identity provider.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthResult {
    pub access_token: String,
    pub token_type: String,
    pub expires_on_unix_ts: u64, // UNIX TIMESTAMP
}

impl AuthResult {
    pub fn new(access_token: impl Into<String>, expires_on_unix_ts: u64) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "Bearer".to_owned(),
            expires_on_unix_ts,
        }
    }

    pub fn expires_on(&self) -> Option<DateTime<Utc>> {
        unix_to_datetime(self.expires_on_unix_ts)
    }

    /// True once `now + safety_margin_seconds` reaches the expiry.
    pub fn expires_within(&self, safety_margin_seconds: u64) -> bool {
        now_u64().saturating_add(safety_margin_seconds) >= self.expires_on_unix_ts
    }
}

impl fmt::Debug for AuthResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResult")
            .field("access_token", &"***")
            .field("token_type", &self.token_type)
            .field("expires_on_unix_ts", &self.expires_on_unix_ts)
            .finish()
    }
}

/// OAuth2 token endpoint response body
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenResponse {
    pub fn parse(body: &str) -> Result<Self, AuthError> {
        serde_json::from_str(body).map_err(|err| AuthError::InvalidResponse(err.to_string()))
    }

    /// Expiry from `expires_in`, else the JWT `exp` claim, else the default TTL.
    pub fn into_auth_result(self) -> AuthResult {
        let now = now_u64();
        let expires_on_unix_ts = match self.expires_in {
            Some(expires_in) => now.saturating_add(expires_in),
            None => get_jwt_token_expiration(&self.access_token).unwrap_or_else(|err| {
                debug!("no expires_in and no usable jwt exp ({}), using default ttl", err);
                now.saturating_add(DEFAULT_TOKEN_TTL_SECS)
            }),
        };

        AuthResult {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_owned()),
            expires_on_unix_ts,
        }
    }
}

// jwt token
#[derive(Debug, Deserialize)]
struct JwtClaims {
    exp: u64,
}

fn decode_jwt_from_string(token_string: &str) -> Result<JwtClaims> {
    let parts: Vec<&str> = token_string.split('.').collect();
    if parts.len() != 3 {
        return Err(anyhow!("invalid JWT format"));
    }

    let payload = parts[1].trim_end_matches('=');
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| anyhow!("base64 decode error: {}", e))?;

    serde_json::from_slice::<JwtClaims>(&decoded).map_err(|e| anyhow!("invalid JWT payload: {}", e))
}

fn get_jwt_token_expiration(token_value: &str) -> Result<u64> {
    let claims = decode_jwt_from_string(token_value)?;
    debug!(expires_at = claims.exp, "jwt parsed successfully");
    Ok(claims.exp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn sample_jwt(exp: u64) -> String {
        // minimal unsigned JWT for tests: {"exp": exp}
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{}}}"#, exp));
        format!("{}.{}.", header, payload)
    }

    #[test]
    fn expires_in_wins() {
        let now = now_u64();
        let result = TokenResponse::parse(r#"{"access_token":"abc","token_type":"Bearer","expires_in":120}"#)
            .unwrap()
            .into_auth_result();

        assert_eq!(result.access_token, "abc");
        assert!(result.expires_on_unix_ts >= now + 120);
        assert!(result.expires_on_unix_ts <= now_u64() + 120);
    }

    #[test]
    fn jwt_exp_is_used_without_expires_in() {
        let exp = now_u64() + 900;
        let body = format!(r#"{{"access_token":"{}"}}"#, sample_jwt(exp));
        let result = TokenResponse::parse(&body).unwrap().into_auth_result();

        assert_eq!(result.expires_on_unix_ts, exp);
        assert_eq!(result.token_type, "Bearer");
    }

    #[test]
    fn opaque_token_gets_default_ttl() {
        let now = now_u64();
        let result = TokenResponse::parse(r#"{"access_token":"opaque"}"#).unwrap().into_auth_result();
        assert!(result.expires_on_unix_ts >= now + DEFAULT_TOKEN_TTL_SECS);
    }

    #[test]
    fn missing_access_token_is_invalid_response() {
        let err = TokenResponse::parse(r#"{"token_type":"Bearer"}"#).unwrap_err();
        assert!(matches!(err, AuthError::InvalidResponse(_)));
    }

    #[test]
    fn expires_within_honours_margin() {
        let result = AuthResult::new("t", now_u64() + 30);
        assert!(!result.expires_within(0));
        assert!(result.expires_within(60));
        assert!(AuthResult::new("t", 0).expires_within(0));
    }

    #[test]
    fn debug_output_hides_token() {
        let rendered = format!("{:?}", AuthResult::new("very-secret", 1));
        assert!(!rendered.contains("very-secret"));
    }
}
