// tests/common/mod.rs
pub use axum::Router;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use reqwest::Client;

use crate::auth::identity::{IdentityProvider, TokenRequest};
use crate::auth::token::AuthResult;
use crate::errors::AuthError;
use crate::helpers::time::now_u64;
use crate::secrets::record::SecretRecord;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

/// Secret shaped like a provisioned API secret; `instance` is the authority template.
pub fn orders_api_secret(instance: &str) -> SecretRecord {
    SecretRecord::new("Orders.Api", "api-key")
        .with_category("api")
        .with_description("Orders API credentials")
        .with_metadata("Instance", instance)
        .with_metadata("TenantId", "tid-1")
        .with_metadata("ClientId", "cid-1")
        .with_metadata("ClientSecret", "sec-1")
        .with_metadata("BaseAddress", "https://api.example.com")
        .with_metadata("Endpoint", "/v1")
        .with_metadata("ResourceID", "res-1")
}

/// In-process identity provider: issues `token-<n>` for the n-th call,
/// or rejects with 401 once failing.
pub struct MockIdentityProvider {
    calls: AtomicUsize,
    failing: AtomicBool,
    expires_on_unix_ts: Option<u64>,
    last_request: Mutex<Option<TokenRequest>>,
}

impl MockIdentityProvider {
    pub fn succeeding() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            expires_on_unix_ts: None,
            last_request: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        let provider = Self::succeeding();
        provider.fail_from_now_on();
        provider
    }

    pub fn with_expiry(mut self, expires_on_unix_ts: u64) -> Self {
        self.expires_on_unix_ts = Some(expires_on_unix_ts);
        self
    }

    pub fn fail_from_now_on(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Acquisition attempts, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<TokenRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

impl IdentityProvider for MockIdentityProvider {
    async fn acquire_token(&self, request: &TokenRequest) -> Result<AuthResult, AuthError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_request.lock().unwrap() = Some(request.clone());

        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthError::Rejected {
                status: 401,
                body: r#"{"error":"invalid_client"}"#.to_owned(),
            });
        }
        let expires_on = self.expires_on_unix_ts.unwrap_or_else(|| now_u64() + 3600);
        Ok(AuthResult::new(format!("token-{}", n), expires_on))
    }
}
