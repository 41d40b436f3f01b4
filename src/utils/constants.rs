//! Shared constants and invariants

// Timeouts
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;

// Token lifecycle
pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 60;
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;
pub const DEFAULT_TOKEN_PATH: &str = "oauth2/v2.0/token";
pub const CLIENT_CREDENTIALS_GRANT: &str = "client_credentials";
pub const BEARER_PREFIX: &str = "Bearer ";
pub const JSON_MEDIA_TYPE: &str = "application/json";

// Authority template placeholder substituted with the tenant id
pub const TENANT_PLACEHOLDER: &str = "{0}";

// Factory lookups
pub const SUBSCRIPTION_NAME_KEY: &str = "SubscriptionName";
pub const API_SECRET_SUFFIX: &str = ".Api";

// Configuration
pub const CONFIG_KEY_SEPARATOR: &str = ":";
pub const ENV_KEY_SEPARATOR: &str = "__";
pub const DEFAULT_ENV_PREFIX: &str = "APP_";
