//! # App Bootstrap Library
//!
//! Startup helpers shared by services: loading configuration and secrets,
//! selecting logging, and turning a subscription's API secret into an
//! HTTP client that carries an OAuth2 bearer token.
//!
//! Modules:
//! - `config`: appsettings loading, env overlay and refresh
//! - `secrets`: secret records and the secret table
//! - `auth`: credentials, token acquisition and authorized clients
//! - `factory`: subscription-based authorized client construction
//! - `context`: startup state tying the above together

pub mod auth;
pub mod config;
pub mod context;
pub mod errors;
pub mod factory;
pub mod helpers;
pub mod observability;
pub mod secrets;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::auth::credential::{AuthCredential, RenewalPolicy};
pub use crate::context::app_context::AppContext;
pub use crate::factory::authorized_client::{
    create_authorized_api_client, try_create_authorized_api_client, AuthorizedClientDetails,
};
pub use crate::secrets::record::SecretRecord;
