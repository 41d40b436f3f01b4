use std::path::PathBuf;

use anyhow::Result;
use app_bootstrap::config::proc_loader::file_to_config;
use app_bootstrap::context::app_context::AppContext;
use app_bootstrap::factory::authorized_client::AuthorizedClientDetails;
use app_bootstrap::utils::logging;
use app_bootstrap::utils::logging::LogLevel;
use clap::Parser;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "appsettings.yaml")]
    config: PathBuf,
    #[arg(short, long, env = "SECRETS", default_value = "secrets.yaml")]
    secrets: PathBuf,
    /// overrides `SubscriptionName` from configuration
    #[arg(long)]
    subscription: Option<String>,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// fail on the first error instead of returning partial details
    #[arg(long)]
    strict: bool,
    /// issue `GET <endpoint_address>` with the authorized client
    #[arg(long)]
    probe: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Read args, init logging from the config file settings
    // -------------------------------

    let args = Args::parse();
    let bootstrap_config = file_to_config(&args.config).await?;
    logging::run(&bootstrap_config.settings, args.log_level);

    // -------------------------------
    // 2. Load configuration + secrets
    // -------------------------------

    let context = AppContext::with_config(bootstrap_config, &args.secrets).await?;

    // -------------------------------
    // 3. Build authorized client
    // -------------------------------

    let subscription = args.subscription.as_deref();
    let details = if args.strict {
        context.try_authorized_api_client(subscription).await?
    } else {
        context.authorized_api_client(subscription).await
    };
    log_summary(&details);

    // -------------------------------
    // 4. Optional probe request
    // -------------------------------

    if args.probe {
        match details.authorized_client.as_ref() {
            Some(client) => match client.get("").send().await {
                Ok(response) => info!(
                    "probe GET {} -> {}",
                    client.endpoint_address(),
                    response.status()
                ),
                Err(err) => error!("probe GET {} failed: {}", client.endpoint_address(), err),
            },
            None => warn!("probe skipped, no authorized client for '{}'", details.secret_name),
        }
    }

    Ok(())
}

fn log_summary(details: &AuthorizedClientDetails) {
    let Some(credential) = details.auth_credential.as_ref() else {
        warn!(
            secret = %details.secret_name,
            secret_found = details.secret.is_some(),
            "no credential resolved"
        );
        return;
    };
    info!(
        secret = %details.secret_name,
        authority = %credential.authority_url(),
        endpoint = %credential.endpoint_address(),
        token_acquired = credential.cached_token().is_some(),
        client_ready = details.authorized_client.is_some(),
        "authorized client summary"
    );
}
