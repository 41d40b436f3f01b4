use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::configuration::SharedConfiguration;
use crate::config::proc_loader::file_to_config;
use crate::observability::metrics::get_metrics;

static SUCCESS_MSG: &str = "success";
static ERROR_MSG: &str = "error";

/// Periodically re-reads `path` and swaps the shared snapshot.
///
/// A failed reload is logged and the previous snapshot stays in place.
/// Only `values` are refreshed; settings are read once at startup.
pub fn spawn_refresh_loop(
    path: PathBuf,
    shared: SharedConfiguration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // first tick completes immediately, the file was just loaded
        ticker.tick().await;
        loop {
            ticker.tick().await;
            debug!("configuration refresh cycle start");
            reload_once(&path, &shared).await;
        }
    })
}

/// One refresh attempt; returns true when the snapshot was replaced.
pub async fn reload_once(path: &Path, shared: &SharedConfiguration) -> bool {
    let metrics = get_metrics().await;
    match file_to_config(path).await {
        Ok(config) => {
            info!(
                "configuration reloaded from '{}', {} keys",
                path.display(),
                config.configuration.len()
            );
            shared.replace(config.configuration).await;
            metrics.config_reloads.with_label_values(&[SUCCESS_MSG]).inc();
            true
        }
        Err(err) => {
            warn!("configuration reload from '{}' failed, keeping previous values: {:#}", path.display(), err);
            metrics.config_reloads.with_label_values(&[ERROR_MSG]).inc();
            false
        }
    }
}
