use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token metrics
    pub token_acquisitions: IntCounterVec,
    pub token_acquisition_duration: Histogram,
    pub token_cache_hits: IntCounter,

    // Factory metrics
    pub authorized_clients: IntCounterVec,

    // Config/secrets
    pub parse_failures: IntCounter,
    pub config_reloads: IntCounterVec,
    pub secrets_loaded: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("appbootstrap".into()), None)
            .expect("metrics prefix is valid");

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Token
            token_acquisitions: IntCounterVec::new(Opts::new("token_acquisitions_total", "Token acquisitions by outcome"), &["outcome"]).expect("metric definition is valid"),
            token_acquisition_duration: Histogram::with_opts(HistogramOpts::new("token_acquisition_duration_seconds", "Token acquisition duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0])).expect("metric definition is valid"),
            token_cache_hits: IntCounter::new("token_cache_hits_total", "Tokens served from the credential cache").expect("metric definition is valid"),

            // Factory
            authorized_clients: IntCounterVec::new(Opts::new("authorized_clients_total", "Authorized API clients built by outcome"), &["outcome"]).expect("metric definition is valid"),

            // Config/secrets
            parse_failures: IntCounter::new("config_parse_failures_total", "Configuration or secrets file parse failures").expect("metric definition is valid"),
            config_reloads: IntCounterVec::new(Opts::new("config_reloads_total", "Configuration reloads by outcome"), &["outcome"]).expect("metric definition is valid"),
            secrets_loaded: IntGauge::new("secrets_loaded", "Secrets currently held by the secret table").expect("metric definition is valid"),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(metrics.token_acquisitions.clone()),
            Box::new(metrics.token_acquisition_duration.clone()),
            Box::new(metrics.token_cache_hits.clone()),
            Box::new(metrics.authorized_clients.clone()),
            Box::new(metrics.parse_failures.clone()),
            Box::new(metrics.config_reloads.clone()),
            Box::new(metrics.secrets_loaded.clone()),
        ];
        for collector in collectors {
            reg.register(collector).expect("metric names are unique");
        }

        metrics
    }
}
