use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::proc_loader::expand_env_vars;
use crate::observability::metrics::get_metrics;
use crate::secrets::record::SecretRecord;

/// Source of secret records, looked up by exact name.
pub trait SecretStore {
    fn secret(&self, name: &str) -> impl Future<Output = Option<SecretRecord>> + Send;

    /// Value of the secret `name`, as used for connection strings.
    fn connection_string(&self, name: &str) -> impl Future<Output = Option<String>> + Send;
}

/// Process-wide secret table: name -> record
#[derive(Debug, Clone, Default)]
pub struct InMemorySecretStore {
    inner: Arc<RwLock<HashMap<String, SecretRecord>>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table from records; a later record with the same name replaces an earlier one.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = SecretRecord>,
    {
        let mut map = HashMap::new();
        for record in records {
            if let Some(previous) = map.insert(record.name.clone(), record) {
                warn!("secret '{}' defined more than once, last definition wins", previous.name);
            }
        }
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    pub async fn insert(&self, record: SecretRecord) {
        let mut map = self.inner.write().await;
        map.insert(record.name.clone(), record);
        get_metrics().await.secrets_loaded.set(map.len() as i64);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

impl SecretStore for InMemorySecretStore {
    async fn secret(&self, name: &str) -> Option<SecretRecord> {
        let found = self.inner.read().await.get(name).cloned();
        if found.is_none() {
            debug!("secret '{}' not found", name);
        }
        found
    }

    async fn connection_string(&self, name: &str) -> Option<String> {
        self.secret(name).await.map(|record| record.value)
    }
}

/// ================================
/// secrets file layout
/// ================================
#[derive(Debug, Deserialize)]
struct SecretsFile {
    #[serde(default)]
    secrets: Vec<SecretRecord>,
}

/// Load the secret table from YAML file, expanding `${VAR}` references first
pub async fn file_to_secret_store(path: &Path) -> Result<InMemorySecretStore> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read secrets file '{}'", path.display()))?;
    parse_secrets(&expand_env_vars(&content)).await
}

pub async fn parse_secrets(content: &str) -> Result<InMemorySecretStore> {
    let metrics = get_metrics().await;
    let file: SecretsFile = serde_yaml::from_str(content)
        .inspect_err(|e| {
            error!("parse secrets error: {}", e);
            metrics.parse_failures.inc();
        })
        .context("invalid secrets format")?;

    let store = InMemorySecretStore::from_records(file.secrets);
    let loaded = store.len().await;
    metrics.secrets_loaded.set(loaded as i64);
    info!("{} secrets loaded", loaded);
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRETS_YAML: &str = r#"
secrets:
  - name: Orders.Api
    value: api-key
    category: api
    description: Orders API credentials
    metadata:
      - name: TenantId
        value: tid-1
      - name: ClientId
        value: cid-1
  - name: OrdersDb
    value: Server=db;Database=orders
    category: ConnectionString
"#;

    #[tokio::test]
    async fn parses_records_with_metadata() -> Result<()> {
        let store = parse_secrets(SECRETS_YAML).await?;
        assert_eq!(store.len().await, 2);
        assert_eq!(store.names().await, vec!["Orders.Api", "OrdersDb"]);

        let record = store.secret("Orders.Api").await.unwrap();
        assert_eq!(record.category, "api");
        assert_eq!(record.metadata_property("TenantId"), Some("tid-1"));
        Ok(())
    }

    #[tokio::test]
    async fn connection_string_returns_secret_value() -> Result<()> {
        let store = parse_secrets(SECRETS_YAML).await?;
        assert_eq!(
            store.connection_string("OrdersDb").await.as_deref(),
            Some("Server=db;Database=orders")
        );
        assert!(store.connection_string("Missing").await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn lookup_is_exact() {
        let store = InMemorySecretStore::from_records(vec![SecretRecord::new("Orders.Api", "v")]);
        assert!(store.secret("orders.api").await.is_none());
        assert!(store.secret("Orders.Api").await.is_some());
    }

    #[tokio::test]
    async fn later_duplicate_replaces_earlier() {
        let store = InMemorySecretStore::from_records(vec![
            SecretRecord::new("dup", "first"),
            SecretRecord::new("dup", "second"),
        ]);
        assert_eq!(store.secret("dup").await.unwrap().value, "second");
    }

    #[tokio::test]
    async fn insert_adds_record() {
        let store = InMemorySecretStore::new();
        assert!(store.is_empty().await);
        store.insert(SecretRecord::new("late", "v")).await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn escaped_references_survive_file_loading() -> Result<()> {
        let file = tempfile::NamedTempFile::new()?;
        std::fs::write(
            file.path(),
            "secrets:\n  - name: Orders.Api\n    value: 'p@ss$${word}x'\n    metadata:\n      - name: ClientSecret\n        value: 'a$${B:c}d'\n",
        )?;

        let store = file_to_secret_store(file.path()).await?;
        let record = store.secret("Orders.Api").await.unwrap();
        assert_eq!(record.value, "p@ss${word}x");
        assert_eq!(record.metadata_property("ClientSecret"), Some("a${B:c}d"));
        Ok(())
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        assert!(parse_secrets("secrets: {not: a list}").await.is_err());
        assert!(file_to_secret_store(Path::new("missing/secrets.yaml")).await.is_err());
    }
}
