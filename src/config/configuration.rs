use serde_yaml::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::utils::constants::{CONFIG_KEY_SEPARATOR, ENV_KEY_SEPARATOR};

/// String-keyed configuration lookup, e.g. `configuration.get("SubscriptionName")`.
pub trait Configuration {
    fn get(&self, key: &str) -> Option<String>;
}

impl Configuration for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Flattened configuration values.
///
/// Nested mappings are addressed with `:` separated keys (`Orders:Region`),
/// sequence items by their index (`Hosts:0`). Scalars are stored as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfiguration {
    values: BTreeMap<String, String>,
}

impl AppConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml(value: &Value) -> Self {
        let mut values = BTreeMap::new();
        flatten_into(&mut values, None, value);
        Self { values }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Overrides values from `(name, value)` pairs whose name starts with `prefix`.
    /// The prefix is stripped and `__` becomes `:`, so `APP_Orders__Region`
    /// overrides `Orders:Region`.
    pub fn overlay_env<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        if prefix.is_empty() {
            return;
        }
        for (name, value) in vars {
            if let Some(stripped) = name.strip_prefix(prefix) {
                if stripped.is_empty() {
                    continue;
                }
                let key = stripped.replace(ENV_KEY_SEPARATOR, CONFIG_KEY_SEPARATOR);
                debug!("configuration key '{}' overridden from environment", key);
                self.values.insert(key, value);
            }
        }
    }
}

impl Configuration for AppConfiguration {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

fn flatten_into(values: &mut BTreeMap<String, String>, prefix: Option<&str>, value: &Value) {
    let join = |segment: &str| match prefix {
        Some(prefix) => format!("{}{}{}", prefix, CONFIG_KEY_SEPARATOR, segment),
        None => segment.to_owned(),
    };
    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                if let Some(segment) = scalar_to_string(key) {
                    flatten_into(values, Some(&join(&segment)), child);
                }
            }
        }
        Value::Sequence(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(values, Some(&join(&index.to_string())), child);
            }
        }
        Value::Tagged(tagged) => flatten_into(values, prefix, &tagged.value),
        scalar => {
            if let (Some(prefix), Some(text)) = (prefix, scalar_to_string(scalar)) {
                values.insert(prefix.to_owned(), text);
            }
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.to_owned()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

/// Configuration snapshot shared between the host and the refresh loop.
#[derive(Debug, Clone, Default)]
pub struct SharedConfiguration {
    inner: Arc<RwLock<AppConfiguration>>,
}

impl SharedConfiguration {
    pub fn new(configuration: AppConfiguration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(configuration)),
        }
    }

    pub async fn snapshot(&self) -> AppConfiguration {
        self.inner.read().await.clone()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.inner.read().await.get(key)
    }

    pub async fn replace(&self, configuration: AppConfiguration) {
        *self.inner.write().await = configuration;
    }
}
