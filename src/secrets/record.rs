use std::fmt;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::ConversionError;

/// One `{name, value}` pair attached to a secret.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MetadataEntry {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl MetadataEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A named secret with its classifier and free-form metadata.
#[derive(Clone, PartialEq, Eq, Default, Deserialize)]
pub struct SecretRecord {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
}

// value is never printed
impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRecord")
            .field("name", &self.name)
            .field("value", &"***")
            .field("category", &self.category)
            .field("description", &self.description)
            .field("metadata", &self.metadata.iter().map(|m| &m.name).collect::<Vec<_>>())
            .finish()
    }
}

impl SecretRecord {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push(MetadataEntry::new(name, value));
        self
    }

    /// Value of the first metadata entry named exactly `name`.
    pub fn metadata_property(&self, name: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value.as_str())
    }

    /// Metadata as a JSON object; on duplicate names the last entry wins.
    pub fn metadata_document(&self) -> Map<String, Value> {
        self.metadata
            .iter()
            .map(|entry| (entry.name.clone(), Value::String(entry.value.clone())))
            .collect()
    }

    /// Deserializes the metadata document into `T` by field name.
    ///
    /// Unknown names are ignored unless `T` denies them. Any failure yields an
    /// error for the whole document; there is no partial result.
    pub fn try_convert_metadata_to<T: DeserializeOwned>(&self) -> Result<T, ConversionError> {
        serde_json::from_value(Value::Object(self.metadata_document())).map_err(|source| {
            ConversionError {
                target: std::any::type_name::<T>(),
                source,
            }
        })
    }

    /// Best-effort variant of [`Self::try_convert_metadata_to`]: failures are
    /// logged and `T::default()` is returned.
    pub fn convert_metadata_to<T: DeserializeOwned + Default>(&self) -> T {
        match self.try_convert_metadata_to() {
            Ok(value) => value,
            Err(err) => {
                warn!(secret = %self.name, "metadata conversion failed, using defaults: {}", err);
                T::default()
            }
        }
    }
}
