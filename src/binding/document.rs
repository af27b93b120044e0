//! Export/import shape of the binding table: a flat `key = "callback name"` map

use super::key::BindingKey;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to serialize bindings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to parse bindings: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Exported bindings. Callback names are best-effort labels.
///
/// Keys are lower-cased on load; two keys that differ only in case are
/// rejected rather than collapsed into one.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BindingDocument {
    entries: BTreeMap<BindingKey, String>,
}

impl BindingDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: BindingKey, callback_name: impl Into<String>) {
        self.entries.insert(key, callback_name.into());
    }

    pub fn get(&self, key: &BindingKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_toml_string(&self) -> Result<String, DocumentError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, DocumentError> {
        Ok(toml::from_str(raw)?)
    }
}

impl<'de> Deserialize<'de> for BindingDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
        let mut entries = BTreeMap::new();
        for (written, name) in raw {
            let key = BindingKey::from(written.as_str());
            if entries.contains_key(&key) {
                return Err(de::Error::custom(format!(
                    "binding key '{written}' duplicates '{key}' once lower-cased"
                )));
            }
            entries.insert(key, name);
        }
        Ok(Self { entries })
    }
}

impl FromIterator<(BindingKey, String)> for BindingDocument {
    fn from_iter<T: IntoIterator<Item = (BindingKey, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for BindingDocument {
    type Item = (BindingKey, String);
    type IntoIter = std::collections::btree_map::IntoIter<BindingKey, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
