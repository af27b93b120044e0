use super::callback::{Callback, CallbackResolver};
use super::key::BindingKey;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors reported by [`BindingTable`]. Neither is fatal; the table is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("key '{0}' is already bound")]
    AlreadyBound(BindingKey),

    #[error("key '{0}' is not bound")]
    NotFound(BindingKey),
}

/// A single entry of the table
#[derive(Debug, Clone)]
pub struct Binding {
    pub key: BindingKey,
    pub callback: Callback,
    pub is_axis: bool,
}

/// Why a restored entry did not make it into the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreIssue {
    Unresolved { key: BindingKey, name: String },
    Conflict { key: BindingKey, name: String },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: Vec<BindingKey>,
    pub issues: Vec<RestoreIssue>,
}

impl RestoreReport {
    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Key → callback map with at most one binding per key
#[derive(Debug, Default)]
pub struct BindingTable {
    bindings: HashMap<BindingKey, Binding>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a binding only if `key` is free.
    pub fn bind(&mut self, key: BindingKey, callback: Callback) -> Result<(), BindingError> {
        if self.bindings.contains_key(&key) {
            warn!("Key '{}' is already bound", key);
            return Err(BindingError::AlreadyBound(key));
        }

        debug!("Key '{}' is now bound to '{}'", key, callback.label());
        let is_axis = key.is_axis();
        self.bindings.insert(
            key.clone(),
            Binding {
                key,
                callback,
                is_axis,
            },
        );
        Ok(())
    }

    /// Inserts or overwrites. Used by capture, where the user picked the key explicitly.
    pub(crate) fn replace(&mut self, key: BindingKey, callback: Callback) -> Option<Binding> {
        let is_axis = key.is_axis();
        let previous = self.bindings.insert(
            key.clone(),
            Binding {
                key,
                callback,
                is_axis,
            },
        );
        if let Some(previous) = &previous {
            debug!(
                "Key '{}' rebound, dropping '{}'",
                previous.key,
                previous.callback.label()
            );
        }
        previous
    }

    pub fn unbind(&mut self, key: &BindingKey) -> Result<Binding, BindingError> {
        self.bindings
            .remove(key)
            .ok_or_else(|| BindingError::NotFound(key.clone()))
    }

    pub fn lookup(&self, key: &BindingKey) -> Option<&Callback> {
        self.bindings.get(key).map(|binding| &binding.callback)
    }

    pub fn get(&self, key: &BindingKey) -> Option<&Binding> {
        self.bindings.get(key)
    }

    pub fn contains(&self, key: &BindingKey) -> bool {
        self.bindings.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Key and callback label of every binding, sorted by key
    pub fn list(&self) -> Vec<(BindingKey, String)> {
        let mut entries: Vec<_> = self
            .bindings
            .values()
            .map(|binding| (binding.key.clone(), binding.callback.label().to_string()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Resolves each name through `resolver` and binds what resolves.
    /// Unknown names and occupied keys are skipped and reported.
    pub fn restore<I, R>(&mut self, entries: I, resolver: &R) -> RestoreReport
    where
        I: IntoIterator<Item = (BindingKey, String)>,
        R: CallbackResolver + ?Sized,
    {
        let mut report = RestoreReport::default();

        for (key, name) in entries {
            let Some(callback) = resolver.resolve(&name) else {
                warn!("Callback '{}' not found for key '{}'", name, key);
                report.issues.push(RestoreIssue::Unresolved { key, name });
                continue;
            };

            match self.bind(key.clone(), callback) {
                Ok(()) => report.restored.push(key),
                Err(_) => report.issues.push(RestoreIssue::Conflict { key, name }),
            }
        }

        report
    }
}
