//! Callbacks invoked by the coordinator and the registry used to resolve them by name

use super::key::BindingKey;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Label exported for callbacks registered without a name
pub const ANONYMOUS_LABEL: &str = "anonymous";

/// Axis value delivered to axis callbacks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisReading {
    pub index: usize,
    pub value: f32,
}

/// Everything a callback learns about the input that fired it
#[derive(Debug, Clone, PartialEq)]
pub struct InputContext {
    pub key: BindingKey,
    /// Gamepad the input came from, `None` for keyboard input
    pub gamepad: Option<usize>,
    pub axis: Option<AxisReading>,
}

impl InputContext {
    pub fn keyboard(key: BindingKey) -> Self {
        Self {
            key,
            gamepad: None,
            axis: None,
        }
    }

    pub fn button(gamepad: usize, index: usize) -> Self {
        Self {
            key: BindingKey::gamepad_button(index),
            gamepad: Some(gamepad),
            axis: None,
        }
    }

    pub fn axis(gamepad: usize, index: usize, value: f32) -> Self {
        Self {
            key: BindingKey::gamepad_axis(index),
            gamepad: Some(gamepad),
            axis: Some(AxisReading { index, value }),
        }
    }
}

type CallbackFn = dyn Fn(&InputContext) + Send + Sync;

/// Application callback with an optional human readable label.
///
/// The label is what gets exported; the function itself is opaque. Cloning is
/// cheap and clones compare equal through [`Callback::same_as`].
#[derive(Clone)]
pub struct Callback {
    label: Option<String>,
    func: Arc<CallbackFn>,
}

impl Callback {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&InputContext) + Send + Sync + 'static,
    {
        Self {
            label: None,
            func: Arc::new(func),
        }
    }

    pub fn labeled<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&InputContext) + Send + Sync + 'static,
    {
        Self {
            label: Some(label.into()),
            func: Arc::new(func),
        }
    }

    /// Label used for export, `"anonymous"` when none was given
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(ANONYMOUS_LABEL)
    }

    pub fn has_label(&self) -> bool {
        self.label.is_some()
    }

    pub fn invoke(&self, context: &InputContext) {
        (self.func)(context)
    }

    pub fn same_as(&self, other: &Callback) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("label", &self.label())
            .finish_non_exhaustive()
    }
}

/// Resolves exported callback names back into callbacks during restore
pub trait CallbackResolver {
    fn resolve(&self, name: &str) -> Option<Callback>;
}

impl<F> CallbackResolver for F
where
    F: Fn(&str) -> Option<Callback>,
{
    fn resolve(&self, name: &str) -> Option<Callback> {
        self(name)
    }
}

/// Name → callback map, the usual resolver for an application's actions
#[derive(Debug, Default, Clone)]
pub struct CallbackRegistry {
    callbacks: HashMap<String, Callback>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `func` under `name` and returns the labelled callback.
    /// A second registration under the same name replaces the first.
    pub fn register<F>(&mut self, name: &str, func: F) -> Callback
    where
        F: Fn(&InputContext) + Send + Sync + 'static,
    {
        let callback = Callback::labeled(name, func);
        self.callbacks.insert(name.to_string(), callback.clone());
        callback
    }

    pub fn get(&self, name: &str) -> Option<&Callback> {
        self.callbacks.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.callbacks.keys().map(String::as_str)
    }
}

impl CallbackResolver for CallbackRegistry {
    fn resolve(&self, name: &str) -> Option<Callback> {
        self.callbacks.get(name).cloned()
    }
}
