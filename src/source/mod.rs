//! Input sources feeding the coordinator
//!
//! A source pushes discrete [`InputEvent`]s (key presses, gamepad connect and
//! disconnect) into the sink it was subscribed with, and answers polled
//! [`GamepadReading`] queries once per frame. Gamepads have no event stream of
//! their own as far as the coordinator is concerned; button edges and axis
//! thresholds are derived by diffing readings.
//!
//! - [`gilrs_source`] - hardware gamepads through gilrs
//! - [`manual`] - a source driven by the application (window keyboard events, tests)

pub mod gilrs_source;
pub mod manual;

pub use gilrs_source::GilrsSource;
pub use manual::ManualSource;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Discrete events delivered by a source
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown { key: String },
    GamepadConnected { index: usize, name: String },
    GamepadDisconnected { index: usize },
}

/// One polled sample of a gamepad.
///
/// Buttons and axes are in the device's index order; axis values lie in [-1.0, 1.0].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamepadReading {
    pub buttons: Vec<bool>,
    pub axes: Vec<f32>,
}

impl GamepadReading {
    pub fn new(buttons: Vec<bool>, axes: Vec<f32>) -> Self {
        Self { buttons, axes }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to initialize input source: {0}")]
    InitializationError(String),

    #[error("Input source already has a subscriber")]
    AlreadySubscribed,
}

/// Supplier of input events and gamepad readings, injected into the driver.
pub trait InputSource: Send + fmt::Debug {
    /// Starts delivering events into `sink`. Only one subscriber at a time.
    fn subscribe(&mut self, sink: mpsc::Sender<InputEvent>) -> Result<(), SourceError>;

    /// Stops delivering events. Readings remain available.
    fn unsubscribe(&mut self);

    /// Latest reading of the gamepad at `index`, `None` if it is not connected.
    fn reading(&self, index: usize) -> Option<GamepadReading>;
}

/// Subscriber slot shared between a source and whatever produces its events
#[derive(Debug, Clone, Default)]
pub(crate) struct SinkSlot {
    inner: Arc<Mutex<Option<mpsc::Sender<InputEvent>>>>,
}

impl SinkSlot {
    pub(crate) fn attach(&self, sink: mpsc::Sender<InputEvent>) -> Result<(), SourceError> {
        let mut slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|sender| !sender.is_closed()) {
            return Err(SourceError::AlreadySubscribed);
        }
        *slot = Some(sink);
        Ok(())
    }

    pub(crate) fn detach(&self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Delivers `event` to the subscriber; events without a subscriber are dropped.
    pub(crate) fn deliver(&self, event: InputEvent) {
        let slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(sender) => {
                if let Err(e) = sender.try_send(event) {
                    warn!("Failed to deliver input event: {}", e);
                }
            }
            None => debug!("No subscriber, dropping {:?}", event),
        }
    }
}
