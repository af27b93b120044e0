//! Input coordinator: binding table, capture state machine and gamepad polling
//!
//! ```text
//!              begin_capture
//!   Dispatch ─────────────────► Listening(CaptureRequest)
//!      ▲  │                            │
//!      │  └─ input: invoke binding     │ accepted input: bind it,
//!      └───────────────────────────────┘ resolve the handle
//! ```
//!
//! The pending [`CaptureRequest`] lives inside the `Listening` variant, so the
//! state and the request appear and disappear together.

pub mod capture;
pub mod poller;

pub use capture::{CaptureError, CaptureHandle, CaptureOutcome, CaptureRequest, CaptureTarget};
pub use poller::{GamepadPoller, GamepadSnapshot, Observation};

use crate::binding::{
    Binding, BindingDocument, BindingError, BindingKey, BindingTable, Callback, CallbackResolver,
    InputContext, RestoreReport,
};
use crate::config::CoordinatorSettings;
use crate::source::{GamepadReading, InputEvent, InputSource};
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatorError {
    #[error("already waiting for input to bind")]
    AlreadyListening,

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error("input driver is not running")]
    DriverStopped,
}

#[derive(Debug, Default)]
pub enum CoordinatorState {
    #[default]
    Dispatch,
    Listening(CaptureRequest),
}

impl CoordinatorState {
    pub fn is_listening(&self) -> bool {
        matches!(self, Self::Listening(_))
    }
}

/// How [`InputCoordinator::bind`] treats the new binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    Immediate,
    /// Bind provisionally, then wait for axis `index` to move (or a key or
    /// button press) and bind the callback there in place of the provisional key.
    AwaitAxis(usize),
}

#[derive(Debug)]
pub struct InputCoordinator {
    table: BindingTable,
    state: CoordinatorState,
    poller: GamepadPoller,
    settings: CoordinatorSettings,
}

impl Default for InputCoordinator {
    fn default() -> Self {
        Self::new(CoordinatorSettings::default())
    }
}

impl InputCoordinator {
    pub fn new(settings: CoordinatorSettings) -> Self {
        debug!("Creating input coordinator with settings: {:?}", settings);
        Self {
            table: BindingTable::new(),
            state: CoordinatorState::Dispatch,
            poller: GamepadPoller::new(),
            settings,
        }
    }

    pub fn table(&self) -> &BindingTable {
        &self.table
    }

    pub fn is_listening(&self) -> bool {
        self.state.is_listening()
    }

    pub fn tracked_gamepad(&self) -> Option<usize> {
        self.poller.tracked()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_polling()
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    pub fn bind(
        &mut self,
        key: BindingKey,
        callback: Callback,
        mode: BindMode,
    ) -> Result<Option<CaptureHandle>, CoordinatorError> {
        match mode {
            BindMode::Immediate => {
                self.table.bind(key, callback)?;
                Ok(None)
            }
            BindMode::AwaitAxis(index) => {
                // Checked first so a rejected capture leaves no provisional binding behind
                if self.is_listening() {
                    warn!("Already waiting for input, not binding '{}'", key);
                    return Err(CoordinatorError::AlreadyListening);
                }
                self.table.bind(key.clone(), callback.clone())?;
                let handle =
                    self.begin_capture_with(callback, CaptureTarget::axis(index), Some(key))?;
                Ok(Some(handle))
            }
        }
    }

    /// Enters listening mode; the next accepted input gets bound to `callback`.
    pub fn rebind(
        &mut self,
        callback: Callback,
        target: CaptureTarget,
    ) -> Result<CaptureHandle, CoordinatorError> {
        self.begin_capture_with(callback, target, None)
    }

    fn begin_capture_with(
        &mut self,
        callback: Callback,
        target: CaptureTarget,
        provisional: Option<BindingKey>,
    ) -> Result<CaptureHandle, CoordinatorError> {
        if self.is_listening() {
            warn!("Already waiting for input. Please press a key or gamepad input.");
            return Err(CoordinatorError::AlreadyListening);
        }

        info!(
            "Waiting for input to bind '{}' ({:?})",
            callback.label(),
            target
        );
        let (request, handle) = CaptureRequest::new(callback, target, provisional);
        self.state = CoordinatorState::Listening(request);
        Ok(handle)
    }

    pub fn unbind(&mut self, key: &BindingKey) -> Result<Binding, CoordinatorError> {
        let binding = self.table.unbind(key)?;
        info!("Key '{}' unbound", key);
        Ok(binding)
    }

    pub fn list_bindings(&self) -> Vec<(BindingKey, String)> {
        self.table.list()
    }

    pub fn export_bindings(&self) -> BindingDocument {
        self.table.list().into_iter().collect()
    }

    pub fn load_bindings<R>(&mut self, document: BindingDocument, resolver: &R) -> RestoreReport
    where
        R: CallbackResolver + ?Sized,
    {
        let report = self.table.restore(document, resolver);
        info!(
            "Restored {} binding(s), skipped {}",
            report.restored.len(),
            report.issues.len()
        );
        report
    }

    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::KeyDown { key } => {
                let key = BindingKey::keyboard(&key);
                self.observe(InputContext::keyboard(key));
            }
            InputEvent::GamepadConnected { index, name } => self.poller.connect(index, &name),
            InputEvent::GamepadDisconnected { index } => {
                self.poller.disconnect(index);
            }
        }
    }

    /// One frame of gamepad polling against `source`.
    pub fn poll<S>(&mut self, source: &S)
    where
        S: InputSource + ?Sized,
    {
        let Some(gamepad) = self.poller.tracked() else {
            trace!("No gamepad tracked, skipping poll");
            return;
        };
        match source.reading(gamepad) {
            Some(reading) => self.apply_reading(gamepad, &reading),
            None => debug!("No reading for gamepad [{}]", gamepad),
        }
    }

    /// Diffs `reading` and feeds the observations through the state machine.
    ///
    /// A tick that starts while listening never dispatches: the first accepted
    /// observation completes the capture and the rest of the tick is dropped.
    pub fn apply_reading(&mut self, gamepad: usize, reading: &GamepadReading) {
        let listening = self.is_listening();
        let threshold = if listening {
            self.settings.capture_axis_threshold
        } else {
            self.settings.dispatch_axis_threshold
        };

        for observation in self.poller.diff(gamepad, reading, threshold) {
            if listening {
                if self.try_complete_capture(observation.key()) {
                    break;
                }
            } else {
                self.dispatch(&observation.context());
            }
        }
    }

    fn observe(&mut self, context: InputContext) {
        if self.is_listening() {
            self.try_complete_capture(context.key);
        } else {
            self.dispatch(&context);
        }
    }

    fn dispatch(&self, context: &InputContext) {
        match self.table.lookup(&context.key) {
            Some(callback) => {
                debug!("Dispatching '{}' to '{}'", context.key, callback.label());
                callback.invoke(context);
            }
            None => trace!("Nothing bound to '{}'", context.key),
        }
    }

    /// Returns true if `key` completed the pending capture.
    fn try_complete_capture(&mut self, key: BindingKey) -> bool {
        match &self.state {
            CoordinatorState::Listening(request) if request.target().accepts(&key) => {}
            CoordinatorState::Listening(request) => {
                debug!("'{}' does not satisfy {:?}", key, request.target());
                return false;
            }
            CoordinatorState::Dispatch => return false,
        }

        if let CoordinatorState::Listening(request) = std::mem::take(&mut self.state) {
            request.resolve(key, &mut self.table);
        }
        true
    }
}
