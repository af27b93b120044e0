//! Input binding manager
//!
//! Maps keyboard keys, gamepad buttons and gamepad axes to application
//! callbacks, and captures the next input to create a binding interactively.
//!
//! 1. [`binding`] - binding keys, callbacks, the binding table and its export document
//! 2. [`coordinator`] - dispatch/listening state machine and gamepad diffing
//! 3. [`source`] - input sources (gilrs, application driven)
//! 4. [`driver`] - per-frame tokio driver and its async handle
//!
//! ```text
//! InputSource ──► InputDriver ──► InputCoordinator ──► BindingTable ──► Callback
//!                  (frame tick)    (Dispatch / Listening)
//! ```

pub mod binding;
pub mod config;
pub mod coordinator;
pub mod driver;
pub mod persistence;
pub mod source;

pub use binding::{BindingDocument, BindingKey, Callback, CallbackRegistry, InputContext};
pub use config::CoordinatorSettings;
pub use coordinator::{BindMode, CaptureHandle, CaptureTarget, CoordinatorError, InputCoordinator};
pub use driver::CoordinatorHandle;
pub use source::{GamepadReading, InputEvent, InputSource};
