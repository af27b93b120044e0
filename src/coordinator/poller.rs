//! Per-tick gamepad diffing
//!
//! Buttons are edge-triggered (fires on not-pressed → pressed), axes are
//! level-triggered (fires on every tick above the threshold). Observations of a
//! tick come out buttons first, then axes, each in ascending index order.

use crate::binding::{BindingKey, InputContext};
use crate::source::GamepadReading;
use std::collections::HashMap;
use tracing::{debug, info, trace};

/// Something the poller saw during a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    ButtonPressed { gamepad: usize, index: usize },
    AxisActive { gamepad: usize, index: usize, value: f32 },
}

impl Observation {
    pub fn key(&self) -> BindingKey {
        match self {
            Self::ButtonPressed { index, .. } => BindingKey::gamepad_button(*index),
            Self::AxisActive { index, .. } => BindingKey::gamepad_axis(*index),
        }
    }

    pub fn context(&self) -> InputContext {
        match *self {
            Self::ButtonPressed { gamepad, index } => InputContext::button(gamepad, index),
            Self::AxisActive {
                gamepad,
                index,
                value,
            } => InputContext::axis(gamepad, index, value),
        }
    }
}

/// Button pressed-state of one gamepad as of the previous tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GamepadSnapshot {
    pressed: Vec<bool>,
}

impl GamepadSnapshot {
    pub fn was_pressed(&self, index: usize) -> bool {
        self.pressed.get(index).copied().unwrap_or(false)
    }
}

#[derive(Debug, Default)]
pub struct GamepadPoller {
    tracked: Option<usize>,
    polling: bool,
    snapshots: HashMap<usize, GamepadSnapshot>,
}

impl GamepadPoller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracked(&self) -> Option<usize> {
        self.tracked
    }

    /// True once the first gamepad connected. Stays true across disconnects;
    /// polling merely idles without a tracked gamepad.
    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn connect(&mut self, index: usize, name: &str) {
        info!("Gamepad connected: [{}] {}", index, name);
        self.tracked = Some(index);
        self.snapshots.entry(index).or_default();

        if !self.polling {
            info!("Starting gamepad polling");
            self.polling = true;
        }
    }

    /// Stops tracking `index` if it is the tracked gamepad. Returns whether it was.
    pub fn disconnect(&mut self, index: usize) -> bool {
        self.snapshots.remove(&index);
        if self.tracked == Some(index) {
            info!("Gamepad disconnected: [{}]", index);
            self.tracked = None;
            true
        } else {
            debug!("Ignoring disconnect of untracked gamepad [{}]", index);
            false
        }
    }

    pub fn snapshot(&self, index: usize) -> Option<&GamepadSnapshot> {
        self.snapshots.get(&index)
    }

    /// Diffs `reading` against the previous tick and records it as the new snapshot.
    pub fn diff(
        &mut self,
        gamepad: usize,
        reading: &GamepadReading,
        axis_threshold: f32,
    ) -> Vec<Observation> {
        let snapshot = self.snapshots.entry(gamepad).or_default();
        let mut observations = Vec::new();

        for (index, pressed) in reading.buttons.iter().copied().enumerate() {
            if pressed && !snapshot.was_pressed(index) {
                trace!("Button {} pressed on gamepad [{}]", index, gamepad);
                observations.push(Observation::ButtonPressed { gamepad, index });
            }
        }
        snapshot.pressed = reading.buttons.clone();

        for (index, value) in reading.axes.iter().copied().enumerate() {
            if value.abs() > axis_threshold {
                observations.push(Observation::AxisActive {
                    gamepad,
                    index,
                    value,
                });
            }
        }

        observations
    }
}
