use super::{GamepadReading, InputEvent, InputSource, SinkSlot, SourceError};
use gilrs::{Axis, Button, Event, EventType, Gilrs};
use statum::{machine, state};
use std::collections::HashMap;
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Button index order of readings, following the common "standard gamepad" layout
const BUTTON_ORDER: [Button; 17] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger2,
    Button::Select,
    Button::Start,
    Button::LeftThumb,
    Button::RightThumb,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
    Button::Mode,
];

const AXIS_ORDER: [Axis; 4] = [
    Axis::LeftStickX,
    Axis::LeftStickY,
    Axis::RightStickX,
    Axis::RightStickY,
];

type Readings = HashMap<usize, GamepadReading>;

#[state]
#[derive(Debug, Clone)]
pub enum PumpState {
    Initializing,
    Pumping,
}

/// Owns the gilrs context on its own thread and turns it into events and readings
#[machine]
#[derive(Debug)]
pub struct GamepadPump<S: PumpState> {
    gilrs: Gilrs,

    // Subscriber for connect/disconnect events
    sink: SinkSlot,

    // Latest reading per connected gamepad
    readings: watch::Sender<Readings>,

    // Sleep between pump iterations
    interval: Duration,
}

impl GamepadPump<Initializing> {
    pub fn create(
        sink: SinkSlot,
        readings: watch::Sender<Readings>,
        interval: Duration,
    ) -> Result<Self, SourceError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => g,
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(SourceError::InitializationError(e.to_string()));
            }
        };

        Ok(Self::new(gilrs, sink, readings, interval))
    }

    /// Announces gamepads that were plugged in before the pump started.
    pub fn initialize(self) -> GamepadPump<Pumping> {
        let mut found = 0;
        for (id, gamepad) in self.gilrs.gamepads() {
            found += 1;
            info!("Found gamepad [{}] {}", id, gamepad.name());
            self.sink.deliver(InputEvent::GamepadConnected {
                index: usize::from(id),
                name: gamepad.name().to_string(),
            });
        }
        if found == 0 {
            warn!("No gamepad connected, continuing in idle mode");
        }

        self.publish_readings();
        self.transition()
    }
}

impl<S: PumpState> GamepadPump<S> {
    fn publish_readings(&self) {
        let readings: Readings = self
            .gilrs
            .gamepads()
            .map(|(id, gamepad)| {
                let buttons = BUTTON_ORDER
                    .iter()
                    .map(|button| gamepad.is_pressed(*button))
                    .collect();
                let axes = AXIS_ORDER.iter().map(|axis| gamepad.value(*axis)).collect();
                (usize::from(id), GamepadReading::new(buttons, axes))
            })
            .collect();
        self.readings.send_replace(readings);
    }
}

impl GamepadPump<Pumping> {
    /// Blocking loop; returns once `token` is cancelled.
    pub fn run(&mut self, token: CancellationToken) {
        info!("Starting gamepad pump");

        while !token.is_cancelled() {
            while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
                match event {
                    EventType::Connected => {
                        let name = self.gilrs.gamepad(id).name().to_string();
                        info!("Gamepad connected: {} ({})", name, id);
                        self.sink.deliver(InputEvent::GamepadConnected {
                            index: usize::from(id),
                            name,
                        });
                    }
                    EventType::Disconnected => {
                        warn!("Gamepad disconnected: {}", id);
                        self.sink.deliver(InputEvent::GamepadDisconnected {
                            index: usize::from(id),
                        });
                    }
                    _ => {}
                }
            }

            self.publish_readings();
            thread::sleep(self.interval);
        }

        info!("Gamepad pump stopped");
    }
}

/// Hardware gamepads through gilrs.
///
/// gilrs is pumped on a dedicated thread; the coordinator samples the readings
/// it publishes once per frame.
#[derive(Debug)]
pub struct GilrsSource {
    sink: SinkSlot,
    readings: watch::Receiver<Readings>,
    token: CancellationToken,
}

impl GilrsSource {
    pub fn spawn(interval: Duration) -> Result<Self, SourceError> {
        let sink = SinkSlot::default();
        let (readings_tx, readings_rx) = watch::channel(Readings::new());
        let token = CancellationToken::new();

        let (init_tx, init_rx) = std_mpsc::channel();
        let pump_sink = sink.clone();
        let pump_token = token.clone();

        thread::Builder::new()
            .name("gamepad-pump".to_string())
            .spawn(move || {
                match GamepadPump::create(pump_sink, readings_tx, interval) {
                    Ok(pump) => {
                        let _ = init_tx.send(Ok(()));
                        pump.initialize().run(pump_token);
                    }
                    Err(e) => {
                        let _ = init_tx.send(Err(e));
                    }
                }
            })
            .map_err(|e| SourceError::InitializationError(e.to_string()))?;

        init_rx
            .recv()
            .map_err(|e| SourceError::InitializationError(e.to_string()))??;

        debug!("Gamepad pump thread spawned");
        Ok(Self {
            sink,
            readings: readings_rx,
            token,
        })
    }
}

impl InputSource for GilrsSource {
    fn subscribe(&mut self, sink: mpsc::Sender<InputEvent>) -> Result<(), SourceError> {
        self.sink.attach(sink)?;

        // Gamepads announced before anyone listened would otherwise never be tracked
        for (index, _) in self.readings.borrow().iter() {
            self.sink.deliver(InputEvent::GamepadConnected {
                index: *index,
                name: format!("gamepad {index}"),
            });
        }
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.sink.detach();
    }

    fn reading(&self, index: usize) -> Option<GamepadReading> {
        self.readings.borrow().get(&index).cloned()
    }
}

impl Drop for GilrsSource {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
