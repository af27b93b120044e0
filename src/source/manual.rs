use super::{GamepadReading, InputEvent, InputSource, SinkSlot, SourceError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// Source driven by the application itself.
///
/// Clones share state: keep one clone to push key presses and gamepad readings
/// from a window event loop (or a test) and hand the other to the driver.
#[derive(Debug, Clone, Default)]
pub struct ManualSource {
    sink: SinkSlot,
    readings: Arc<Mutex<HashMap<usize, GamepadReading>>>,
}

impl ManualSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&self, key: &str) {
        self.sink.deliver(InputEvent::KeyDown {
            key: key.to_string(),
        });
    }

    /// Announces a gamepad and stores its initial (idle) reading.
    pub fn connect(&self, index: usize, name: &str) {
        self.set_reading(index, GamepadReading::default());
        self.sink.deliver(InputEvent::GamepadConnected {
            index,
            name: name.to_string(),
        });
    }

    pub fn disconnect(&self, index: usize) {
        self.readings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&index);
        self.sink.deliver(InputEvent::GamepadDisconnected { index });
    }

    pub fn set_reading(&self, index: usize, reading: GamepadReading) {
        self.readings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(index, reading);
    }
}

impl InputSource for ManualSource {
    fn subscribe(&mut self, sink: mpsc::Sender<InputEvent>) -> Result<(), SourceError> {
        self.sink.attach(sink)
    }

    fn unsubscribe(&mut self) {
        self.sink.detach();
    }

    fn reading(&self, index: usize) -> Option<GamepadReading> {
        self.readings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&index)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_reach_the_subscriber_until_unsubscribed() {
        let mut source = ManualSource::new();
        let feed = source.clone();
        let (tx, mut rx) = mpsc::channel(8);
        source.subscribe(tx).expect("first subscriber");

        feed.key_down("A");
        assert_eq!(
            rx.try_recv().expect("delivered"),
            InputEvent::KeyDown {
                key: "A".to_string()
            }
        );

        source.unsubscribe();
        feed.key_down("b");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn second_live_subscriber_is_rejected() {
        let mut source = ManualSource::new();
        let (tx, _rx) = mpsc::channel(8);
        let (other_tx, _other_rx) = mpsc::channel(8);
        source.subscribe(tx).expect("first subscriber");
        assert!(matches!(
            source.subscribe(other_tx),
            Err(SourceError::AlreadySubscribed)
        ));
    }

    #[test]
    fn readings_follow_connection_state() {
        let source = ManualSource::new();
        source.connect(1, "pad");
        assert_eq!(source.reading(1), Some(GamepadReading::default()));

        source.set_reading(1, GamepadReading::new(vec![true], vec![0.2]));
        assert_eq!(source.reading(1).expect("connected").buttons, vec![true]);

        source.disconnect(1);
        assert!(source.reading(1).is_none());
    }
}
