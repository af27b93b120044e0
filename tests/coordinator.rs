use controlbind::binding::{BindingKey, Callback, CallbackRegistry, InputContext};
use controlbind::coordinator::{BindMode, CaptureTarget, InputCoordinator};
use controlbind::source::{GamepadReading, InputEvent, ManualSource};
use std::sync::{Arc, Mutex};

/// Callback that records every context it is invoked with
fn recorder(label: &str) -> (Callback, Arc<Mutex<Vec<InputContext>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let callback = Callback::labeled(label, move |ctx: &InputContext| {
        sink.lock().unwrap().push(ctx.clone());
    });
    (callback, seen)
}

fn connected() -> (InputCoordinator, ManualSource) {
    let mut coordinator = InputCoordinator::default();
    let source = ManualSource::new();
    source.connect(0, "test pad");
    coordinator.handle_event(InputEvent::GamepadConnected {
        index: 0,
        name: "test pad".to_string(),
    });
    (coordinator, source)
}

fn button(index: usize, pressed: bool) -> GamepadReading {
    let mut buttons = vec![false; 4];
    buttons[index] = pressed;
    GamepadReading::new(buttons, vec![0.0; 2])
}

fn axes(values: &[f32]) -> GamepadReading {
    GamepadReading::new(vec![false; 4], values.to_vec())
}

#[test]
fn held_button_fires_once_per_press() {
    let (mut coordinator, source) = connected();
    let (callback, seen) = recorder("jump");
    coordinator
        .bind(BindingKey::gamepad_button(2), callback, BindMode::Immediate)
        .unwrap();

    for pressed in [false, true, true, false] {
        source.set_reading(0, button(2, pressed));
        coordinator.poll(&source);
    }

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].key, BindingKey::gamepad_button(2));
    assert_eq!(seen[0].gamepad, Some(0));
}

#[test]
fn axis_dispatch_fires_every_tick_above_threshold() {
    let (mut coordinator, source) = connected();
    let (callback, seen) = recorder("steer");
    coordinator
        .bind(BindingKey::gamepad_axis(0), callback, BindMode::Immediate)
        .unwrap();

    source.set_reading(0, axes(&[0.6, 0.0]));
    for _ in 0..3 {
        coordinator.poll(&source);
    }
    source.set_reading(0, axes(&[0.05, 0.0]));
    coordinator.poll(&source);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    let reading = seen[0].axis.expect("axis context");
    assert_eq!(reading.index, 0);
    assert_eq!(reading.value, 0.6);
}

#[test]
fn button_capture_binds_on_the_press_edge() {
    let (mut coordinator, source) = connected();
    let (callback, seen) = recorder("fire");

    // Held before listening starts: not an edge, must not complete the capture
    source.set_reading(0, button(1, true));
    coordinator.poll(&source);

    let mut pending = coordinator.rebind(callback.clone(), CaptureTarget::Input).unwrap();
    coordinator.poll(&source);
    assert!(coordinator.is_listening());

    source.set_reading(0, button(1, false));
    coordinator.poll(&source);
    source.set_reading(0, button(1, true));
    coordinator.poll(&source);

    assert!(!coordinator.is_listening());
    let outcome = pending.try_outcome().unwrap().unwrap();
    assert_eq!(outcome.key, BindingKey::gamepad_button(1));
    assert!(coordinator
        .table()
        .lookup(&BindingKey::gamepad_button(1))
        .unwrap()
        .same_as(&callback));

    // Still held on the next tick: no dispatch until it is pressed again
    coordinator.poll(&source);
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn first_button_of_a_tick_wins_the_capture() {
    let (mut coordinator, source) = connected();
    let (callback, _) = recorder("fire");
    let (other, other_seen) = recorder("other");
    coordinator
        .bind(BindingKey::gamepad_button(3), other, BindMode::Immediate)
        .unwrap();

    let _pending = coordinator.rebind(callback, CaptureTarget::Input).unwrap();
    source.set_reading(0, GamepadReading::new(vec![false, true, false, true], vec![]));
    coordinator.poll(&source);

    assert!(!coordinator.is_listening());
    assert!(coordinator.table().contains(&BindingKey::gamepad_button(1)));
    // Button 3 was pressed in the same tick but belongs to the capture tick
    assert!(other_seen.lock().unwrap().is_empty());
}

#[test]
fn axis_capture_waits_for_the_capture_threshold() {
    let (mut coordinator, source) = connected();
    let (callback, _) = recorder("steer");
    let mut pending = coordinator.rebind(callback, CaptureTarget::axis(1)).unwrap();

    for value in [0.3, 0.5, -0.5] {
        source.set_reading(0, axes(&[0.0, value]));
        coordinator.poll(&source);
        assert!(coordinator.is_listening(), "{value} must not capture");
    }

    source.set_reading(0, axes(&[0.0, -0.75]));
    coordinator.poll(&source);

    assert!(!coordinator.is_listening());
    assert_eq!(
        pending.try_outcome().unwrap().unwrap().key,
        BindingKey::gamepad_axis(1)
    );
}

#[test]
fn axis_capture_ignores_other_axes() {
    let (mut coordinator, source) = connected();
    let (callback, _) = recorder("steer");
    let mut pending = coordinator.rebind(callback, CaptureTarget::axis(1)).unwrap();

    source.set_reading(0, axes(&[0.9, 0.0]));
    coordinator.poll(&source);
    assert!(coordinator.is_listening());
    assert!(pending.try_outcome().is_none());
    assert!(!coordinator.table().contains(&BindingKey::gamepad_axis(0)));

    source.set_reading(0, axes(&[0.9, 0.6]));
    coordinator.poll(&source);
    assert_eq!(
        pending.try_outcome().unwrap().unwrap().key,
        BindingKey::gamepad_axis(1)
    );
}

#[test]
fn axis_capture_also_completes_on_a_key_press() {
    let (mut coordinator, _source) = connected();
    let (callback, _) = recorder("steer");
    let mut pending = coordinator
        .rebind(callback.clone(), CaptureTarget::any_axis())
        .unwrap();

    coordinator.handle_event(InputEvent::KeyDown {
        key: "X".to_string(),
    });

    assert!(!coordinator.is_listening());
    assert_eq!(
        pending.try_outcome().unwrap().unwrap().key,
        BindingKey::keyboard("x")
    );
    assert!(coordinator
        .table()
        .lookup(&BindingKey::keyboard("x"))
        .unwrap()
        .same_as(&callback));
}

#[test]
fn await_axis_bind_completes_on_a_button_edge() {
    let (mut coordinator, source) = connected();
    let (callback, _) = recorder("steer");
    let key = BindingKey::keyboard("steer");

    let mut pending = coordinator
        .bind(key.clone(), callback, BindMode::AwaitAxis(0))
        .unwrap()
        .expect("axis capture handle");

    source.set_reading(0, button(2, true));
    coordinator.poll(&source);

    assert!(!coordinator.is_listening());
    assert_eq!(
        pending.try_outcome().unwrap().unwrap().key,
        BindingKey::gamepad_button(2)
    );
    assert!(coordinator.table().contains(&BindingKey::gamepad_button(2)));
    assert!(!coordinator.table().contains(&key));
}

#[test]
fn await_axis_bind_replaces_the_provisional_key() {
    let (mut coordinator, source) = connected();
    let (callback, _) = recorder("steer");
    let key = BindingKey::keyboard("steer");

    let pending = coordinator
        .bind(key.clone(), callback.clone(), BindMode::AwaitAxis(1))
        .unwrap();
    let mut pending = pending.expect("axis capture handle");
    assert!(coordinator.table().contains(&key));
    assert!(coordinator.is_listening());

    source.set_reading(0, axes(&[0.0, 0.8]));
    coordinator.poll(&source);

    assert!(pending.try_outcome().is_some());
    assert!(!coordinator.table().contains(&key));
    assert!(coordinator
        .table()
        .lookup(&BindingKey::gamepad_axis(1))
        .unwrap()
        .same_as(&callback));
}

#[test]
fn disconnect_stops_polling_until_reconnect() {
    let (mut coordinator, source) = connected();
    let (callback, seen) = recorder("jump");
    coordinator
        .bind(BindingKey::gamepad_button(0), callback, BindMode::Immediate)
        .unwrap();

    coordinator.handle_event(InputEvent::GamepadDisconnected { index: 0 });
    assert_eq!(coordinator.tracked_gamepad(), None);
    assert!(coordinator.is_polling());

    source.set_reading(0, button(0, true));
    coordinator.poll(&source);
    assert!(seen.lock().unwrap().is_empty());

    source.connect(3, "new pad");
    coordinator.handle_event(InputEvent::GamepadConnected {
        index: 3,
        name: "new pad".to_string(),
    });
    assert_eq!(coordinator.tracked_gamepad(), Some(3));
    source.set_reading(3, button(0, true));
    coordinator.poll(&source);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn export_then_load_restores_the_same_bindings() {
    let mut registry = CallbackRegistry::new();
    let jump = registry.register("jump", |_| {});
    let steer = registry.register("steer", |_| {});

    let mut original = InputCoordinator::default();
    original
        .bind(BindingKey::keyboard("space"), jump.clone(), BindMode::Immediate)
        .unwrap();
    original
        .bind(BindingKey::gamepad_axis(0), steer.clone(), BindMode::Immediate)
        .unwrap();

    let mut restored = InputCoordinator::default();
    let report = restored.load_bindings(original.export_bindings(), &registry);

    assert!(report.is_complete());
    assert_eq!(restored.list_bindings(), original.list_bindings());
    assert!(restored
        .table()
        .lookup(&BindingKey::keyboard("space"))
        .unwrap()
        .same_as(&jump));
    assert!(restored
        .table()
        .get(&BindingKey::gamepad_axis(0))
        .unwrap()
        .is_axis);
}
