//! Pending captures and the handles callers await them through

use crate::binding::{BindingKey, BindingTable, Callback, KeyKind};
use chrono::{DateTime, Local};
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Which inputs may complete a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTarget {
    /// Next key press or gamepad button press
    Input,
    /// Like `Input`, but an axis pushed past the capture threshold also
    /// completes it; restricted to `index` when given
    Axis { index: Option<usize> },
}

impl CaptureTarget {
    pub fn any_axis() -> Self {
        Self::Axis { index: None }
    }

    pub fn axis(index: usize) -> Self {
        Self::Axis { index: Some(index) }
    }

    pub fn accepts(&self, key: &BindingKey) -> bool {
        match (self, key.kind()) {
            (_, KeyKind::Keyboard | KeyKind::GamepadButton(_)) => true,
            (Self::Input, KeyKind::GamepadAxis(_)) => false,
            (Self::Axis { index: None }, KeyKind::GamepadAxis(_)) => true,
            (Self::Axis { index: Some(wanted) }, KeyKind::GamepadAxis(observed)) => {
                *wanted == observed
            }
        }
    }
}

/// Result delivered to a [`CaptureHandle`]
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOutcome {
    pub key: BindingKey,
    pub captured_at: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("coordinator dropped the capture before it completed")]
    Abandoned,
}

/// The one capture that may be pending at a time
#[derive(Debug)]
pub struct CaptureRequest {
    callback: Callback,
    target: CaptureTarget,
    // Placeholder binding removed once the capture resolves
    provisional: Option<BindingKey>,
    completion: oneshot::Sender<CaptureOutcome>,
}

impl CaptureRequest {
    pub(crate) fn new(
        callback: Callback,
        target: CaptureTarget,
        provisional: Option<BindingKey>,
    ) -> (Self, CaptureHandle) {
        let (completion, receiver) = oneshot::channel();
        let request = Self {
            callback,
            target,
            provisional,
            completion,
        };
        (request, CaptureHandle { receiver })
    }

    pub fn target(&self) -> CaptureTarget {
        self.target
    }

    /// Binds `key` to the pending callback and releases the waiter.
    pub(crate) fn resolve(self, key: BindingKey, table: &mut BindingTable) {
        info!("'{}' is now bound to '{}'", key, self.callback.label());
        table.replace(key.clone(), self.callback);

        if let Some(provisional) = self.provisional.filter(|p| *p != key) {
            if table.unbind(&provisional).is_ok() {
                debug!("Removed provisional binding '{}'", provisional);
            }
        }

        let outcome = CaptureOutcome {
            key,
            captured_at: Local::now(),
        };
        if self.completion.send(outcome).is_err() {
            debug!("Capture handle was dropped, nobody is waiting");
        }
    }
}

/// Deferred completion of a capture. Resolves exactly once.
///
/// Dropping the handle does not cancel the capture.
#[derive(Debug)]
pub struct CaptureHandle {
    receiver: oneshot::Receiver<CaptureOutcome>,
}

impl CaptureHandle {
    pub async fn wait(self) -> Result<CaptureOutcome, CaptureError> {
        self.receiver.await.map_err(|_| CaptureError::Abandoned)
    }

    /// Non-blocking check; `None` while the capture is still pending.
    pub fn try_outcome(&mut self) -> Option<Result<CaptureOutcome, CaptureError>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(Ok(outcome)),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(CaptureError::Abandoned)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_target_takes_keys_and_buttons_only() {
        let target = CaptureTarget::Input;
        assert!(target.accepts(&BindingKey::keyboard("x")));
        assert!(target.accepts(&BindingKey::gamepad_button(4)));
        assert!(!target.accepts(&BindingKey::gamepad_axis(0)));
    }

    #[test]
    fn axis_target_checks_the_requested_index() {
        assert!(CaptureTarget::any_axis().accepts(&BindingKey::gamepad_axis(3)));
        assert!(CaptureTarget::axis(1).accepts(&BindingKey::gamepad_axis(1)));
        assert!(!CaptureTarget::axis(1).accepts(&BindingKey::gamepad_axis(0)));
    }

    #[test]
    fn axis_target_still_takes_keys_and_buttons() {
        for target in [CaptureTarget::any_axis(), CaptureTarget::axis(1)] {
            assert!(target.accepts(&BindingKey::keyboard("a")));
            assert!(target.accepts(&BindingKey::gamepad_button(0)));
        }
    }

    #[test]
    fn resolve_removes_the_provisional_key_and_notifies() {
        let mut table = BindingTable::new();
        let callback = Callback::labeled("steer", |_| {});
        table
            .bind(BindingKey::keyboard("steer"), callback.clone())
            .expect("free key");

        let (request, mut handle) = CaptureRequest::new(
            callback.clone(),
            CaptureTarget::axis(2),
            Some(BindingKey::keyboard("steer")),
        );
        assert!(handle.try_outcome().is_none());

        request.resolve(BindingKey::gamepad_axis(2), &mut table);

        assert!(!table.contains(&BindingKey::keyboard("steer")));
        assert!(table
            .lookup(&BindingKey::gamepad_axis(2))
            .expect("captured")
            .same_as(&callback));
        let outcome = handle.try_outcome().expect("resolved").expect("delivered");
        assert_eq!(outcome.key, BindingKey::gamepad_axis(2));
    }

    #[test]
    fn dropped_request_abandons_the_handle() {
        let (request, mut handle) =
            CaptureRequest::new(Callback::new(|_| {}), CaptureTarget::Input, None);
        drop(request);
        assert_eq!(handle.try_outcome(), Some(Err(CaptureError::Abandoned)));
    }
}
